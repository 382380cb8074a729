use advise_version::Version;
use indexmap::IndexSet;
use log::debug;

use super::{Sieve, Unit, UnitResult, Verdict};
use crate::context::Context;
use crate::package::{normalize_name, PackageVersion};

/// Removes pre-releases and development releases unless they are allowed
/// globally or for the package.
#[derive(Debug, Default)]
pub struct CutPreReleasesSieve {
    allow_all: bool,
    allowed: IndexSet<String>,
}

impl CutPreReleasesSieve {
    pub fn new(allow_all: bool, allowed: impl IntoIterator<Item = String>) -> Self {
        Self {
            allow_all,
            allowed: allowed.into_iter().map(|name| normalize_name(&name)).collect(),
        }
    }
}

impl Unit for CutPreReleasesSieve {}

impl Sieve for CutPreReleasesSieve {
    fn run(
        &mut self,
        _context: &Context,
        package_versions: Vec<PackageVersion>,
    ) -> UnitResult<Vec<PackageVersion>> {
        if self.allow_all {
            return Ok(Verdict::Accept(package_versions));
        }

        let kept = package_versions
            .into_iter()
            .filter(|pv| {
                if self.allowed.contains(&pv.name) {
                    return true;
                }
                // Versions that do not parse are kept as is
                let prerelease = Version::parse(&pv.version).is_ok_and(|v| v.is_prerelease());
                if prerelease {
                    debug!("Removing pre-release {}", pv);
                }
                !prerelease
            })
            .collect();

        Ok(Verdict::Accept(kept))
    }
}

/// Keeps only candidates served from the configured indexes.
#[derive(Debug)]
pub struct PackageIndexSieve {
    index_urls: Vec<String>,
}

impl PackageIndexSieve {
    pub fn new(index_urls: Vec<String>) -> Self {
        Self { index_urls }
    }
}

impl Unit for PackageIndexSieve {}

impl Sieve for PackageIndexSieve {
    fn run(
        &mut self,
        _context: &Context,
        package_versions: Vec<PackageVersion>,
    ) -> UnitResult<Vec<PackageVersion>> {
        let kept = package_versions
            .into_iter()
            .filter(|pv| self.index_urls.iter().any(|url| *url == pv.index_url))
            .collect();
        Ok(Verdict::Accept(kept))
    }
}

/// Drops the listed packages from the resolution altogether.
#[derive(Debug)]
pub struct SkipPackageSieve {
    packages: IndexSet<String>,
}

impl SkipPackageSieve {
    pub fn new(packages: impl IntoIterator<Item = String>) -> Self {
        Self {
            packages: packages.into_iter().map(|name| normalize_name(&name)).collect(),
        }
    }
}

impl Unit for SkipPackageSieve {}

impl Sieve for SkipPackageSieve {
    fn run(
        &mut self,
        _context: &Context,
        package_versions: Vec<PackageVersion>,
    ) -> UnitResult<Vec<PackageVersion>> {
        match package_versions.iter().find(|pv| self.packages.contains(&pv.name)) {
            Some(pv) => Ok(Verdict::skip_package(format!(
                "Package {} is configured to be skipped",
                pv.name
            ))),
            None => Ok(Verdict::Accept(package_versions)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ResolverConfig;
    use crate::graph::MemoryGraph;
    use crate::package::PackageTuple;
    use crate::project::Project;

    fn context() -> Context {
        Context::new(
            Project::default(),
            Arc::new(MemoryGraph::new()),
            &ResolverConfig::default(),
        )
        .unwrap()
    }

    fn versions(name: &str, versions: &[(&str, &str)]) -> Vec<PackageVersion> {
        versions
            .iter()
            .map(|(version, index)| {
                PackageVersion::new(&PackageTuple::new(name, *version, *index), false)
            })
            .collect()
    }

    fn kept(verdict: Verdict<Vec<PackageVersion>>) -> Vec<String> {
        match verdict {
            Verdict::Accept(kept) => kept.into_iter().map(|pv| pv.version).collect(),
            other => panic!("unexpected verdict {:?}", other),
        }
    }

    #[test]
    fn test_cut_prereleases() {
        let candidates = versions(
            "tensorflow",
            &[("2.2.0rc1", "a"), ("2.1.0", "a"), ("2.1.0.dev3", "a")],
        );

        let mut sieve = CutPreReleasesSieve::new(false, Vec::new());
        let verdict = sieve.run(&context(), candidates.clone()).unwrap();
        assert_eq!(kept(verdict), vec!["2.1.0"]);

        let mut allowed = CutPreReleasesSieve::new(false, vec!["TensorFlow".to_string()]);
        assert_eq!(kept(allowed.run(&context(), candidates.clone()).unwrap()).len(), 3);

        let mut all = CutPreReleasesSieve::new(true, Vec::new());
        assert_eq!(kept(all.run(&context(), candidates).unwrap()).len(), 3);
    }

    #[test]
    fn test_package_index() {
        let candidates = versions(
            "six",
            &[("1.15.0", "https://pypi.org/simple"), ("1.15.0", "https://mirror/simple")],
        );
        let mut sieve = PackageIndexSieve::new(vec!["https://pypi.org/simple".to_string()]);

        match sieve.run(&context(), candidates).unwrap() {
            Verdict::Accept(kept) => {
                assert_eq!(kept.len(), 1);
                assert_eq!(kept[0].index_url, "https://pypi.org/simple");
            }
            other => panic!("unexpected verdict {:?}", other),
        }
    }

    #[test]
    fn test_skip_package() {
        let mut sieve = SkipPackageSieve::new(vec!["Enum34".to_string()]);
        let verdict = sieve.run(&context(), versions("enum34", &[("1.1.10", "a")])).unwrap();
        assert!(matches!(verdict, Verdict::SkipPackage(_)));

        let verdict = sieve.run(&context(), versions("six", &[("1.15.0", "a")])).unwrap();
        assert!(verdict.is_accept());
    }
}
