//! Version specifiers such as `>=1.0,<2.0` or `~=1.4.2`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::version::{Version, VersionError};

/// Error type for specifier parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecifierError {
    #[error("Invalid operator in specifier \"{0}\"")]
    InvalidOperator(String),
    #[error("Invalid version in specifier \"{specifier}\": {source}")]
    InvalidVersion {
        specifier: String,
        #[source]
        source: VersionError,
    },
    #[error("Wildcard not allowed with operator {operator} in \"{specifier}\"")]
    InvalidWildcard { operator: Operator, specifier: String },
    #[error("Compatible release operator requires at least two release segments in \"{0}\"")]
    CompatibleReleaseTooShort(String),
}

/// Comparison operators for version specifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Arbitrary string equality (===)
    ArbitraryEqual,
    /// Equal (==)
    Equal,
    /// Not equal (!=)
    NotEqual,
    /// Compatible release (~=)
    Compatible,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
}

impl Operator {
    /// Split a leading operator off a specifier clause
    fn split(clause: &str) -> Option<(Self, &str)> {
        // Longest operators first so "==" does not shadow "==="
        const OPERATORS: [(&str, Operator); 8] = [
            ("===", Operator::ArbitraryEqual),
            ("==", Operator::Equal),
            ("!=", Operator::NotEqual),
            ("~=", Operator::Compatible),
            ("<=", Operator::LessThanOrEqual),
            (">=", Operator::GreaterThanOrEqual),
            ("<", Operator::LessThan),
            (">", Operator::GreaterThan),
        ];

        OPERATORS
            .iter()
            .find(|(prefix, _)| clause.starts_with(prefix))
            .map(|(prefix, op)| (*op, clause[prefix.len()..].trim()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::ArbitraryEqual => "===",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Compatible => "~=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single `<operator><version>` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub operator: Operator,
    /// Version text as written, without a trailing `.*`
    pub raw: String,
    /// Parsed version; absent only for `===` clauses that do not parse
    pub version: Option<Version>,
    /// `==1.2.*` style prefix match
    pub wildcard: bool,
}

impl Specifier {
    pub fn parse(clause: &str) -> Result<Self, SpecifierError> {
        let clause = clause.trim();
        let (operator, rest) = match Operator::split(clause) {
            Some(split) => split,
            // A bare version means an exact pin
            None if clause.chars().next().is_some_and(|c| c.is_ascii_digit()) => {
                (Operator::Equal, clause)
            }
            None => return Err(SpecifierError::InvalidOperator(clause.to_string())),
        };

        if operator == Operator::ArbitraryEqual {
            return Ok(Self {
                operator,
                raw: rest.to_string(),
                version: Version::parse(rest).ok(),
                wildcard: false,
            });
        }

        let (raw, wildcard) = match rest.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (rest, false),
        };

        if wildcard && !matches!(operator, Operator::Equal | Operator::NotEqual) {
            return Err(SpecifierError::InvalidWildcard {
                operator,
                specifier: clause.to_string(),
            });
        }

        let version = Version::parse(raw).map_err(|source| SpecifierError::InvalidVersion {
            specifier: clause.to_string(),
            source,
        })?;

        if operator == Operator::Compatible && version.release.len() < 2 {
            return Err(SpecifierError::CompatibleReleaseTooShort(clause.to_string()));
        }

        Ok(Self {
            operator,
            raw: raw.to_string(),
            version: Some(version),
            wildcard,
        })
    }

    /// Check whether the given version satisfies this clause
    pub fn contains(&self, candidate: &Version) -> bool {
        let Some(spec) = &self.version else {
            return self.operator == Operator::ArbitraryEqual && candidate.to_string() == self.raw;
        };

        match self.operator {
            Operator::ArbitraryEqual => candidate.to_string() == spec.to_string(),
            Operator::Equal if self.wildcard => prefix_match(candidate, spec),
            Operator::NotEqual if self.wildcard => !prefix_match(candidate, spec),
            Operator::Equal => equal_ignoring_local(candidate, spec),
            Operator::NotEqual => !equal_ignoring_local(candidate, spec),
            Operator::Compatible => {
                let mut prefix = spec.base_version();
                prefix.release.pop();
                candidate.public() >= *spec && prefix_match(candidate, &prefix)
            }
            Operator::LessThanOrEqual => candidate.public() <= *spec,
            Operator::GreaterThanOrEqual => candidate.public() >= *spec,
            Operator::LessThan => {
                if candidate.public() >= *spec {
                    return false;
                }
                // <V excludes pre-releases of V itself unless V is a pre-release
                !(!spec.is_prerelease()
                    && candidate.is_prerelease()
                    && same_release(candidate, spec))
            }
            Operator::GreaterThan => {
                if candidate.public() <= *spec {
                    return false;
                }
                // >V excludes post-releases of V itself unless V is a post-release
                if !spec.is_postrelease()
                    && candidate.is_postrelease()
                    && same_release(candidate, spec)
                {
                    return false;
                }
                // ... and local variants of V
                !(candidate.local.is_some() && candidate.public() == *spec)
            }
        }
    }
}

fn equal_ignoring_local(candidate: &Version, spec: &Version) -> bool {
    match &spec.local {
        Some(local) => candidate == spec && candidate.local.as_deref() == Some(local.as_str()),
        None => candidate.public() == *spec,
    }
}

fn same_release(a: &Version, b: &Version) -> bool {
    a.base_version() == b.base_version()
}

/// Prefix match on the release segment, padding the candidate with zeros.
fn prefix_match(candidate: &Version, prefix: &Version) -> bool {
    if candidate.epoch != prefix.epoch {
        return false;
    }
    prefix
        .release
        .iter()
        .enumerate()
        .all(|(i, n)| candidate.release.get(i).copied().unwrap_or(0) == *n)
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.raw)?;
        if self.wildcard {
            write!(f, ".*")?;
        }
        Ok(())
    }
}

/// A conjunction of specifier clauses.
///
/// An empty set (parsed from `""` or `"*"`) matches every version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecifierSet {
    pub specifiers: Vec<Specifier>,
}

impl SpecifierSet {
    pub fn parse(specifiers: &str) -> Result<Self, SpecifierError> {
        let trimmed = specifiers.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::default());
        }

        let specifiers = trimmed
            .split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(Specifier::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { specifiers })
    }

    pub fn is_any(&self) -> bool {
        self.specifiers.is_empty()
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.specifiers.iter().all(|s| s.contains(version))
    }

    /// Check a version string; unparseable versions only match an empty set
    /// or an arbitrary-equality clause with the same text.
    pub fn contains_str(&self, version: &str) -> bool {
        match Version::parse(version) {
            Ok(parsed) => self.contains(&parsed),
            Err(_) => {
                self.is_any()
                    || self
                        .specifiers
                        .iter()
                        .all(|s| s.operator == Operator::ArbitraryEqual && s.raw == version)
            }
        }
    }
}

impl FromStr for SpecifierSet {
    type Err = SpecifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpecifierSet::parse(s)
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.specifiers.is_empty() {
            return write!(f, "*");
        }
        let clauses: Vec<String> = self.specifiers.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", clauses.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(spec: &str, version: &str) -> bool {
        SpecifierSet::parse(spec).unwrap().contains_str(version)
    }

    #[test]
    fn test_any() {
        assert!(matches("", "1.0"));
        assert!(matches("*", "0.0.1a1"));
        assert!(matches("*", "not-a-version"));
    }

    #[test]
    fn test_exact() {
        assert!(matches("==1.0.0", "1.0"));
        assert!(matches("1.0.0", "1.0.0"));
        assert!(matches("==1.0", "1.0+local.1"));
        assert!(!matches("==1.0+local.2", "1.0+local.1"));
        assert!(!matches("==1.0.0", "1.0.1"));
        assert!(matches("!=1.0.0", "1.0.1"));
    }

    #[test]
    fn test_wildcard() {
        assert!(matches("==1.2.*", "1.2.7"));
        assert!(matches("==1.2.*", "1.2"));
        assert!(!matches("==1.2.*", "1.3.0"));
        assert!(matches("!=1.2.*", "1.3.0"));
        assert!(SpecifierSet::parse(">=1.2.*").is_err());
    }

    #[test]
    fn test_ranges() {
        assert!(matches(">=1.0,<2.0", "1.5.3"));
        assert!(!matches(">=1.0,<2.0", "2.0"));
        assert!(!matches(">=1.0, <2.0", "0.9"));
        assert!(matches("<=2.0", "2.0.0"));
        assert!(matches(">1.0", "1.0.1"));
    }

    #[test]
    fn test_exclusive_comparisons() {
        assert!(!matches("<2.0", "2.0rc1"));
        assert!(matches("<2.0rc2", "2.0rc1"));
        assert!(!matches(">1.0", "1.0.post1"));
        assert!(matches(">1.0.post1", "1.0.post2"));
        assert!(!matches(">1.0", "1.0+local"));
    }

    #[test]
    fn test_compatible_release() {
        assert!(matches("~=1.4.2", "1.4.5"));
        assert!(!matches("~=1.4.2", "1.5.0"));
        assert!(matches("~=1.4", "1.9"));
        assert!(!matches("~=1.4", "2.0"));
        assert!(SpecifierSet::parse("~=1").is_err());
    }

    #[test]
    fn test_arbitrary_equality() {
        assert!(matches("===foobar", "foobar"));
        assert!(!matches("===1.0", "1.0.0"));
    }

    #[test]
    fn test_invalid_operator() {
        assert!(matches!(
            SpecifierSet::parse("^1.0"),
            Err(SpecifierError::InvalidOperator(_))
        ));
    }

    #[test]
    fn test_display() {
        let set = SpecifierSet::parse(">=1.0, <2.0,==1.*").unwrap();
        assert_eq!(set.to_string(), ">=1.0,<2.0,==1.*");
        assert_eq!(SpecifierSet::default().to_string(), "*");
    }
}
