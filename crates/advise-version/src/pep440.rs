//! Facade providing high-level version operations

use crate::specifier::SpecifierSet;
use crate::Comparator;

/// Main facade for version operations
pub struct Pep440;

impl Pep440 {
    /// Check if a version satisfies a specifier set
    pub fn satisfies(version: &str, specifiers: &str) -> bool {
        match SpecifierSet::parse(specifiers) {
            Ok(set) => set.contains_str(version),
            Err(_) => false,
        }
    }

    /// Return all versions that satisfy the given specifiers
    pub fn satisfied_by(versions: &[&str], specifiers: &str) -> Vec<String> {
        let set = match SpecifierSet::parse(specifiers) {
            Ok(set) => set,
            Err(_) => return Vec::new(),
        };

        versions
            .iter()
            .filter(|v| set.contains_str(v))
            .map(|v| v.to_string())
            .collect()
    }

    /// Sort versions in ascending order
    pub fn sort(versions: &[&str]) -> Vec<String> {
        Self::usort(versions, true)
    }

    /// Sort versions in descending order (reverse sort)
    pub fn rsort(versions: &[&str]) -> Vec<String> {
        Self::usort(versions, false)
    }

    fn usort(versions: &[&str], ascending: bool) -> Vec<String> {
        let mut sorted: Vec<&str> = versions.to_vec();

        // Stable: equal versions keep their input order in both directions
        sorted.sort_by(|a, b| {
            let cmp = Comparator::ordering(a, b);
            if ascending {
                cmp
            } else {
                cmp.reverse()
            }
        });

        sorted.into_iter().map(str::to_string).collect()
    }
}
