//! Operator comparison of version strings.

use std::cmp::Ordering;

use crate::version::Version;

/// Compares release version strings pairwise.
pub struct Comparator;

impl Comparator {
    /// `left > right`
    pub fn greater_than(left: &str, right: &str) -> bool {
        Self::compare(left, ">", right)
    }

    /// `left >= right`
    pub fn greater_than_or_equal_to(left: &str, right: &str) -> bool {
        Self::compare(left, ">=", right)
    }

    /// `left < right`
    pub fn less_than(left: &str, right: &str) -> bool {
        Self::compare(left, "<", right)
    }

    /// `left <= right`
    pub fn less_than_or_equal_to(left: &str, right: &str) -> bool {
        Self::compare(left, "<=", right)
    }

    /// `left == right`
    pub fn equal_to(left: &str, right: &str) -> bool {
        Self::compare(left, "==", right)
    }

    /// `left != right`
    pub fn not_equal_to(left: &str, right: &str) -> bool {
        Self::compare(left, "!=", right)
    }

    /// Compare `left` to `right` with a specifier operator.
    ///
    /// Unknown operators never match.
    pub fn compare(left: &str, operator: &str, right: &str) -> bool {
        let ordering = Self::ordering(left, right);
        match operator {
            ">" => ordering == Ordering::Greater,
            ">=" => ordering != Ordering::Less,
            "<" => ordering == Ordering::Less,
            "<=" => ordering != Ordering::Greater,
            "=" | "==" => ordering == Ordering::Equal,
            "!=" | "<>" => ordering != Ordering::Equal,
            _ => false,
        }
    }

    /// Total ordering over version strings.
    ///
    /// Strings that do not parse sort below every valid version and compare
    /// to each other lexically.
    pub fn ordering(left: &str, right: &str) -> Ordering {
        match (Version::parse(left), Version::parse(right)) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => left.cmp(right),
        }
    }
}
