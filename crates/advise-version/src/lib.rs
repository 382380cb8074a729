//! Python release version handling.
//!
//! This crate parses version strings following the public Python release
//! scheme, orders them, and matches them against version specifiers. The
//! resolver uses it as the sort key for candidate versions.

mod comparator;
mod pep440;
pub mod specifier;
mod version;

pub use comparator::Comparator;
pub use pep440::Pep440;
pub use specifier::{Operator, Specifier, SpecifierError, SpecifierSet};
pub use version::{PreRelease, Version, VersionError};
