//! Resolver configuration
//!
//! Settings are merged from several sources, later ones overriding earlier
//! ones:
//!
//! 1. Built-in defaults
//! 2. Global `config.toml` in the advise config directory (`ADVISE_HOME`
//!    or the platform config dir)
//! 3. Project `advise.toml`
//! 4. Environment variables (`ADVISE_*`)
//!
//! Every file keeps its settings in a `[resolver]` table:
//!
//! ```toml
//! [resolver]
//! beam-width = 1000
//! limit = 10000
//! count = 3
//! predictor = "hill-climbing"
//! seed = 42
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use advise_core::config::ResolverConfig;
//! use std::path::Path;
//!
//! let config = ResolverConfig::build(Some(Path::new("/path/to/project")), true).unwrap();
//! println!("Beam width: {}", config.beam_width);
//! println!("Limit set by: {:?}", config.get_source("limit"));
//! ```

mod config;
mod source;

pub use config::ResolverConfig;
pub use source::{ConfigLoader, ConfigSource, RawConfig};
