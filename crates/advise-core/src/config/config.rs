use std::collections::HashMap;
use std::path::Path;

use log::warn;

use super::source::{ConfigLoader, ConfigSource, RawConfig};
use crate::beam::parse_width;
use crate::error::{ResolverError, Result};
use crate::predictor::PredictorKind;

fn default_limit() -> u64 {
    10_000
}

fn default_count() -> usize {
    3
}

/// Settings of one resolution run.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Beam width; -1 for unbounded
    pub beam_width: i64,
    /// Number of final states (accepted or discarded) after which the
    /// search stops
    pub limit: u64,
    /// Number of stacks to report
    pub count: usize,
    /// Keep only this many most recent versions of each dependency
    pub limit_latest_versions: Option<usize>,
    pub predictor: PredictorKind,
    /// Seed for randomized predictors
    pub seed: Option<u64>,
    /// Resolve development requirements too
    pub with_devel: bool,
    /// Record beam statistics every iteration
    pub keep_history: bool,
    pub allow_prereleases: bool,
    /// Packages for which pre-releases are allowed
    pub prerelease_packages: Vec<String>,
    /// Allowed package indexes; empty allows all
    pub index_urls: Vec<String>,
    /// Packages removed from the resolution
    pub skip_packages: Vec<String>,
    /// Final states scoring below this are discarded
    pub score_threshold: Option<f64>,

    pub(crate) sources: HashMap<String, ConfigSource>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            beam_width: -1,
            limit: default_limit(),
            count: default_count(),
            limit_latest_versions: None,
            predictor: PredictorKind::default(),
            seed: None,
            with_devel: true,
            keep_history: false,
            allow_prereleases: false,
            prerelease_packages: Vec::new(),
            index_urls: Vec::new(),
            skip_packages: Vec::new(),
            score_threshold: None,
            sources: HashMap::new(),
        }
    }
}

fn invalid(key: &str, value: impl std::fmt::Display) -> ResolverError {
    ResolverError::Config(format!("Invalid value for {}: {}", key, value))
}

fn parse_limit_latest_versions(key: &str, value: i64) -> Result<Option<usize>> {
    match value {
        -1 => Ok(None),
        v if v > 0 => usize::try_from(v).map(Some).map_err(|_| invalid(key, v)),
        v => Err(invalid(key, v)),
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build configuration from all sources (defaults, global, project, env)
    pub fn build<P: AsRef<Path>>(project_dir: Option<P>, use_environment: bool) -> Result<Self> {
        let loader = ConfigLoader::new(use_environment);
        let mut config = Self::default();

        for key in Self::config_keys() {
            config.sources.insert(key.to_string(), ConfigSource::Default);
        }

        // 1. Global config.toml
        let global_config = loader.load_global_config()?;
        config.merge_raw_config(global_config, ConfigSource::Global)?;

        // 2. Project advise.toml
        if let Some(project_dir) = &project_dir {
            let project_config = loader.load_project_config(project_dir)?;
            config.merge_raw_config(project_config, ConfigSource::Project)?;
        }

        // 3. ADVISE_* environment variables
        if use_environment {
            config.apply_env_overrides(&loader)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn get_source(&self, key: &str) -> Option<&ConfigSource> {
        self.sources.get(key)
    }

    /// Beam width with -1 mapped to unbounded
    pub fn beam_width(&self) -> Result<Option<usize>> {
        parse_width(self.beam_width)
    }

    pub fn validate(&self) -> Result<()> {
        self.beam_width()?;
        if self.limit == 0 {
            return Err(invalid("limit", 0));
        }
        if self.count == 0 {
            return Err(invalid("count", 0));
        }
        if let Some(threshold) = self.score_threshold {
            if !threshold.is_finite() {
                return Err(invalid("score-threshold", threshold));
            }
        }
        Ok(())
    }

    pub fn merge_raw_config(&mut self, raw: RawConfig, source: ConfigSource) -> Result<()> {
        if let Some(resolver) = raw.resolver {
            let mut keys: Vec<_> = resolver.into_iter().collect();
            keys.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, value) in keys {
                self.merge_config_value(&key, value, source.clone())?;
            }
        }
        Ok(())
    }

    /// Merge a single value from a config file
    fn merge_config_value(
        &mut self,
        key: &str,
        value: toml::Value,
        source: ConfigSource,
    ) -> Result<()> {
        let as_int = |value: &toml::Value| value.as_integer().ok_or_else(|| invalid(key, value));
        let as_bool = |value: &toml::Value| value.as_bool().ok_or_else(|| invalid(key, value));
        let as_list = |value: &toml::Value| -> Result<Vec<String>> {
            value
                .as_array()
                .ok_or_else(|| invalid(key, value))?
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid(key, item))
                })
                .collect()
        };

        match key {
            "beam-width" => self.beam_width = as_int(&value)?,
            "limit" => {
                self.limit = u64::try_from(as_int(&value)?).map_err(|_| invalid(key, &value))?
            }
            "count" => {
                self.count = usize::try_from(as_int(&value)?).map_err(|_| invalid(key, &value))?
            }
            "limit-latest-versions" => {
                self.limit_latest_versions = parse_limit_latest_versions(key, as_int(&value)?)?
            }
            "predictor" => {
                self.predictor = value.as_str().ok_or_else(|| invalid(key, &value))?.parse()?
            }
            "seed" => {
                self.seed = Some(u64::try_from(as_int(&value)?).map_err(|_| invalid(key, &value))?)
            }
            "with-devel" => self.with_devel = as_bool(&value)?,
            "keep-history" => self.keep_history = as_bool(&value)?,
            "allow-prereleases" => self.allow_prereleases = as_bool(&value)?,
            "prerelease-packages" => self.prerelease_packages = as_list(&value)?,
            "index-urls" => self.index_urls = as_list(&value)?,
            "skip-packages" => self.skip_packages = as_list(&value)?,
            "score-threshold" => {
                let threshold = value
                    .as_float()
                    .or_else(|| value.as_integer().map(|i| i as f64))
                    .ok_or_else(|| invalid(key, &value))?;
                self.score_threshold = Some(threshold);
            }
            _ => {
                warn!("Ignoring unknown configuration key {}", key);
                return Ok(());
            }
        }

        self.sources.insert(key.to_string(), source);
        Ok(())
    }

    /// Set a value from its string form, as given on the command line or
    /// in an environment variable. Lists are comma separated.
    pub fn set_from_str(&mut self, key: &str, value: &str, source: ConfigSource) -> Result<()> {
        let list = || -> Vec<String> {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };
        let boolean = || !matches!(value.to_lowercase().as_str(), "false" | "0" | "no");

        match key {
            "beam-width" => self.beam_width = value.parse().map_err(|_| invalid(key, value))?,
            "limit" => self.limit = value.parse().map_err(|_| invalid(key, value))?,
            "count" => self.count = value.parse().map_err(|_| invalid(key, value))?,
            "limit-latest-versions" => {
                let parsed = value.parse().map_err(|_| invalid(key, value))?;
                self.limit_latest_versions = parse_limit_latest_versions(key, parsed)?;
            }
            "predictor" => self.predictor = value.parse()?,
            "seed" => self.seed = Some(value.parse().map_err(|_| invalid(key, value))?),
            "with-devel" => self.with_devel = boolean(),
            "keep-history" => self.keep_history = boolean(),
            "allow-prereleases" => self.allow_prereleases = boolean(),
            "prerelease-packages" => self.prerelease_packages = list(),
            "index-urls" => self.index_urls = list(),
            "skip-packages" => self.skip_packages = list(),
            "score-threshold" => {
                self.score_threshold = Some(value.parse().map_err(|_| invalid(key, value))?)
            }
            _ => return Err(ResolverError::Config(format!("Unknown configuration key {}", key))),
        }

        self.sources.insert(key.to_string(), source);
        Ok(())
    }

    /// Apply ADVISE_* environment variable overrides
    fn apply_env_overrides(&mut self, loader: &ConfigLoader) -> Result<()> {
        for key in Self::config_keys() {
            if let Some(value) = loader.get_env_config(key) {
                let var = ConfigLoader::env_var_name(key);
                self.set_from_str(key, &value, ConfigSource::Environment(var))?;
            }
        }
        Ok(())
    }

    fn config_keys() -> &'static [&'static str] {
        &[
            "beam-width",
            "limit",
            "count",
            "limit-latest-versions",
            "predictor",
            "seed",
            "with-devel",
            "keep-history",
            "allow-prereleases",
            "prerelease-packages",
            "index-urls",
            "skip-packages",
            "score-threshold",
        ]
    }
}
