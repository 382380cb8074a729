use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ResolverError, Result};

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in default
    Default,
    /// Global config.toml
    Global,
    /// Project advise.toml
    Project,
    /// Environment variable
    Environment(String),
    /// Set programmatically, e.g. from command line flags
    Command,
}

impl ConfigSource {
    pub fn as_str(&self) -> &str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::Global => "global",
            ConfigSource::Project => "project",
            ConfigSource::Environment(var) => var,
            ConfigSource::Command => "command",
        }
    }
}

/// Contents of a configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<HashMap<String, toml::Value>>,
}

/// Reads configuration files and environment variables
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Get an ADVISE_* environment variable
    pub fn get_advise_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    /// Directory holding the global config.toml
    pub fn get_advise_home(&self) -> PathBuf {
        if let Some(home) = self.get_advise_env("ADVISE_HOME") {
            return PathBuf::from(home);
        }

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "advise") {
            proj_dirs.config_dir().to_path_buf()
        } else if let Some(base_dirs) = directories::BaseDirs::new() {
            base_dirs.home_dir().join(".advise")
        } else {
            PathBuf::from(".advise")
        }
    }

    /// Load a TOML config file; a missing file yields an empty config
    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<RawConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(RawConfig::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            ResolverError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: RawConfig = toml::from_str(&contents).map_err(|e| {
            ResolverError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        Ok(config)
    }

    pub fn load_global_config(&self) -> Result<RawConfig> {
        let config_file = self.get_advise_home().join("config.toml");
        self.load_config_file(config_file)
    }

    pub fn load_project_config<P: AsRef<Path>>(&self, project_dir: P) -> Result<RawConfig> {
        self.load_config_file(project_dir.as_ref().join("advise.toml"))
    }

    /// Environment variable name for a key: "beam-width" -> "ADVISE_BEAM_WIDTH"
    pub fn env_var_name(key: &str) -> String {
        format!("ADVISE_{}", key.replace('-', "_").to_uppercase())
    }

    pub fn get_env_config(&self, key: &str) -> Option<String> {
        self.get_advise_env(&Self::env_var_name(key))
    }
}
