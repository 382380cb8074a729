//! Project manifest: direct requirements and the targeted runtime environment.

use std::fs;
use std::path::Path;

use advise_version::SpecifierSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ResolverError, Result};
use crate::package::normalize_name;

/// Operating system of the targeted runtime environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingSystem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// The environment a stack is resolved for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeEnvironment {
    #[serde(default)]
    pub operating_system: OperatingSystem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl RuntimeEnvironment {
    pub fn new(
        os_name: Option<&str>,
        os_version: Option<&str>,
        python_version: Option<&str>,
    ) -> Self {
        Self {
            operating_system: OperatingSystem {
                name: os_name.map(str::to_string),
                version: os_version.map(str::to_string),
            },
            python_version: python_version.map(str::to_string),
            platform: None,
        }
    }

    /// Environment markers can only be evaluated against a fully specified
    /// target: OS name, OS version and Python version.
    pub fn is_fully_specified(&self) -> bool {
        self.operating_system.name.is_some()
            && self.operating_system.version.is_some()
            && self.python_version.is_some()
    }

    pub fn os_name(&self) -> Option<&str> {
        self.operating_system.name.as_deref()
    }

    pub fn os_version(&self) -> Option<&str> {
        self.operating_system.version.as_deref()
    }

    pub fn python_version(&self) -> Option<&str> {
        self.python_version.as_deref()
    }
}

/// A requirement as written in the manifest: either a bare specifier or a
/// table with details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum RawRequirement {
    Specifier(String),
    Detailed {
        #[serde(default)]
        version: Option<String>,
        #[serde(default)]
        index: Option<String>,
        #[serde(default)]
        extras: Vec<String>,
    },
}

/// A direct dependency of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub specifier: SpecifierSet,
    pub index_url: Option<String>,
    pub extras: Vec<String>,
    pub develop: bool,
}

impl Requirement {
    pub fn new(name: &str, specifier: &str) -> Result<Self> {
        Ok(Self {
            name: normalize_name(name),
            specifier: SpecifierSet::parse(specifier)?,
            index_url: None,
            extras: Vec::new(),
            develop: false,
        })
    }

    pub fn with_index(mut self, index_url: impl Into<String>) -> Self {
        self.index_url = Some(index_url.into());
        self
    }

    pub fn with_extras(mut self, extras: Vec<String>) -> Self {
        self.extras = extras;
        self
    }

    pub fn develop(mut self, develop: bool) -> Self {
        self.develop = develop;
        self
    }

    fn from_raw(name: &str, raw: RawRequirement, develop: bool) -> Result<Self> {
        let (specifier, index, extras) = match raw {
            RawRequirement::Specifier(specifier) => (specifier, None, Vec::new()),
            RawRequirement::Detailed {
                version,
                index,
                extras,
            } => (version.unwrap_or_default(), index, extras),
        };

        if let Some(index) = &index {
            Url::parse(index).map_err(|e| ResolverError::InvalidProject {
                message: format!("invalid index URL {} for {}: {}", index, name, e),
            })?;
        }

        let mut requirement = Requirement::new(name, &specifier)?
            .with_extras(extras)
            .develop(develop);
        requirement.index_url = index;
        Ok(requirement)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawProject {
    #[serde(default)]
    packages: IndexMap<String, RawRequirement>,
    #[serde(default)]
    dev_packages: IndexMap<String, RawRequirement>,
    #[serde(default)]
    runtime_environment: RuntimeEnvironment,
}

/// The project being advised.
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub requirements: IndexMap<String, Requirement>,
    pub dev_requirements: IndexMap<String, Requirement>,
    pub runtime_environment: RuntimeEnvironment,
}

impl Project {
    pub fn new(runtime_environment: RuntimeEnvironment) -> Self {
        Self {
            runtime_environment,
            ..Default::default()
        }
    }

    /// Add a requirement
    pub fn require(&mut self, requirement: Requirement) -> &mut Self {
        let target = if requirement.develop {
            &mut self.dev_requirements
        } else {
            &mut self.requirements
        };
        target.insert(requirement.name.clone(), requirement);
        self
    }

    /// Parse a TOML manifest with `[packages]`, `[dev-packages]` and
    /// `[runtime-environment]` sections.
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawProject = toml::from_str(content).map_err(|e| ResolverError::InvalidProject {
            message: e.to_string(),
        })?;

        let mut project = Project::new(raw.runtime_environment);
        for (name, requirement) in raw.packages {
            project.require(Requirement::from_raw(&name, requirement, false)?);
        }
        for (name, requirement) in raw.dev_packages {
            project.require(Requirement::from_raw(&name, requirement, true)?);
        }

        Ok(project)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Direct dependencies sorted by name. A name listed in both sections
    /// keeps its non-development entry.
    pub fn direct_dependencies(&self, with_devel: bool) -> Vec<&Requirement> {
        let mut direct: IndexMap<&str, &Requirement> = self
            .requirements
            .values()
            .map(|r| (r.name.as_str(), r))
            .collect();

        if with_devel {
            for requirement in self.dev_requirements.values() {
                direct.entry(requirement.name.as_str()).or_insert(requirement);
            }
        }

        direct.sort_keys();
        direct.into_values().collect()
    }
}
