// ABOUTME: Configuration types and parsing for skiff.yml.
// ABOUTME: Handles YAML parsing, file discovery, defaults, and env var overrides.

mod deserialize;
mod init;
mod restart_policy;

pub use init::init_config;
pub use restart_policy::RestartPolicy;

use crate::error::{Error, Result};
use crate::runtime::RuntimeConfig;
use deserialize::{deserialize_branch, deserialize_image_ref};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "skiff.yml";
pub const CONFIG_FILENAME_ALT: &str = "skiff.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".skiff/config.yml";

pub const ENV_REPOS_ROOT: &str = "SKIFF_REPOS_ROOT";
pub const ENV_STATE_DIR: &str = "SKIFF_STATE_DIR";
pub const ENV_DOMAIN: &str = "SKIFF_DOMAIN";

pub const DEFAULT_BASE_IMAGE: &str = "node:20-alpine";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_DOMAIN: &str = "apps.localhost";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding one workspace per deployment.
    pub repos_root: PathBuf,

    /// Directory holding the JSON deployment store.
    pub state_dir: PathBuf,

    /// Suffix appended to the container prefix to form a deployment url.
    pub domain: String,

    #[serde(deserialize_with = "deserialize_branch")]
    pub default_branch: String,

    /// Base image for synthesized Dockerfiles.
    #[serde(deserialize_with = "deserialize_image_ref")]
    pub base_image: String,

    pub restart: RestartPolicy,

    pub runtime: RuntimeConfig,

    pub timeouts: Timeouts,

    /// Grace period a container gets between stop signal and kill.
    #[serde(with = "humantime_serde")]
    pub stop_grace: Duration,

    /// Accept `file://` repositories, which clone from this host's filesystem.
    pub allow_local_repos: bool,
}

/// Upper bound on each pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    #[serde(with = "humantime_serde")]
    pub clone: Duration,
    #[serde(with = "humantime_serde")]
    pub build: Duration,
    #[serde(with = "humantime_serde")]
    pub start: Duration,
    #[serde(with = "humantime_serde")]
    pub restart: Duration,
    #[serde(with = "humantime_serde")]
    pub stop: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            clone: Duration::from_secs(120),
            build: Duration::from_secs(15 * 60),
            start: Duration::from_secs(60),
            restart: Duration::from_secs(60),
            stop: Duration::from_secs(60),
        }
    }
}

impl Timeouts {
    /// The longest stage bound; runtime API requests must outlive it.
    pub fn longest(&self) -> Duration {
        [self.clone, self.build, self.start, self.restart, self.stop]
            .into_iter()
            .max()
            .unwrap_or(self.build)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repos_root: PathBuf::from("/var/lib/skiff/repos"),
            state_dir: PathBuf::from("/var/lib/skiff/state"),
            domain: DEFAULT_DOMAIN.to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
            base_image: DEFAULT_BASE_IMAGE.to_string(),
            restart: RestartPolicy::default(),
            runtime: RuntimeConfig::default(),
            timeouts: Timeouts::default(),
            stop_grace: Duration::from_secs(10),
            allow_local_repos: false,
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document is a valid, all-defaults config.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Find the config file in `dir`, if any.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Load the config file from `dir`, falling back to defaults when
    /// there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Discover the config in `dir` and apply environment overrides.
    pub fn resolve(dir: &Path) -> Result<Self> {
        let mut config = Self::discover(dir)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_override(ENV_REPOS_ROOT) {
            self.repos_root = PathBuf::from(value);
        }
        if let Some(value) = env_override(ENV_STATE_DIR) {
            self.state_dir = PathBuf::from(value);
        }
        if let Some(value) = env_override(ENV_DOMAIN) {
            self.domain = value;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(Error::InvalidConfig("domain cannot be empty".to_string()));
        }
        if self.repos_root.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "repos_root cannot be empty".to_string(),
            ));
        }
        if self.state_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("state_dir cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Directory the JSON store keeps its records in.
    pub fn store_dir(&self) -> PathBuf {
        self.state_dir.join("deployments")
    }
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.base_image, DEFAULT_BASE_IMAGE);
        assert_eq!(config.default_branch, "main");
        assert_eq!(config.stop_grace, Duration::from_secs(10));
        assert_eq!(config.timeouts.build, Duration::from_secs(900));
    }

    #[test]
    fn partial_timeouts_keep_other_defaults() {
        let config = Config::from_yaml("timeouts:\n  build: 30m\n").unwrap();
        assert_eq!(config.timeouts.build, Duration::from_secs(1800));
        assert_eq!(config.timeouts.clone, Duration::from_secs(120));
    }

    #[test]
    fn longest_timeout_is_build_by_default() {
        assert_eq!(Timeouts::default().longest(), Duration::from_secs(900));
    }

    #[test]
    fn blank_domain_is_rejected() {
        assert!(matches!(
            Config::from_yaml("domain: \"  \"\n"),
            Err(Error::InvalidConfig(_))
        ));
    }
}
