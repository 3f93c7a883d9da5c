//! Runtime configuration - parses daggr.yml

use crate::core::JoinPolicy;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Local config file, looked up in the working directory
pub const LOCAL_FILE: &str = "daggr.yml";

/// Which scheduler executes deferred leaves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerKind {
    /// Inline on the calling thread
    #[default]
    Immediate,
    /// On a tokio runtime's blocking pool
    Tokio,
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => write!(f, "immediate"),
            Self::Tokio => write!(f, "tokio"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// What a group does when one of its branches terminates
    pub join_policy: JoinPolicy,
    pub scheduler: SchedulerKind,
    /// Blocking pool size for the tokio scheduler. Defaults to the graph's
    /// async requirement count.
    pub blocking_threads: Option<usize>,
}

impl Config {
    /// Load config from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Auto-detect and load config
    /// Priority:
    /// 1. daggr.yml in the current directory
    /// 2. daggr/config.yml in the user config directory
    /// 3. Defaults
    pub fn auto_load() -> Result<Self> {
        let user_dir = dirs::config_dir().map(|dir| dir.join("daggr"));
        Self::auto_load_from(Path::new("."), user_dir.as_deref())
    }

    /// [`Config::auto_load`] with explicit search directories
    pub fn auto_load_from(local_dir: &Path, user_dir: Option<&Path>) -> Result<Self> {
        match Self::locate(local_dir, user_dir) {
            Some(path) => Self::from_file(&path),
            None => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn locate(local_dir: &Path, user_dir: Option<&Path>) -> Option<PathBuf> {
        let local = local_dir.join(LOCAL_FILE);
        if local.exists() {
            return Some(local);
        }

        user_dir
            .map(|dir| dir.join("config.yml"))
            .filter(|path| path.exists())
    }

    /// Blocking threads to give a graph with `async_requirements` deferred
    /// leaves
    pub fn blocking_threads_for(&self, async_requirements: usize) -> usize {
        self.blocking_threads.unwrap_or(async_requirements).max(1)
    }

    fn validate(&self) -> Result<()> {
        if self.blocking_threads == Some(0) {
            anyhow::bail!("blocking-threads must be at least 1");
        }
        Ok(())
    }
}
