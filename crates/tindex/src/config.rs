use crate::error::{Result, TindexError};
use serde::Deserialize;
use std::path::PathBuf;

/// Configuration surface of the tag index core.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct TindexConfig {
    /// When false the index lives purely in memory; saves become logged
    /// no-ops. Used for testing.
    pub persistence_enabled: bool,

    /// Directory holding the index snapshot and its backup.
    pub working_dir: PathBuf,
}

impl Default for TindexConfig {
    fn default() -> Self {
        Self {
            persistence_enabled: true,
            working_dir: PathBuf::new(),
        }
    }
}

impl TindexConfig {
    /// Persistent config rooted at `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            persistence_enabled: true,
            working_dir: working_dir.into(),
        }
    }

    /// Purely in-memory config, nothing ever touches disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            persistence_enabled: false,
            working_dir: PathBuf::new(),
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.persistence_enabled && self.working_dir.as_os_str().is_empty() {
            return Err(TindexError::Config(
                "working_dir must be set when persistence is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
