//! core::config::schema
//!
//! On-disk shape of the config files. The global file:
//!
//! ```toml
//! base_branch = "develop"
//! remote = "origin"
//!
//! [repos.billing]
//! base_branch = "staging"
//! ```
//!
//! `.wt.toml` in the main worktree root takes the same keys as the top level
//! of the global file.
//!
//! The same files carry settings for branch naming and worktree init, which
//! wt does not own, so unknown keys are ignored rather than rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// One layer of sync settings. `None` means "not set in this layer".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncSettings {
    /// Shared branch that feature branches are rebased onto.
    pub base_branch: Option<String>,

    /// Remote holding the base branch.
    pub remote: Option<String>,
}

impl SyncSettings {
    /// Reject a malformed `base_branch` or a blank `remote`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base) = &self.base_branch {
            BranchName::new(base.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid base_branch: {}", e))
            })?;
        }

        if let Some(remote) = &self.remote {
            if remote.trim().is_empty() {
                return Err(ConfigError::InvalidValue("remote is blank".into()));
            }
        }

        Ok(())
    }

    /// Overlay the fields `other` sets on top of `self`.
    pub fn overlay(&mut self, other: &SyncSettings) {
        if other.base_branch.is_some() {
            self.base_branch.clone_from(&other.base_branch);
        }
        if other.remote.is_some() {
            self.remote.clone_from(&other.remote);
        }
    }
}

/// `~/.config/wt/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Defaults for every repository.
    #[serde(flatten)]
    pub defaults: SyncSettings,

    /// Per-repository overrides keyed by the main worktree's directory name.
    pub repos: BTreeMap<String, SyncSettings>,
}

impl GlobalConfig {
    /// Validate the defaults and every per-repo table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults.validate()?;
        for (name, settings) in &self.repos {
            settings
                .validate()
                .map_err(|e| ConfigError::InvalidValue(format!("[repos.{}]: {}", name, e)))?;
        }
        Ok(())
    }
}
