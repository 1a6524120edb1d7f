//! core::config
//!
//! Where to rebase onto, layered from built-in defaults and two TOML files.
//!
//! Each layer overrides only the fields it sets, later layers winning:
//! 1. Defaults: `base_branch = "main"`, `remote = "origin"`
//! 2. Global file, top-level fields
//! 3. Global file, `[repos.<name>]` for this repository
//! 4. Repo file `.wt.toml` in the main worktree root
//!
//! The global file is the first of:
//! 1. `$WT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/wt/config.toml`
//! 3. `~/.config/wt/config.toml`
//!
//! ```no_run
//! use wtsync::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("/src/billing")).unwrap();
//! println!("rebasing onto {}", config.base_ref());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, SyncSettings};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::types::BranchName;

/// Name of the repo-local config file.
pub const REPO_CONFIG_FILE: &str = ".wt.toml";

const DEFAULT_BASE_BRANCH: &str = "main";
const DEFAULT_REMOTE: &str = "origin";

/// Branch names always treated as shared history, whatever the config says.
const ALWAYS_SHARED: [&str; 2] = ["main", "master"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: {message}", path.display())]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Resolved configuration for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    base_branch: BranchName,
    remote: String,
    sources: Vec<PathBuf>,
}

impl Config {
    /// Build a config directly, bypassing files.
    pub fn new(base_branch: BranchName, remote: impl Into<String>) -> Self {
        Self {
            base_branch,
            remote: remote.into(),
            sources: Vec::new(),
        }
    }

    /// Load configuration for the repository whose main worktree is
    /// `main_worktree`, from the default global location.
    ///
    /// Missing files are not an error (defaults are used).
    pub fn load(main_worktree: &Path) -> Result<Self, ConfigError> {
        Self::load_with(global_config_path().as_deref(), main_worktree)
    }

    /// Load configuration with an explicit global config path.
    pub fn load_with(global: Option<&Path>, main_worktree: &Path) -> Result<Self, ConfigError> {
        let mut settings = SyncSettings {
            base_branch: Some(DEFAULT_BASE_BRANCH.to_string()),
            remote: Some(DEFAULT_REMOTE.to_string()),
        };
        let mut sources = Vec::new();

        if let Some(path) = global.filter(|p| p.exists()) {
            let global: GlobalConfig = read_toml(path)?;
            global.validate()?;
            settings.overlay(&global.defaults);

            let repo_name = main_worktree
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            if let Some(per_repo) = repo_name.and_then(|name| global.repos.get(&name)) {
                settings.overlay(per_repo);
            }
            sources.push(path.to_path_buf());
        }

        let repo_path = main_worktree.join(REPO_CONFIG_FILE);
        if repo_path.exists() {
            let repo: SyncSettings = read_toml(&repo_path)?;
            repo.validate()?;
            settings.overlay(&repo);
            sources.push(repo_path);
        }

        let base_branch = settings
            .base_branch
            .as_deref()
            .unwrap_or(DEFAULT_BASE_BRANCH);
        let base_branch = BranchName::new(base_branch)
            .map_err(|e| ConfigError::InvalidValue(format!("invalid base_branch: {}", e)))?;

        tracing::debug!(
            base_branch = %base_branch,
            remote = settings.remote.as_deref().unwrap_or(DEFAULT_REMOTE),
            sources = ?sources,
            "loaded config"
        );

        Ok(Self {
            base_branch,
            remote: settings.remote.unwrap_or_else(|| DEFAULT_REMOTE.to_string()),
            sources,
        })
    }

    /// The configured base branch.
    pub fn base_branch(&self) -> &BranchName {
        &self.base_branch
    }

    /// The configured remote name.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Remote-tracking ref of the base branch, e.g. `origin/main`.
    pub fn base_ref(&self) -> String {
        self.base_branch.on_remote(&self.remote)
    }

    /// Whether `branch` is shared history that must only be fast-forwarded.
    ///
    /// True for the configured base branch and for `main`/`master`.
    pub fn is_base_branch(&self, branch: &BranchName) -> bool {
        *branch == self.base_branch || ALWAYS_SHARED.contains(&branch.as_str())
    }

    /// Files that contributed to this config, in the order applied.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

/// Locate the global config file, if any location is resolvable.
///
/// Returns the first candidate that exists, or the last resolvable candidate
/// when none do.
pub fn global_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("WT_CONFIG") {
        return Some(PathBuf::from(path));
    }

    let xdg = std::env::var_os("XDG_CONFIG_HOME").map(|d| PathBuf::from(d).join("wt/config.toml"));
    let home = dirs::home_dir().map(|h| h.join(".config/wt/config.toml"));

    match (xdg, home) {
        (Some(xdg), _) if xdg.exists() => Some(xdg),
        (_, Some(home)) => Some(home),
        (xdg, None) => xdg,
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
