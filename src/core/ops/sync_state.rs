//! core::ops::sync_state
//!
//! Durable record of an in-flight or paused sync.
//!
//! # Format
//!
//! A single plain-text word at `<git_dir>/wt-sync-state`:
//! - `stashed` - the sync pushed a stash that must be popped on completion
//! - `no` - nothing was stashed
//!
//! Anything else is [`StateError::Corrupt`]; the store never guesses.
//!
//! # Lifecycle
//!
//! Written before the first network call of a feature-branch sync, read by a
//! later `--continue` or `--abort` invocation, deleted on resolution or
//! abort. Presence alone means "a sync is in flight or paused", regardless of
//! whether git still has a rebase in progress.
//!
//! # Example
//!
//! ```
//! use wtsync::core::ops::sync_state::{SyncState, SyncStateStore};
//! # let dir = tempfile::TempDir::new().unwrap();
//!
//! let store = SyncStateStore::at(dir.path().join("wt-sync-state"));
//! store.save(SyncState { stashed: true }).unwrap();
//! assert_eq!(store.load().unwrap(), Some(SyncState { stashed: true }));
//!
//! store.clear().unwrap();
//! assert_eq!(store.load().unwrap(), None);
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::paths::WtPaths;

const STASHED: &str = "stashed";
const NOT_STASHED: &str = "no";

/// Errors from the sync state store.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("sync state i/o error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("sync state at '{path}' is corrupt (found {content:?}); run `wt sync --abort` to reset")]
    Corrupt { path: PathBuf, content: String },
}

/// The persisted part of a feature-branch sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    /// Whether the sync stashed uncommitted changes.
    pub stashed: bool,
}

impl SyncState {
    fn encode(self) -> &'static str {
        if self.stashed {
            STASHED
        } else {
            NOT_STASHED
        }
    }

    fn decode(content: &str) -> Option<Self> {
        match content.trim() {
            STASHED => Some(Self { stashed: true }),
            NOT_STASHED => Some(Self { stashed: false }),
            _ => None,
        }
    }
}

/// File-backed store for the single [`SyncState`] of one worktree.
#[derive(Debug, Clone)]
pub struct SyncStateStore {
    path: PathBuf,
}

impl SyncStateStore {
    /// Store at the canonical location for a worktree.
    pub fn new(paths: &WtPaths) -> Self {
        Self::at(paths.sync_state_path())
    }

    /// Store at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the record, replacing any previous one.
    ///
    /// Written to a sibling temp file, synced, then renamed over the record
    /// so a crash never leaves a half-written file.
    pub fn save(&self, state: SyncState) -> Result<(), StateError> {
        let io = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };

        let tmp = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp).map_err(io)?;
        file.write_all(state.encode().as_bytes()).map_err(io)?;
        file.sync_all().map_err(io)?;
        fs::rename(&tmp, &self.path).map_err(io)?;

        tracing::debug!(path = %self.path.display(), stashed = state.stashed, "saved sync state");
        Ok(())
    }

    /// Read the record, if one exists.
    pub fn load(&self) -> Result<Option<SyncState>, StateError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        SyncState::decode(&content)
            .map(Some)
            .ok_or_else(|| StateError::Corrupt {
                path: self.path.clone(),
                content,
            })
    }

    /// Check whether a record exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Delete the record. Deleting a missing record is not an error.
    pub fn clear(&self) -> Result<(), StateError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "cleared sync state");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
