//! core::paths
//!
//! Where wt keeps its files inside a repository.
//!
//! Two git directories matter for a worktree:
//! - `git_dir` is per-worktree (`.git/worktrees/<name>/` for linked ones). The
//!   sync state record lives here, next to git's own `rebase-merge/`, because
//!   a paused rebase is per-worktree state.
//! - `common_dir` is shared by all worktrees. The repository lock lives here
//!   so that `wt sync --all` and a single-worktree sync never overlap.
//!
//! No code may assume `.git/` is a directory or that `git_dir == common_dir`.
//!
//! ```
//! use wtsync::core::paths::WtPaths;
//! use std::path::PathBuf;
//!
//! let paths = WtPaths::new(
//!     PathBuf::from("/repo/.git/worktrees/login"),
//!     PathBuf::from("/repo/.git"),
//! );
//!
//! assert_eq!(
//!     paths.sync_state_path(),
//!     PathBuf::from("/repo/.git/worktrees/login/wt-sync-state")
//! );
//! assert_eq!(paths.repo_lock_path(), PathBuf::from("/repo/.git/wt/lock"));
//! ```

use std::path::PathBuf;

use crate::git::RepoInfo;

/// Fixed name of the sync state record inside the per-worktree git dir.
pub const SYNC_STATE_FILE: &str = "wt-sync-state";

/// The two git directories of one worktree, and the wt files under them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WtPaths {
    pub git_dir: PathBuf,
    pub common_dir: PathBuf,
}

impl WtPaths {
    pub fn new(git_dir: PathBuf, common_dir: PathBuf) -> Self {
        Self {
            git_dir,
            common_dir,
        }
    }

    pub fn from_repo_info(info: &RepoInfo) -> Self {
        Self {
            git_dir: info.git_dir.clone(),
            common_dir: info.common_dir.clone(),
        }
    }

    /// Path of the sync state record for this worktree.
    pub fn sync_state_path(&self) -> PathBuf {
        self.git_dir.join(SYNC_STATE_FILE)
    }

    /// `<common_dir>/wt`, created on first lock.
    pub fn repo_wt_dir(&self) -> PathBuf {
        self.common_dir.join("wt")
    }

    pub fn repo_lock_path(&self) -> PathBuf {
        self.repo_wt_dir().join("lock")
    }
}
