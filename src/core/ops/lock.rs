//! core::ops::lock
//!
//! One `wt` process per repository.
//!
//! The lock file is `<common_dir>/wt/lock`, shared by every worktree, so a
//! batch sync and a single-worktree sync never interleave their stash and
//! rebase steps. It is held for one process only; a paused sync leaves it
//! free, and its durable record lives in [`super::sync_state`] instead.
//!
//! ```ignore
//! let _lock = RepoLock::acquire(&paths)?;
//! // stash, fetch, rebase ...
//! ```

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::WtPaths;

#[derive(Debug, Error)]
pub enum LockError {
    /// Another `wt` holds the lock right now.
    #[error("another wt command is running in this repository\n   Wait for it to finish (lock: {})", path.display())]
    Busy { path: PathBuf },

    #[error("cannot open lock file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot lock {}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Exclusive, non-blocking lock released on drop.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
    file: File,
}

impl RepoLock {
    /// Take the repository lock or fail with [`LockError::Busy`] at once.
    pub fn acquire(paths: &WtPaths) -> Result<Self, LockError> {
        let path = paths.repo_lock_path();
        let file = open_lock_file(&paths.repo_wt_dir(), &path)?;

        if let Err(source) = file.try_lock_exclusive() {
            return Err(if source.kind() == io::ErrorKind::WouldBlock {
                LockError::Busy { path }
            } else {
                LockError::Lock { path, source }
            });
        }

        tracing::debug!(path = %path.display(), "repository locked");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(dir: &Path, path: &Path) -> Result<File, LockError> {
    let open_error = |source| LockError::Open {
        path: path.to_path_buf(),
        source,
    };
    fs::create_dir_all(dir).map_err(open_error)?;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(open_error)
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::debug!(path = %self.path.display(), error = %e, "unlock failed");
        }
    }
}
