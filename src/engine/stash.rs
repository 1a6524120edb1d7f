//! engine::stash
//!
//! Scoped ownership of an auto-stash.
//!
//! A [`StashGuard`] remembers whether this sync pushed a stash and pops it at
//! most once: explicitly through [`StashGuard::restore`], or on drop if the
//! guard is still armed. [`StashGuard::keep`] disarms it when the stash must
//! outlive the process (a paused sync records it on disk instead).

use std::path::{Path, PathBuf};

use crate::git::{GitError, Vcs};

/// Message for stashes created by `wt sync`.
pub const STASH_MESSAGE: &str = "wt sync: auto-stash";

/// Owner of at most one stash in one worktree.
pub struct StashGuard<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
    dir: PathBuf,
    stashed: bool,
    armed: bool,
}

impl<'a, V: Vcs + ?Sized> StashGuard<'a, V> {
    /// Stash everything in `dir` (untracked files included).
    pub fn push(vcs: &'a V, dir: &Path, message: &str) -> Result<Self, GitError> {
        vcs.stash_push(dir, message)?;
        tracing::debug!(dir = %dir.display(), stash_message = message, "stashed changes");
        Ok(Self::adopt(vcs, dir, true))
    }

    /// A guard that owns nothing.
    pub fn clean(vcs: &'a V, dir: &Path) -> Self {
        Self::adopt(vcs, dir, false)
    }

    /// Take ownership of a stash pushed by an earlier invocation.
    pub fn adopt(vcs: &'a V, dir: &Path, stashed: bool) -> Self {
        Self {
            vcs,
            dir: dir.to_path_buf(),
            stashed,
            armed: true,
        }
    }

    /// Whether this guard owns a stash.
    pub fn stashed(&self) -> bool {
        self.stashed
    }

    /// Pop the stash if one is owned. Returns whether a pop happened.
    ///
    /// The guard is disarmed even when the pop fails: git leaves a stash
    /// that failed to apply on the stack, and popping it again could apply
    /// it twice.
    pub fn restore(mut self) -> Result<bool, GitError> {
        self.armed = false;
        if !self.stashed {
            return Ok(false);
        }
        self.vcs.stash_pop(&self.dir)?;
        tracing::debug!(dir = %self.dir.display(), "restored stash");
        Ok(true)
    }

    /// Leave the stash on the stack. Returns whether one is owned.
    pub fn keep(mut self) -> bool {
        self.armed = false;
        self.stashed
    }
}

impl<V: Vcs + ?Sized> Drop for StashGuard<'_, V> {
    fn drop(&mut self) {
        if self.armed && self.stashed {
            if let Err(e) = self.vcs.stash_pop(&self.dir) {
                tracing::warn!(
                    dir = %self.dir.display(),
                    error = %e,
                    "failed to restore stash; changes remain in `git stash list`"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::mock::{FailOn, MockCopy, MockOperation, MockVcs};

    const DIR: &str = "/src/app";

    fn pops(vcs: &MockVcs) -> usize {
        vcs.operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::StashPop { .. }))
            .count()
    }

    #[test]
    fn restore_pops_exactly_once() {
        let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature").dirty());
        let guard = StashGuard::push(&vcs, Path::new(DIR), STASH_MESSAGE).unwrap();
        assert!(guard.stashed());

        assert!(guard.restore().unwrap());
        assert_eq!(pops(&vcs), 1);
        assert!(vcs.copy(Path::new(DIR)).unwrap().dirty);
    }

    #[test]
    fn drop_restores_when_armed() {
        let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature").dirty());
        {
            let _guard = StashGuard::push(&vcs, Path::new(DIR), STASH_MESSAGE).unwrap();
        }
        assert_eq!(pops(&vcs), 1);
    }

    #[test]
    fn keep_leaves_stash_on_stack() {
        let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature").dirty());
        let guard = StashGuard::push(&vcs, Path::new(DIR), STASH_MESSAGE).unwrap();
        assert!(guard.keep());
        assert_eq!(pops(&vcs), 0);
        assert_eq!(vcs.copy(Path::new(DIR)).unwrap().stashes.len(), 1);
    }

    #[test]
    fn clean_guard_never_pops() {
        let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature"));
        let guard = StashGuard::clean(&vcs, Path::new(DIR));
        assert!(!guard.restore().unwrap());
        drop(StashGuard::clean(&vcs, Path::new(DIR)));
        assert_eq!(pops(&vcs), 0);
    }

    #[test]
    fn failed_restore_does_not_retry_on_drop() {
        let vcs = MockVcs::new()
            .with_copy(DIR, MockCopy::on_branch("feature").dirty())
            .fail_on(FailOn::StashPop);
        let guard = StashGuard::push(&vcs, Path::new(DIR), STASH_MESSAGE).unwrap();
        assert!(guard.restore().is_err());
        assert_eq!(pops(&vcs), 1);
    }

    #[test]
    fn failed_push_owns_nothing() {
        let vcs = MockVcs::new()
            .with_copy(DIR, MockCopy::on_branch("feature").dirty())
            .fail_on(FailOn::StashPush);
        assert!(StashGuard::push(&vcs, Path::new(DIR), STASH_MESSAGE).is_err());
        assert_eq!(pops(&vcs), 0);
    }
}
