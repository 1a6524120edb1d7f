//! git::mock
//!
//! In-memory [`Vcs`] for deterministic engine tests.
//!
//! # Design
//!
//! Each worktree is a [`MockCopy`] keyed by its path. Rebases conflict or
//! succeed according to the copy's flags, stashes are a per-copy stack, and
//! every mutating call is appended to an operation log so tests can assert
//! exactly what the engine did (and in which order).
//!
//! # Example
//!
//! ```
//! use wtsync::git::mock::{MockCopy, MockVcs};
//! use wtsync::git::{RebaseOutcome, RunMode, Vcs};
//! use std::path::Path;
//!
//! let vcs = MockVcs::new().with_copy("/src/app", MockCopy::on_branch("feature").behind(2));
//! let outcome = vcs.rebase(Path::new("/src/app"), "origin/main", RunMode::Silent).unwrap();
//! assert_eq!(outcome, RebaseOutcome::Completed);
//! assert_eq!(vcs.copy(Path::new("/src/app")).unwrap().ahead_behind.behind, 0);
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::interface::GitError;
use super::vcs::{FastForward, RebaseOutcome, RunMode, Vcs};
use crate::core::types::{AheadBehind, BranchName};

/// Simulated state of one worktree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockCopy {
    /// Checked-out branch; `None` is a detached HEAD.
    pub branch: Option<BranchName>,
    /// Uncommitted changes present.
    pub dirty: bool,
    /// Commit counts against the base ref.
    pub ahead_behind: AheadBehind,
    /// A rebase started here stops on a conflict.
    pub conflicts: bool,
    /// Conflicts have been resolved, so `rebase --continue` completes.
    pub resolved: bool,
    /// Git has a rebase in progress.
    pub rebasing: bool,
    /// Local history has diverged from the base; fast-forward impossible.
    pub diverged: bool,
    /// Stash stack, most recent last.
    pub stashes: Vec<String>,
    /// Paths changed on the base ref since the fork point.
    pub remote_changes: BTreeSet<String>,
    /// Paths changed on HEAD since the fork point.
    pub local_changes: BTreeSet<String>,
    /// Upstream as `<remote>/<branch>`.
    pub upstream: Option<String>,
    /// Bumped every time HEAD moves.
    pub head: u32,
}

impl MockCopy {
    /// A clean copy on `branch`, up to date with the base.
    ///
    /// # Panics
    ///
    /// Panics if `branch` is not a valid branch name.
    pub fn on_branch(branch: &str) -> Self {
        Self {
            branch: Some(BranchName::new(branch).expect("valid mock branch name")),
            ..Default::default()
        }
    }

    /// A copy with a detached HEAD.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Mark the copy as having uncommitted changes.
    pub fn dirty(mut self) -> Self {
        self.dirty = true;
        self
    }

    /// Set how many commits the base has that HEAD lacks.
    pub fn behind(mut self, behind: usize) -> Self {
        self.ahead_behind.behind = behind;
        self
    }

    /// Set how many commits HEAD has that the base lacks.
    pub fn ahead(mut self, ahead: usize) -> Self {
        self.ahead_behind.ahead = ahead;
        self
    }

    /// Make the next rebase stop on a conflict.
    pub fn conflicting(mut self) -> Self {
        self.conflicts = true;
        self
    }

    /// Make fast-forwards impossible.
    pub fn diverged(mut self) -> Self {
        self.diverged = true;
        self
    }

    /// Set the paths changed on each side since the fork point.
    pub fn changes(mut self, remote: &[&str], local: &[&str]) -> Self {
        self.remote_changes = remote.iter().map(|s| s.to_string()).collect();
        self.local_changes = local.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set the upstream of the current branch.
    pub fn tracking(mut self, upstream: &str) -> Self {
        self.upstream = Some(upstream.to_string());
        self
    }

    fn land_rebase(&mut self) {
        self.rebasing = false;
        self.conflicts = false;
        self.resolved = false;
        self.ahead_behind.behind = 0;
        self.head += 1;
    }
}

/// Operation the mock should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOn {
    /// Fail every fetch.
    Fetch,
    /// Fail every stash push.
    StashPush,
    /// Fail every stash pop (the stash stays on the stack).
    StashPop,
    /// Fail branch lookups for one worktree, as if its HEAD were unreadable.
    CurrentBranch(PathBuf),
    /// Fail ahead/behind queries for one worktree.
    AheadBehind(PathBuf),
    /// Fail every merge-base diff.
    ChangedPaths,
    /// Fail rebases that would otherwise complete, for one worktree.
    Rebase(PathBuf),
    /// Fail every push.
    Push,
}

/// Recorded mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    StashPush { dir: PathBuf, message: String },
    StashPop { dir: PathBuf },
    Fetch { remote: String, branch: String },
    Rebase { dir: PathBuf, onto: String },
    RebaseContinue { dir: PathBuf },
    RebaseAbort { dir: PathBuf },
    MergeFfOnly { dir: PathBuf, onto: String },
    PushForceWithLease { dir: PathBuf },
    PushSetUpstream { dir: PathBuf, remote: String },
}

/// Mock VCS for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockVcs {
    inner: Arc<Mutex<MockVcsInner>>,
}

#[derive(Debug, Default)]
struct MockVcsInner {
    /// Worktrees in listing order.
    copies: Vec<(PathBuf, MockCopy)>,
    fail_on: Vec<FailOn>,
    operations: Vec<MockOperation>,
}

impl MockVcsInner {
    fn copy_mut(&mut self, dir: &Path) -> Result<&mut MockCopy, GitError> {
        self.copies
            .iter_mut()
            .find(|(path, _)| path == dir)
            .map(|(_, copy)| copy)
            .ok_or_else(|| GitError::NotARepo {
                path: dir.to_path_buf(),
            })
    }

    fn fails(&self, op: &FailOn) -> bool {
        self.fail_on.contains(op)
    }
}

fn injected(command: &str) -> GitError {
    GitError::CommandFailed {
        command: command.to_string(),
        message: "injected failure".to_string(),
    }
}

impl MockVcs {
    /// Create a mock with no worktrees.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worktree. The first one added is the main worktree.
    pub fn with_copy(self, dir: impl Into<PathBuf>, copy: MockCopy) -> Self {
        self.lock().copies.push((dir.into(), copy));
        self
    }

    /// Configure an operation to fail.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on.push(fail_on);
        self
    }

    /// Clear all failure configuration.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on.clear();
    }

    /// Snapshot of one worktree.
    pub fn copy(&self, dir: &Path) -> Option<MockCopy> {
        self.lock()
            .copies
            .iter()
            .find(|(path, _)| path == dir)
            .map(|(_, copy)| copy.clone())
    }

    /// Edit one worktree in place, e.g. to simulate the user resolving
    /// conflicts between invocations.
    pub fn update(&self, dir: &Path, edit: impl FnOnce(&mut MockCopy)) {
        if let Ok(copy) = self.lock().copy_mut(dir) {
            edit(copy);
        }
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockVcsInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, op: MockOperation) {
        self.lock().operations.push(op);
    }

    fn read<T>(&self, dir: &Path, f: impl FnOnce(&MockCopy) -> T) -> Result<T, GitError> {
        let mut inner = self.lock();
        inner.copy_mut(dir).map(|copy| f(copy))
    }
}

impl Vcs for MockVcs {
    fn current_branch(&self, dir: &Path) -> Result<Option<BranchName>, GitError> {
        if self.lock().fails(&FailOn::CurrentBranch(dir.to_path_buf())) {
            return Err(injected("HEAD"));
        }
        self.read(dir, |c| if c.rebasing { None } else { c.branch.clone() })
    }

    fn is_dirty(&self, dir: &Path) -> Result<bool, GitError> {
        self.read(dir, |c| c.dirty)
    }

    fn status_short(&self, dir: &Path) -> Result<String, GitError> {
        self.read(dir, |c| {
            if c.dirty {
                " M src/lib.rs".to_string()
            } else {
                String::new()
            }
        })
    }

    fn stash_push(&self, dir: &Path, message: &str) -> Result<(), GitError> {
        self.record(MockOperation::StashPush {
            dir: dir.to_path_buf(),
            message: message.to_string(),
        });
        let mut inner = self.lock();
        if inner.fails(&FailOn::StashPush) {
            return Err(injected("git stash push"));
        }
        let copy = inner.copy_mut(dir)?;
        copy.stashes.push(message.to_string());
        copy.dirty = false;
        Ok(())
    }

    fn stash_pop(&self, dir: &Path) -> Result<(), GitError> {
        self.record(MockOperation::StashPop {
            dir: dir.to_path_buf(),
        });
        let mut inner = self.lock();
        if inner.fails(&FailOn::StashPop) {
            return Err(injected("git stash pop"));
        }
        let copy = inner.copy_mut(dir)?;
        match copy.stashes.pop() {
            Some(_) => {
                copy.dirty = true;
                Ok(())
            }
            None => Err(GitError::CommandFailed {
                command: "git stash pop".to_string(),
                message: "No stash entries found.".to_string(),
            }),
        }
    }

    fn fetch(&self, _dir: &Path, remote: &str, branch: &str) -> Result<(), GitError> {
        self.record(MockOperation::Fetch {
            remote: remote.to_string(),
            branch: branch.to_string(),
        });
        if self.lock().fails(&FailOn::Fetch) {
            return Err(injected("git fetch"));
        }
        Ok(())
    }

    fn rebase(&self, dir: &Path, onto: &str, _mode: RunMode) -> Result<RebaseOutcome, GitError> {
        self.record(MockOperation::Rebase {
            dir: dir.to_path_buf(),
            onto: onto.to_string(),
        });
        let mut inner = self.lock();
        let fail = inner.fails(&FailOn::Rebase(dir.to_path_buf()));
        let copy = inner.copy_mut(dir)?;
        if copy.rebasing {
            return Err(GitError::CommandFailed {
                command: "git rebase".to_string(),
                message: "a rebase is already in progress".to_string(),
            });
        }
        if copy.conflicts {
            copy.rebasing = true;
            return Ok(RebaseOutcome::Conflict);
        }
        if fail {
            return Err(injected("git rebase"));
        }
        copy.land_rebase();
        Ok(RebaseOutcome::Completed)
    }

    fn rebase_continue(&self, dir: &Path, _mode: RunMode) -> Result<RebaseOutcome, GitError> {
        self.record(MockOperation::RebaseContinue {
            dir: dir.to_path_buf(),
        });
        let mut inner = self.lock();
        let copy = inner.copy_mut(dir)?;
        if !copy.rebasing {
            return Err(GitError::CommandFailed {
                command: "git rebase --continue".to_string(),
                message: "No rebase in progress?".to_string(),
            });
        }
        if !copy.resolved {
            return Ok(RebaseOutcome::Conflict);
        }
        copy.land_rebase();
        Ok(RebaseOutcome::Completed)
    }

    fn rebase_abort(&self, dir: &Path) -> Result<(), GitError> {
        self.record(MockOperation::RebaseAbort {
            dir: dir.to_path_buf(),
        });
        let mut inner = self.lock();
        let copy = inner.copy_mut(dir)?;
        if !copy.rebasing {
            return Err(GitError::CommandFailed {
                command: "git rebase --abort".to_string(),
                message: "No rebase in progress?".to_string(),
            });
        }
        copy.rebasing = false;
        copy.resolved = false;
        Ok(())
    }

    fn rebase_in_progress(&self, dir: &Path) -> Result<bool, GitError> {
        self.read(dir, |c| c.rebasing)
    }

    fn merge_ff_only(&self, dir: &Path, onto: &str) -> Result<FastForward, GitError> {
        self.record(MockOperation::MergeFfOnly {
            dir: dir.to_path_buf(),
            onto: onto.to_string(),
        });
        let mut inner = self.lock();
        let copy = inner.copy_mut(dir)?;
        if copy.diverged {
            return Ok(FastForward::NotFastForward);
        }
        copy.ahead_behind.behind = 0;
        copy.head += 1;
        Ok(FastForward::Advanced)
    }

    fn ahead_behind(&self, dir: &Path, _onto: &str) -> Result<AheadBehind, GitError> {
        if self.lock().fails(&FailOn::AheadBehind(dir.to_path_buf())) {
            return Err(injected("git rev-list --count"));
        }
        self.read(dir, |c| c.ahead_behind)
    }

    /// `to == "HEAD"` asks for local changes; anything else for remote ones.
    fn changed_paths(
        &self,
        dir: &Path,
        _from: &str,
        to: &str,
    ) -> Result<BTreeSet<String>, GitError> {
        if self.lock().fails(&FailOn::ChangedPaths) {
            return Err(GitError::MissingRef {
                name: "merge-base".to_string(),
            });
        }
        self.read(dir, |c| {
            if to == "HEAD" {
                c.local_changes.clone()
            } else {
                c.remote_changes.clone()
            }
        })
    }

    fn list_worktrees(&self, _dir: &Path) -> Result<Vec<PathBuf>, GitError> {
        Ok(self.lock().copies.iter().map(|(path, _)| path.clone()).collect())
    }

    fn upstream(&self, dir: &Path) -> Result<Option<String>, GitError> {
        self.read(dir, |c| c.upstream.clone())
    }

    fn push_force_with_lease(&self, dir: &Path, _mode: RunMode) -> Result<(), GitError> {
        self.record(MockOperation::PushForceWithLease {
            dir: dir.to_path_buf(),
        });
        if self.lock().fails(&FailOn::Push) {
            return Err(injected("git push --force-with-lease"));
        }
        Ok(())
    }

    fn push_set_upstream(&self, dir: &Path, remote: &str, _mode: RunMode) -> Result<(), GitError> {
        self.record(MockOperation::PushSetUpstream {
            dir: dir.to_path_buf(),
            remote: remote.to_string(),
        });
        let mut inner = self.lock();
        if inner.fails(&FailOn::Push) {
            return Err(injected("git push -u"));
        }
        let copy = inner.copy_mut(dir)?;
        if let Some(branch) = &copy.branch {
            copy.upstream = Some(branch.on_remote(remote));
        }
        Ok(())
    }
}
