//! git::vcs
//!
//! The version-control seam the sync engine drives.
//!
//! # Design
//!
//! Every operation takes the directory of the worktree it acts on, so one
//! `Vcs` value can serve a whole batch of worktrees. The trait is object safe
//! and synchronous; the engine never holds two git operations open at once.
//!
//! [`GitVcs`] reads through git2 ([`super::Git`]) and mutates through the
//! `git` CLI. Mutations run with `LC_ALL=C` so failures can be reported
//! verbatim, and inherit the terminal in [`RunMode::Passthrough`] so the user
//! sees git's own progress and conflict output.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use super::interface::{Git, GitError};
use crate::core::types::{AheadBehind, BranchName};

/// How a long-running git command treats the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Inherit stdin, stdout and stderr.
    #[default]
    Passthrough,
    /// Capture all output and never open an editor.
    Silent,
}

/// Result of starting or continuing a rebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// The rebase finished; HEAD is on the rewritten branch.
    Completed,
    /// The rebase stopped on a conflict and is still in progress.
    Conflict,
}

/// Result of a fast-forward-only merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastForward {
    /// HEAD moved forward (or was already there).
    Advanced,
    /// Local history has commits the target lacks; nothing was changed.
    NotFastForward,
}

/// Version-control operations needed by the sync engine.
pub trait Vcs {
    /// Branch checked out in `dir`, `None` when HEAD is detached.
    fn current_branch(&self, dir: &Path) -> Result<Option<BranchName>, GitError>;

    /// Whether a stash would save anything (untracked files included).
    fn is_dirty(&self, dir: &Path) -> Result<bool, GitError>;

    /// Human-readable short status, for showing the user what would be stashed.
    fn status_short(&self, dir: &Path) -> Result<String, GitError>;

    /// Stash all changes, untracked files included.
    fn stash_push(&self, dir: &Path, message: &str) -> Result<(), GitError>;

    /// Pop the most recent stash.
    fn stash_pop(&self, dir: &Path) -> Result<(), GitError>;

    /// Fetch one branch from a remote, updating its remote-tracking ref.
    fn fetch(&self, dir: &Path, remote: &str, branch: &str) -> Result<(), GitError>;

    /// Rebase the current branch onto `onto`.
    fn rebase(&self, dir: &Path, onto: &str, mode: RunMode) -> Result<RebaseOutcome, GitError>;

    /// Continue a paused rebase.
    fn rebase_continue(&self, dir: &Path, mode: RunMode) -> Result<RebaseOutcome, GitError>;

    /// Abort a paused rebase, restoring the pre-rebase HEAD.
    fn rebase_abort(&self, dir: &Path) -> Result<(), GitError>;

    /// Whether git has a rebase in progress in `dir`.
    fn rebase_in_progress(&self, dir: &Path) -> Result<bool, GitError>;

    /// Fast-forward the current branch to `onto`, never creating a merge.
    fn merge_ff_only(&self, dir: &Path, onto: &str) -> Result<FastForward, GitError>;

    /// Commit counts between HEAD and `onto`.
    fn ahead_behind(&self, dir: &Path, onto: &str) -> Result<AheadBehind, GitError>;

    /// Paths changed on `to` since it forked from `from`.
    fn changed_paths(&self, dir: &Path, from: &str, to: &str)
        -> Result<BTreeSet<String>, GitError>;

    /// Root of every worktree of the repository containing `dir`, main first.
    fn list_worktrees(&self, dir: &Path) -> Result<Vec<PathBuf>, GitError>;

    /// Upstream of the current branch as `<remote>/<branch>`.
    fn upstream(&self, dir: &Path) -> Result<Option<String>, GitError>;

    /// Push the current branch over its upstream with `--force-with-lease`.
    fn push_force_with_lease(&self, dir: &Path, mode: RunMode) -> Result<(), GitError>;

    /// Push HEAD to a same-named branch on `remote` and track it.
    fn push_set_upstream(&self, dir: &Path, remote: &str, mode: RunMode) -> Result<(), GitError>;
}

/// [`Vcs`] backed by the local repository and the `git` executable.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitVcs;

impl GitVcs {
    /// Create a new adapter.
    pub fn new() -> Self {
        Self
    }

    fn command(dir: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(dir).env("LC_ALL", "C");
        cmd
    }

    fn describe(args: &[&str]) -> String {
        format!("git {}", args.join(" "))
    }

    /// Run git capturing output. Non-zero exit is an error carrying stderr.
    fn output(dir: &Path, args: &[&str]) -> Result<String, GitError> {
        let output = Self::capture(dir, args)?;
        if !output.status.success() {
            return Err(Self::failure(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    fn capture(dir: &Path, args: &[&str]) -> Result<Output, GitError> {
        tracing::debug!(dir = %dir.display(), command = %Self::describe(args), "running git");
        Self::command(dir, args)
            .stdin(Stdio::null())
            .env("GIT_EDITOR", "true")
            .output()
            .map_err(|e| GitError::CommandFailed {
                command: Self::describe(args),
                message: e.to_string(),
            })
    }

    fn failure_message(output: &Output) -> String {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            output.status.to_string()
        } else {
            stderr
        }
    }

    fn failure(args: &[&str], output: &Output) -> GitError {
        GitError::CommandFailed {
            command: Self::describe(args),
            message: Self::failure_message(output),
        }
    }

    /// Run git in the given mode, reporting only whether it succeeded.
    ///
    /// The error case is reserved for failing to run git at all; a non-zero
    /// exit is `Ok(Err(message))` so callers can inspect repository state
    /// before deciding what the failure means.
    fn run(
        dir: &Path,
        args: &[&str],
        mode: RunMode,
    ) -> Result<Result<(), String>, GitError> {
        match mode {
            RunMode::Silent => {
                let output = Self::capture(dir, args)?;
                if output.status.success() {
                    Ok(Ok(()))
                } else {
                    Ok(Err(Self::failure_message(&output)))
                }
            }
            RunMode::Passthrough => {
                tracing::debug!(dir = %dir.display(), command = %Self::describe(args), "running git");
                let status = Self::command(dir, args)
                    .status()
                    .map_err(|e| GitError::CommandFailed {
                        command: Self::describe(args),
                        message: e.to_string(),
                    })?;
                if status.success() {
                    Ok(Ok(()))
                } else {
                    Ok(Err(status.to_string()))
                }
            }
        }
    }

    fn run_checked(dir: &Path, args: &[&str], mode: RunMode) -> Result<(), GitError> {
        Self::run(dir, args, mode)?.map_err(|message| GitError::CommandFailed {
            command: Self::describe(args),
            message,
        })
    }

    /// Interpret a failed rebase step: still rebasing means a conflict.
    fn rebase_result(
        dir: &Path,
        result: Result<(), String>,
        args: &[&str],
    ) -> Result<RebaseOutcome, GitError> {
        let Err(message) = result else {
            return Ok(RebaseOutcome::Completed);
        };
        if Git::open(dir)?.state().is_rebase() {
            return Ok(RebaseOutcome::Conflict);
        }
        Err(GitError::CommandFailed {
            command: Self::describe(args),
            message,
        })
    }
}

impl Vcs for GitVcs {
    fn current_branch(&self, dir: &Path) -> Result<Option<BranchName>, GitError> {
        Git::open(dir)?.current_branch()
    }

    fn is_dirty(&self, dir: &Path) -> Result<bool, GitError> {
        Ok(Git::open(dir)?.worktree_status()?.is_dirty())
    }

    fn status_short(&self, dir: &Path) -> Result<String, GitError> {
        Self::output(dir, &["status", "--short"])
    }

    fn stash_push(&self, dir: &Path, message: &str) -> Result<(), GitError> {
        Self::output(dir, &["stash", "push", "-u", "-m", message]).map(drop)
    }

    fn stash_pop(&self, dir: &Path) -> Result<(), GitError> {
        Self::output(dir, &["stash", "pop"]).map(drop)
    }

    fn fetch(&self, dir: &Path, remote: &str, branch: &str) -> Result<(), GitError> {
        Self::output(dir, &["fetch", remote, branch]).map(drop)
    }

    fn rebase(&self, dir: &Path, onto: &str, mode: RunMode) -> Result<RebaseOutcome, GitError> {
        let args = ["rebase", onto];
        let result = Self::run(dir, &args, mode)?;
        Self::rebase_result(dir, result, &args)
    }

    fn rebase_continue(&self, dir: &Path, mode: RunMode) -> Result<RebaseOutcome, GitError> {
        let args = ["rebase", "--continue"];
        let result = Self::run(dir, &args, mode)?;
        Self::rebase_result(dir, result, &args)
    }

    fn rebase_abort(&self, dir: &Path) -> Result<(), GitError> {
        Self::output(dir, &["rebase", "--abort"]).map(drop)
    }

    fn rebase_in_progress(&self, dir: &Path) -> Result<bool, GitError> {
        Ok(Git::open(dir)?.state().is_rebase())
    }

    fn merge_ff_only(&self, dir: &Path, onto: &str) -> Result<FastForward, GitError> {
        if !Git::open(dir)?.can_fast_forward(onto)? {
            return Ok(FastForward::NotFastForward);
        }
        Self::output(dir, &["merge", "--ff-only", onto])?;
        Ok(FastForward::Advanced)
    }

    fn ahead_behind(&self, dir: &Path, onto: &str) -> Result<AheadBehind, GitError> {
        Git::open(dir)?.ahead_behind(onto)
    }

    fn changed_paths(
        &self,
        dir: &Path,
        from: &str,
        to: &str,
    ) -> Result<BTreeSet<String>, GitError> {
        Git::open(dir)?.changed_since_fork(from, to)
    }

    fn list_worktrees(&self, dir: &Path) -> Result<Vec<PathBuf>, GitError> {
        Git::open(dir)?.worktrees()
    }

    fn upstream(&self, dir: &Path) -> Result<Option<String>, GitError> {
        Git::open(dir)?.upstream()
    }

    fn push_force_with_lease(&self, dir: &Path, mode: RunMode) -> Result<(), GitError> {
        Self::run_checked(dir, &["push", "--force-with-lease"], mode)
    }

    fn push_set_upstream(&self, dir: &Path, remote: &str, mode: RunMode) -> Result<(), GitError> {
        Self::run_checked(dir, &["push", "-u", remote, "HEAD"], mode)
    }
}
