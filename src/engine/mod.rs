//! engine
//!
//! Keeps feature branches in step with the shared base branch.
//!
//! # Architecture
//!
//! ```text
//! wt sync ──> SyncOrchestrator ──base branch──> fetch + fast-forward
//!                    │
//!                    └─feature branch──> SyncMachine (pure) <──> driver effects
//!                                              │
//!                                              └─conflict──> record kept, exit 0
//! wt sync --continue / --abort ──> SyncMachine::resume(record)
//! wt sync --all ──> BatchRunner (per-worktree, no pause/resume)
//! ```
//!
//! - [`machine`]: the pure transition function
//! - [`orchestrator`]: drives the machine against a [`crate::git::Vcs`]
//! - [`stash`]: scoped ownership of an auto-stash
//! - [`batch`]: the same rebase across every worktree
//! - [`publish`]: pushing a freshly synced branch
//!
//! # Invariants
//!
//! - The state record is written before any network I/O.
//! - A stash pushed by a sync is popped at most once.
//! - Only a conflict pause leaves the record behind.

pub mod batch;
pub mod machine;
pub mod modes;
pub mod orchestrator;
pub mod publish;
pub mod stash;

pub use batch::{BatchOutcome, BatchRunner, BatchSummary, UnitReport};
pub use machine::{Effect, SyncEvent, SyncMachine, SyncPhase, TransitionError};
pub use modes::{ModeError, SyncMode};
pub use orchestrator::SyncOrchestrator;
pub use stash::{StashGuard, STASH_MESSAGE};

use std::path::PathBuf;

use thiserror::Error;

use crate::core::ops::StateError;
use crate::git::GitError;
use crate::ui::output::Verbosity;
use crate::ui::prompts::PromptError;

/// The global flags, resolved once and handed to every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// `--cwd`; the process directory when unset.
    pub cwd: Option<PathBuf>,
    pub debug: bool,
    pub quiet: bool,
    /// Already folded with `--quiet` and the terminal check.
    pub interactive: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            cwd: None,
            debug: false,
            quiet: false,
            interactive: true,
        }
    }
}

impl Context {
    /// Output verbosity implied by the flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }
}

/// How a single `wt sync` invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOutcome {
    /// The branch now contains the base.
    Synced,
    /// Nothing to do.
    UpToDate,
    /// Stopped on a conflict; resume with `--continue` or `--abort`.
    Paused,
    /// A paused sync was abandoned.
    Aborted,
    /// The user declined to proceed.
    Cancelled,
}

impl SyncOutcome {
    /// Whether the branch is known to contain the base after this outcome.
    pub fn is_current(self) -> bool {
        matches!(self, SyncOutcome::Synced | SyncOutcome::UpToDate)
    }
}

/// Errors from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// HEAD is not on a branch.
    #[error("not on a branch (detached HEAD)\n   Check out a branch first")]
    DetachedHead,

    /// Git is mid-rebase but wt has no record of starting it.
    #[error("a rebase is already in progress\n   Finish it with: git rebase --continue\n   Or abort it with: git rebase --abort")]
    RebaseInProgress,

    /// A previous sync is paused or was interrupted.
    #[error("a sync is already in progress\n   Resolve conflicts, then run: wt sync --continue\n   Or abort with: wt sync --abort")]
    SyncInProgress,

    /// `--continue` without a paused sync.
    #[error("no sync in progress")]
    NoSyncInProgress,

    /// The base branch has diverged from its remote.
    #[error("cannot fast-forward {branch} to {target}: local history has diverged\n   Reconcile manually; wt never rewrites a shared branch")]
    NotFastForward { branch: String, target: String },

    /// The base branch cannot be submitted.
    #[error("cannot submit the base branch ({0})\n   Switch to a feature worktree, or use git push directly")]
    SubmitBaseBranch(String),

    #[error("failed to stash changes")]
    Stash(#[source] GitError),

    #[error("failed to restore stashed changes\n   Your changes are still in `git stash list`")]
    Restore(#[source] GitError),

    #[error("failed to fetch {remote}/{branch}")]
    Fetch {
        remote: String,
        branch: String,
        #[source]
        source: GitError,
    },

    #[error("failed to push")]
    Push(#[source] GitError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The driver ran out of events before the machine reported an outcome.
    #[error("sync stopped unexpectedly while {0:?}")]
    Incomplete(SyncPhase),
}
