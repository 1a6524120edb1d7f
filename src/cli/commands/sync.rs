//! cli::commands::sync
//!
//! Rebase the current worktree onto the base branch, or every worktree with
//! `--all`.
//!
//! # Example
//!
//! ```bash
//! # Sync this worktree
//! wt sync
//!
//! # Resume after resolving conflicts
//! wt sync --continue
//!
//! # Sync all feature worktrees
//! wt sync --all
//! ```

use anyhow::Result;

use super::Session;
use crate::engine::{BatchRunner, Context, SyncMode, SyncOrchestrator, SyncOutcome};
use crate::git::GitVcs;
use crate::ui::prompts::TerminalPrompter;

/// Run the sync command.
pub fn sync(ctx: &Context, continue_: bool, abort: bool, all: bool) -> Result<()> {
    let mode = SyncMode::from_flags(continue_, abort)?;
    let session = Session::open(ctx)?;
    let vcs = GitVcs::new();

    if all {
        // Per-unit failures are reported in the summary, not as an exit status.
        let summary = BatchRunner::new(&vcs, &session.config)
            .verbosity(ctx.verbosity())
            .run(&session.workdir)?;
        tracing::debug!(failed = summary.failed(), "batch finished");
        return Ok(());
    }

    let prompter = TerminalPrompter::new(ctx.interactive);
    let outcome = SyncOrchestrator::new(
        &vcs,
        &prompter,
        &session.config,
        session.store.clone(),
        &session.workdir,
    )
    .verbosity(ctx.verbosity())
    .sync(mode)?;

    tracing::debug!(?outcome, "sync finished");
    if outcome == SyncOutcome::Cancelled {
        tracing::info!("sync cancelled by user");
    }
    Ok(())
}
