//! cli::commands::submit
//!
//! Sync the current feature branch, then push it.
//!
//! The push only happens when the sync leaves the branch current with the
//! base. A pause, an abort or a cancellation pushes nothing.

use anyhow::Result;

use super::Session;
use crate::engine::{publish, Context, SyncError, SyncMode, SyncOrchestrator, SyncOutcome};
use crate::git::{GitVcs, Vcs};
use crate::ui::output;
use crate::ui::prompts::TerminalPrompter;

/// Run the submit command.
pub fn submit(ctx: &Context, continue_: bool, abort: bool) -> Result<()> {
    let mode = SyncMode::from_flags(continue_, abort)?;
    let session = Session::open(ctx)?;
    let vcs = GitVcs::new();
    let verbosity = ctx.verbosity();

    // Refuse before touching anything; a resume may legitimately start
    // from a detached HEAD mid-rebase.
    if !mode.resumes() {
        if let Some(branch) = vcs.current_branch(&session.workdir)? {
            if session.config.is_base_branch(&branch) {
                return Err(SyncError::SubmitBaseBranch(branch.to_string()).into());
            }
        }
    }

    let prompter = TerminalPrompter::new(ctx.interactive);
    let outcome = SyncOrchestrator::new(
        &vcs,
        &prompter,
        &session.config,
        session.store.clone(),
        &session.workdir,
    )
    .verbosity(verbosity)
    .sync(mode)?;

    if !outcome.is_current() {
        tracing::debug!(?outcome, "not pushing");
        if outcome == SyncOutcome::Paused {
            output::print("Not pushed; run `wt submit --continue` once the sync completes.", verbosity);
        }
        return Ok(());
    }

    publish::publish(&vcs, &session.config, &session.workdir, verbosity)?;
    Ok(())
}
