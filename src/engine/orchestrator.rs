//! engine::orchestrator
//!
//! Drives a single-worktree sync.
//!
//! # Strategies
//!
//! - **Base branch** (the configured base, `main` or `master`): fetch and
//!   fast-forward only. Never rebases, never merges, never writes a record.
//! - **Feature branch**: the [`SyncMachine`] lifecycle. The driver performs
//!   each [`Effect`] and feeds the outcome back as the next [`SyncEvent`];
//!   a failing effect becomes [`SyncEvent::Failed`], which rolls the stash
//!   and the record back before the original error is returned.
//!
//! # Example
//!
//! ```ignore
//! use wtsync::engine::{SyncMode, SyncOrchestrator};
//!
//! let orchestrator = SyncOrchestrator::new(&vcs, &prompter, &config, store, workdir);
//! match orchestrator.sync(SyncMode::Start)? {
//!     SyncOutcome::Paused => { /* resolve, then SyncMode::Continue */ }
//!     _ => {}
//! }
//! ```

use std::path::{Path, PathBuf};

use super::machine::{Effect, SyncEvent, SyncMachine};
use super::stash::{StashGuard, STASH_MESSAGE};
use super::{SyncError, SyncMode, SyncOutcome};
use crate::core::config::Config;
use crate::core::conflict::{self, ConflictPrediction};
use crate::core::ops::{StateError, SyncStateStore};
use crate::core::types::BranchName;
use crate::git::{FastForward, GitError, RebaseOutcome, Vcs};
use crate::ui::output::{self, Verbosity};
use crate::ui::prompts::{PromptError, Prompter};

/// What performing one effect produced.
enum Step {
    Next(SyncEvent),
    Done(SyncOutcome),
    Applied,
}

/// Syncs one worktree according to its branch kind.
pub struct SyncOrchestrator<'a, V: Vcs + ?Sized, P: Prompter + ?Sized> {
    vcs: &'a V,
    prompter: &'a P,
    config: &'a Config,
    store: SyncStateStore,
    workdir: PathBuf,
    verbosity: Verbosity,
}

impl<'a, V: Vcs + ?Sized, P: Prompter + ?Sized> SyncOrchestrator<'a, V, P> {
    /// Create an orchestrator for the worktree at `workdir`, whose record
    /// lives in `store`.
    pub fn new(
        vcs: &'a V,
        prompter: &'a P,
        config: &'a Config,
        store: SyncStateStore,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            vcs,
            prompter,
            config,
            store,
            workdir: workdir.into(),
            verbosity: Verbosity::Normal,
        }
    }

    /// Set the output verbosity. Quiet also silences git.
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// The worktree being synced.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run the requested part of the lifecycle.
    pub fn sync(&self, mode: SyncMode) -> Result<SyncOutcome, SyncError> {
        tracing::debug!(?mode, workdir = %self.workdir.display(), "sync");
        match mode {
            SyncMode::Start => self.start(),
            SyncMode::Continue => self.resume(),
            SyncMode::Abort => self.abort(),
        }
    }

    fn start(&self) -> Result<SyncOutcome, SyncError> {
        if self.store.exists() {
            return Err(SyncError::SyncInProgress);
        }
        if self.vcs.rebase_in_progress(&self.workdir)? {
            return Err(SyncError::RebaseInProgress);
        }
        let branch = self
            .vcs
            .current_branch(&self.workdir)?
            .ok_or(SyncError::DetachedHead)?;

        if self.config.is_base_branch(&branch) {
            self.sync_base_branch(&branch)
        } else {
            self.sync_feature_branch(&branch)
        }
    }

    // =========================================================================
    // Base branch
    // =========================================================================

    fn sync_base_branch(&self, branch: &BranchName) -> Result<SyncOutcome, SyncError> {
        let target = branch.on_remote(self.config.remote());
        output::print(format!("Syncing {} (fast-forward only)...", branch), self.verbosity);

        let guard = if self.vcs.is_dirty(&self.workdir)? {
            let status = self.vcs.status_short(&self.workdir)?;
            output::warn(
                format!("you have uncommitted changes:\n{}", output::indent(&status, "    ")),
                self.verbosity,
            );
            let consent = match self.prompter.confirm("Stash changes and continue?", true) {
                Ok(answer) => answer,
                Err(PromptError::NotInteractive) => {
                    output::print(
                        "Not stashing without confirmation; commit or stash first",
                        self.verbosity,
                    );
                    false
                }
                Err(e) => return Err(e.into()),
            };
            if !consent {
                self.report(SyncOutcome::Cancelled, &target, false);
                return Ok(SyncOutcome::Cancelled);
            }
            output::print("Stashing uncommitted changes...", self.verbosity);
            StashGuard::push(self.vcs, &self.workdir, STASH_MESSAGE).map_err(SyncError::Stash)?
        } else {
            StashGuard::clean(self.vcs, &self.workdir)
        };

        let result = self.fast_forward(branch, &target);
        let restored = guard.restore();

        let outcome = match (result, restored) {
            (Ok(outcome), Ok(_)) => outcome,
            (Ok(_), Err(e)) => return Err(SyncError::Restore(e)),
            (Err(e), Ok(_)) => return Err(e),
            (Err(e), Err(restore)) => {
                output::warn(
                    format!("failed to restore stashed changes: {}", restore),
                    self.verbosity,
                );
                return Err(e);
            }
        };

        self.report(outcome, &target, false);
        Ok(outcome)
    }

    fn fast_forward(&self, branch: &BranchName, target: &str) -> Result<SyncOutcome, SyncError> {
        output::print(format!("Fetching {}...", target), self.verbosity);
        self.vcs
            .fetch(&self.workdir, self.config.remote(), branch.as_str())
            .map_err(|source| SyncError::Fetch {
                remote: self.config.remote().to_string(),
                branch: branch.to_string(),
                source,
            })?;

        let distance = self.vcs.ahead_behind(&self.workdir, target)?;
        tracing::debug!(ahead = distance.ahead, behind = distance.behind, %target, "base distance");
        if distance.is_current() {
            return Ok(SyncOutcome::UpToDate);
        }

        output::print(
            format!(
                "Fast-forwarding ({} behind)...",
                output::plural(distance.behind, "commit")
            ),
            self.verbosity,
        );
        match self.vcs.merge_ff_only(&self.workdir, target)? {
            FastForward::Advanced => Ok(SyncOutcome::Synced),
            FastForward::NotFastForward => Err(SyncError::NotFastForward {
                branch: branch.to_string(),
                target: target.to_string(),
            }),
        }
    }

    // =========================================================================
    // Feature branch
    // =========================================================================

    fn sync_feature_branch(&self, branch: &BranchName) -> Result<SyncOutcome, SyncError> {
        output::print(
            format!("Syncing {} onto {}...", branch, self.config.base_ref()),
            self.verbosity,
        );
        let dirty = self.vcs.is_dirty(&self.workdir)?;
        self.drive(SyncMachine::new(), None, SyncEvent::Begin { dirty })
    }

    fn resume(&self) -> Result<SyncOutcome, SyncError> {
        let state = self.store.load()?.ok_or(SyncError::NoSyncInProgress)?;
        let rebase_in_progress = self.vcs.rebase_in_progress(&self.workdir)?;
        let guard = StashGuard::adopt(self.vcs, &self.workdir, state.stashed);
        self.drive(
            SyncMachine::resume(Some(state)),
            Some(guard),
            SyncEvent::Continue { rebase_in_progress },
        )
    }

    fn abort(&self) -> Result<SyncOutcome, SyncError> {
        let state = match self.store.load() {
            Ok(state) => state,
            Err(StateError::Corrupt { .. }) => {
                output::warn(
                    "sync record is unreadable; any auto-stash stays in `git stash list`",
                    self.verbosity,
                );
                None
            }
            Err(e) => return Err(e.into()),
        };
        let rebase_in_progress = self.vcs.rebase_in_progress(&self.workdir)?;
        let guard = state.map(|s| StashGuard::adopt(self.vcs, &self.workdir, s.stashed));
        self.drive(
            SyncMachine::resume(state),
            guard,
            SyncEvent::Abort { rebase_in_progress },
        )
    }

    /// Feed events to the machine and perform its effects until it settles.
    ///
    /// A failing effect in a non-terminal phase turns into
    /// [`SyncEvent::Failed`]; the first error is the one returned. Once the
    /// machine is terminal, a failure stops the remaining effects, except
    /// that a failed stash restore still clears the record.
    fn drive(
        &self,
        mut machine: SyncMachine,
        mut guard: Option<StashGuard<'a, V>>,
        first: SyncEvent,
    ) -> Result<SyncOutcome, SyncError> {
        let mut next = Some(first);
        let mut outcome = None;
        let mut failure: Option<SyncError> = None;

        while let Some(event) = next.take() {
            let effects = machine.apply(event)?;
            let mut cleanup_only = false;

            for effect in effects {
                if cleanup_only && effect != Effect::ClearState {
                    continue;
                }
                match self.perform(effect, &mut guard, machine.stashed()) {
                    Ok(Step::Next(event)) => next = Some(event),
                    Ok(Step::Done(done)) => outcome = Some(done),
                    Ok(Step::Applied) => {}
                    Err(err) if !machine.phase().is_terminal() => {
                        tracing::debug!(phase = ?machine.phase(), error = %err, "sync step failed");
                        failure = Some(err);
                        next = Some(SyncEvent::Failed);
                        break;
                    }
                    Err(err) => {
                        self.note_failure(&mut failure, err);
                        if effect != Effect::RestoreStash {
                            break;
                        }
                        cleanup_only = true;
                    }
                }
            }
        }

        // Whatever the guard still owns is recorded on disk.
        if let Some(guard) = guard {
            guard.keep();
        }

        if let Some(err) = failure {
            return Err(err);
        }
        outcome.ok_or(SyncError::Incomplete(machine.phase()))
    }

    fn note_failure(&self, failure: &mut Option<SyncError>, err: SyncError) {
        match failure {
            None => *failure = Some(err),
            Some(_) => output::warn(format!("{:#}", anyhow::Error::from(err)), self.verbosity),
        }
    }

    fn perform(
        &self,
        effect: Effect,
        guard: &mut Option<StashGuard<'a, V>>,
        stashed: bool,
    ) -> Result<Step, SyncError> {
        let base_ref = self.config.base_ref();
        let dir = self.workdir.as_path();

        match effect {
            Effect::PushStash => {
                output::print("Stashing uncommitted changes...", self.verbosity);
                let pushed =
                    StashGuard::push(self.vcs, dir, STASH_MESSAGE).map_err(SyncError::Stash)?;
                *guard = Some(pushed);
                Ok(Step::Next(SyncEvent::Stashed))
            }
            Effect::SaveState(state) => {
                self.store.save(state)?;
                Ok(Step::Next(SyncEvent::StateWritten))
            }
            Effect::Fetch => {
                output::print(format!("Fetching {}...", base_ref), self.verbosity);
                let base = self.config.base_branch();
                self.vcs
                    .fetch(dir, self.config.remote(), base.as_str())
                    .map_err(|source| SyncError::Fetch {
                        remote: self.config.remote().to_string(),
                        branch: base.to_string(),
                        source,
                    })?;
                let distance = self.vcs.ahead_behind(dir, &base_ref)?;
                tracing::debug!(ahead = distance.ahead, behind = distance.behind, "base distance");
                if distance.behind > 0 {
                    output::print(
                        format!(
                            "{} behind {}",
                            output::plural(distance.behind, "commit"),
                            base_ref
                        ),
                        self.verbosity,
                    );
                }
                Ok(Step::Next(SyncEvent::Fetched {
                    behind: distance.behind,
                }))
            }
            Effect::PreviewConflicts => Ok(Step::Next(SyncEvent::Previewed {
                proceed: self.preview(&base_ref)?,
            })),
            Effect::Rebase => {
                output::print(format!("Rebasing onto {}...", base_ref), self.verbosity);
                let result = self.vcs.rebase(dir, &base_ref, self.verbosity.run_mode())?;
                Ok(Step::Next(rebase_event(result)))
            }
            Effect::ContinueRebase => {
                output::print("Continuing rebase...", self.verbosity);
                let result = self.vcs.rebase_continue(dir, self.verbosity.run_mode())?;
                Ok(Step::Next(rebase_event(result)))
            }
            Effect::AbortRebase => {
                output::print("Aborting rebase...", self.verbosity);
                self.vcs.rebase_abort(dir)?;
                Ok(Step::Applied)
            }
            Effect::RestoreStash => {
                if let Some(owned) = guard.take() {
                    output::print("Restoring stashed changes...", self.verbosity);
                    owned.restore().map_err(SyncError::Restore)?;
                }
                Ok(Step::Applied)
            }
            Effect::ClearState => {
                self.store.clear()?;
                Ok(Step::Applied)
            }
            Effect::Report(outcome) => {
                self.report(outcome, &base_ref, stashed);
                Ok(Step::Done(outcome))
            }
        }
    }

    /// Warn about files changed on both sides; returns whether to proceed.
    ///
    /// Advisory: without a terminal, or when the overlap cannot be computed
    /// (unrelated histories, say), the rebase goes ahead.
    fn preview(&self, base_ref: &str) -> Result<bool, SyncError> {
        let prediction = match self.predict_conflicts(base_ref) {
            Ok(prediction) => prediction,
            Err(e) => {
                tracing::warn!(error = %e, "skipping conflict preview");
                return Ok(true);
            }
        };
        if prediction.is_empty() {
            return Ok(true);
        }

        let paths: Vec<&str> = prediction.paths().collect();
        output::warn(
            format!(
                "{} changed on both sides; the rebase may conflict:\n{}",
                output::plural(prediction.len(), "file"),
                output::format_list(&paths, "    ")
            ),
            self.verbosity,
        );

        match self.prompter.confirm("Rebase anyway?", true) {
            Ok(proceed) => Ok(proceed),
            Err(PromptError::NotInteractive) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    fn predict_conflicts(&self, base_ref: &str) -> Result<ConflictPrediction, GitError> {
        let dir = self.workdir.as_path();
        let remote = self.vcs.changed_paths(dir, "HEAD", base_ref)?;
        let local = self.vcs.changed_paths(dir, base_ref, "HEAD")?;
        Ok(conflict::predict(&remote, &local))
    }

    fn report(&self, outcome: SyncOutcome, target: &str, stashed: bool) {
        match outcome {
            SyncOutcome::Synced => {
                output::success(format!("Synced with {}", target), self.verbosity)
            }
            SyncOutcome::UpToDate => {
                output::success(format!("Already up to date with {}", target), self.verbosity)
            }
            SyncOutcome::Paused => {
                let mut message = String::from(
                    "\nRebase paused on conflicts.\n\n  \
                     Resolve the conflicts and stage them (git add), then run:\n    \
                     wt sync --continue\n  \
                     To give up and restore your branch:\n    \
                     wt sync --abort",
                );
                if stashed {
                    message.push_str(
                        "\n\n  Your uncommitted changes are stashed and come back when the sync finishes.",
                    );
                }
                output::print(message, self.verbosity);
            }
            SyncOutcome::Aborted => output::print("Sync aborted", self.verbosity),
            SyncOutcome::Cancelled => output::print("Cancelled", self.verbosity),
        }
    }
}

fn rebase_event(outcome: RebaseOutcome) -> SyncEvent {
    match outcome {
        RebaseOutcome::Completed => SyncEvent::RebaseFinished,
        RebaseOutcome::Conflict => SyncEvent::RebaseConflicted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ops::SyncState;
    use crate::git::mock::{FailOn, MockCopy, MockOperation, MockVcs};
    use std::cell::RefCell;
    use tempfile::TempDir;

    const DIR: &str = "/src/app";

    /// Answers every prompt with a fixed reply and remembers the questions.
    struct Scripted {
        answer: Option<bool>,
        asked: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn answering(answer: bool) -> Self {
            Self {
                answer: Some(answer),
                asked: RefCell::new(Vec::new()),
            }
        }

        fn non_interactive() -> Self {
            Self {
                answer: None,
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl Prompter for Scripted {
        fn confirm(&self, message: &str, _default: bool) -> Result<bool, PromptError> {
            self.asked.borrow_mut().push(message.to_string());
            self.answer.ok_or(PromptError::NotInteractive)
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: SyncStateStore,
        config: Config,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        Fixture {
            store: SyncStateStore::at(dir.path().join("wt-sync-state")),
            config: Config::new(BranchName::new("main").unwrap(), "origin"),
            _dir: dir,
        }
    }

    fn orchestrator<'a>(
        vcs: &'a MockVcs,
        prompter: &'a Scripted,
        f: &'a Fixture,
    ) -> SyncOrchestrator<'a, MockVcs, Scripted> {
        SyncOrchestrator::new(vcs, prompter, &f.config, f.store.clone(), DIR)
            .verbosity(Verbosity::Quiet)
    }

    fn dir() -> &'static Path {
        Path::new(DIR)
    }

    fn count(vcs: &MockVcs, pred: impl Fn(&MockOperation) -> bool) -> usize {
        vcs.operations().iter().filter(|op| pred(op)).count()
    }

    fn is_pop(op: &MockOperation) -> bool {
        matches!(op, MockOperation::StashPop { .. })
    }

    fn is_stash(op: &MockOperation) -> bool {
        matches!(
            op,
            MockOperation::StashPush { .. } | MockOperation::StashPop { .. }
        )
    }

    mod start {
        use super::*;

        #[test]
        fn detached_head_is_an_error() {
            let f = fixture();
            let vcs = MockVcs::new().with_copy(DIR, MockCopy::detached());
            let p = Scripted::non_interactive();
            let err = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap_err();
            assert!(matches!(err, SyncError::DetachedHead));
        }

        #[test]
        fn existing_record_blocks_new_sync() {
            let f = fixture();
            f.store.save(SyncState { stashed: false }).unwrap();
            let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature"));
            let p = Scripted::non_interactive();
            let err = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap_err();
            assert!(matches!(err, SyncError::SyncInProgress));
            assert!(vcs.operations().is_empty());
        }

        #[test]
        fn foreign_rebase_blocks_new_sync() {
            let f = fixture();
            let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature"));
            vcs.update(dir(), |c| c.rebasing = true);
            let p = Scripted::non_interactive();
            let err = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap_err();
            assert!(matches!(err, SyncError::RebaseInProgress));
        }
    }

    mod feature_branch {
        use super::*;

        #[test]
        fn dirty_sync_failing_at_fetch_restores_changes() {
            let f = fixture();
            let vcs = MockVcs::new()
                .with_copy(DIR, MockCopy::on_branch("feature").dirty().behind(2))
                .fail_on(FailOn::Fetch);
            let p = Scripted::non_interactive();

            let err = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap_err();
            assert!(matches!(err, SyncError::Fetch { .. }));

            let copy = vcs.copy(dir()).unwrap();
            assert!(copy.dirty);
            assert!(copy.stashes.is_empty());
            assert!(!f.store.exists());
        }

        #[test]
        fn up_to_date_only_fetches_and_restores() {
            let f = fixture();
            let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature").dirty());
            let p = Scripted::non_interactive();

            let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap();
            assert_eq!(outcome, SyncOutcome::UpToDate);
            assert_eq!(
                count(&vcs, |op| matches!(op, MockOperation::Fetch { .. })),
                1
            );
            assert_eq!(count(&vcs, |op| matches!(op, MockOperation::Rebase { .. })), 0);
            assert_eq!(count(&vcs, is_pop), 1);
            assert!(!f.store.exists());
        }

        #[test]
        fn clean_sync_rebases() {
            let f = fixture();
            let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature").behind(3));
            let p = Scripted::non_interactive();

            let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap();
            assert_eq!(outcome, SyncOutcome::Synced);
            assert_eq!(count(&vcs, is_stash), 0);
            assert_eq!(vcs.copy(dir()).unwrap().ahead_behind.behind, 0);
            assert!(!f.store.exists());
        }

        #[test]
        fn declined_preview_cancels() {
            let f = fixture();
            let vcs = MockVcs::new().with_copy(
                DIR,
                MockCopy::on_branch("feature")
                    .dirty()
                    .behind(1)
                    .changes(&["src/lib.rs", "README.md"], &["src/lib.rs"]),
            );
            let p = Scripted::answering(false);

            let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap();
            assert_eq!(outcome, SyncOutcome::Cancelled);
            assert_eq!(p.asked.borrow().len(), 1);
            assert_eq!(count(&vcs, |op| matches!(op, MockOperation::Rebase { .. })), 0);
            assert!(vcs.copy(dir()).unwrap().dirty);
            assert!(!f.store.exists());
        }

        #[test]
        fn unavailable_preview_does_not_block() {
            let f = fixture();
            let vcs = MockVcs::new()
                .with_copy(DIR, MockCopy::on_branch("feature").dirty().behind(1))
                .fail_on(FailOn::ChangedPaths);
            let p = Scripted::answering(false);

            let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap();
            assert_eq!(outcome, SyncOutcome::Synced);
            assert!(p.asked.borrow().is_empty());
            assert_eq!(count(&vcs, |op| matches!(op, MockOperation::Rebase { .. })), 1);
            assert_eq!(count(&vcs, is_pop), 1);
            assert!(!f.store.exists());
        }

        #[test]
        fn overlap_without_terminal_proceeds() {
            let f = fixture();
            let vcs = MockVcs::new().with_copy(
                DIR,
                MockCopy::on_branch("feature")
                    .behind(1)
                    .changes(&["src/lib.rs"], &["src/lib.rs"]),
            );
            let p = Scripted::non_interactive();

            let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap();
            assert_eq!(outcome, SyncOutcome::Synced);
        }

        #[test]
        fn no_overlap_never_prompts() {
            let f = fixture();
            let vcs = MockVcs::new().with_copy(
                DIR,
                MockCopy::on_branch("feature")
                    .behind(1)
                    .changes(&["a.rs"], &["b.rs"]),
            );
            let p = Scripted::answering(false);

            orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap();
            assert!(p.asked.borrow().is_empty());
        }

        #[test]
        fn failed_rebase_rolls_back() {
            let f = fixture();
            let vcs = MockVcs::new()
                .with_copy(DIR, MockCopy::on_branch("feature").dirty().behind(1))
                .fail_on(FailOn::Rebase(dir().to_path_buf()));
            let p = Scripted::non_interactive();

            let err = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap_err();
            assert!(matches!(err, SyncError::Git(_)));
            assert!(vcs.copy(dir()).unwrap().dirty);
            assert!(!f.store.exists());
        }

        #[test]
        fn stash_failure_leaves_nothing_behind() {
            let f = fixture();
            let vcs = MockVcs::new()
                .with_copy(DIR, MockCopy::on_branch("feature").dirty().behind(1))
                .fail_on(FailOn::StashPush);
            let p = Scripted::non_interactive();

            let err = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap_err();
            assert!(matches!(err, SyncError::Stash(_)));
            assert!(!f.store.exists());
            assert_eq!(count(&vcs, |op| matches!(op, MockOperation::Fetch { .. })), 0);
        }
    }

    mod pause_and_resume {
        use super::*;

        fn paused() -> (Fixture, MockVcs) {
            let f = fixture();
            let vcs = MockVcs::new().with_copy(
                DIR,
                MockCopy::on_branch("feature").dirty().behind(2).conflicting(),
            );
            let p = Scripted::non_interactive();
            let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap();
            assert_eq!(outcome, SyncOutcome::Paused);
            (f, vcs)
        }

        #[test]
        fn conflict_keeps_record_and_stash() {
            let (f, vcs) = paused();
            assert_eq!(f.store.load().unwrap(), Some(SyncState { stashed: true }));
            assert_eq!(vcs.copy(dir()).unwrap().stashes.len(), 1);
            assert_eq!(count(&vcs, is_pop), 0);
        }

        #[test]
        fn continue_twice_with_conflicts_stays_paused() {
            let (f, vcs) = paused();
            let p = Scripted::non_interactive();

            for _ in 0..2 {
                let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Continue).unwrap();
                assert_eq!(outcome, SyncOutcome::Paused);
                assert_eq!(f.store.load().unwrap(), Some(SyncState { stashed: true }));
            }
            assert_eq!(count(&vcs, is_pop), 0);
        }

        #[test]
        fn continue_after_resolution_restores_once() {
            let (f, vcs) = paused();
            let p = Scripted::non_interactive();
            vcs.update(dir(), |c| c.resolved = true);

            let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Continue).unwrap();
            assert_eq!(outcome, SyncOutcome::Synced);
            assert_eq!(count(&vcs, is_pop), 1);
            assert!(vcs.copy(dir()).unwrap().dirty);
            assert!(!f.store.exists());
        }

        #[test]
        fn continue_after_manual_rebase_finish() {
            let (f, vcs) = paused();
            let p = Scripted::non_interactive();
            vcs.update(dir(), |c| c.rebasing = false);

            let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Continue).unwrap();
            assert_eq!(outcome, SyncOutcome::Synced);
            assert_eq!(
                count(&vcs, |op| matches!(op, MockOperation::RebaseContinue { .. })),
                0
            );
            assert!(!f.store.exists());
        }

        #[test]
        fn continue_without_record_is_an_error() {
            let (f, vcs) = paused();
            f.store.clear().unwrap();
            let p = Scripted::non_interactive();

            let err = orchestrator(&vcs, &p, &f).sync(SyncMode::Continue).unwrap_err();
            assert!(matches!(err, SyncError::NoSyncInProgress));
        }

        #[test]
        fn abort_restores_exactly_once_and_is_idempotent() {
            let (f, vcs) = paused();
            let p = Scripted::non_interactive();
            let head_before = vcs.copy(dir()).unwrap().head;

            let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Abort).unwrap();
            assert_eq!(outcome, SyncOutcome::Aborted);
            let copy = vcs.copy(dir()).unwrap();
            assert!(!copy.rebasing);
            assert!(copy.dirty);
            assert_eq!(copy.head, head_before);
            assert!(!f.store.exists());

            let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Abort).unwrap();
            assert_eq!(outcome, SyncOutcome::Aborted);
            assert_eq!(count(&vcs, is_pop), 1);
            assert_eq!(
                count(&vcs, |op| matches!(op, MockOperation::RebaseAbort { .. })),
                1
            );
        }

        #[test]
        fn failed_restore_on_abort_still_clears_record() {
            let (f, vcs) = paused();
            let vcs = vcs.fail_on(FailOn::StashPop);
            let p = Scripted::non_interactive();

            let err = orchestrator(&vcs, &p, &f).sync(SyncMode::Abort).unwrap_err();
            assert!(matches!(err, SyncError::Restore(_)));
            assert!(!f.store.exists());
            assert_eq!(vcs.copy(dir()).unwrap().stashes.len(), 1);
        }
    }

    #[test]
    fn abort_without_record_or_rebase_is_a_no_op() {
        let f = fixture();
        let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature"));
        let p = Scripted::non_interactive();

        let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Abort).unwrap();
        assert_eq!(outcome, SyncOutcome::Aborted);
        assert!(vcs.operations().is_empty());
    }

    #[test]
    fn abort_with_corrupt_record_clears_it() {
        let f = fixture();
        std::fs::write(f.store.path(), "garbage").unwrap();
        let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature"));
        let p = Scripted::non_interactive();

        let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Abort).unwrap();
        assert_eq!(outcome, SyncOutcome::Aborted);
        assert!(!f.store.exists());
    }

    mod base_branch {
        use super::*;

        #[test]
        fn clean_and_behind_fast_forwards_without_stashing() {
            let f = fixture();
            let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("main").behind(3));
            let p = Scripted::non_interactive();

            let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap();
            assert_eq!(outcome, SyncOutcome::Synced);
            assert_eq!(
                vcs.operations(),
                vec![
                    MockOperation::Fetch {
                        remote: "origin".into(),
                        branch: "main".into()
                    },
                    MockOperation::MergeFfOnly {
                        dir: dir().to_path_buf(),
                        onto: "origin/main".into()
                    },
                ]
            );
            assert!(!f.store.exists());
        }

        #[test]
        fn master_is_always_shared() {
            let f = fixture();
            let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("master").behind(1));
            let p = Scripted::non_interactive();

            orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap();
            assert_eq!(count(&vcs, |op| matches!(op, MockOperation::Rebase { .. })), 0);
            assert!(vcs
                .operations()
                .contains(&MockOperation::Fetch {
                    remote: "origin".into(),
                    branch: "master".into()
                }));
        }

        #[test]
        fn diverged_history_is_fatal_and_restores() {
            let f = fixture();
            let vcs = MockVcs::new()
                .with_copy(DIR, MockCopy::on_branch("main").dirty().behind(1).ahead(1).diverged());
            let p = Scripted::answering(true);

            let err = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap_err();
            assert!(matches!(err, SyncError::NotFastForward { .. }));
            assert!(vcs.copy(dir()).unwrap().dirty);
            assert_eq!(count(&vcs, is_pop), 1);
        }

        #[test]
        fn dirty_without_consent_touches_nothing() {
            let f = fixture();
            let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("main").dirty().behind(1));

            for p in [Scripted::answering(false), Scripted::non_interactive()] {
                let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap();
                assert_eq!(outcome, SyncOutcome::Cancelled);
                assert_eq!(p.asked.borrow().len(), 1);
            }
            assert!(vcs.operations().is_empty());
        }

        #[test]
        fn dirty_with_consent_stashes_and_restores() {
            let f = fixture();
            let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("main").dirty());
            let p = Scripted::answering(true);

            let outcome = orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap();
            assert_eq!(outcome, SyncOutcome::UpToDate);
            assert_eq!(count(&vcs, is_stash), 2);
            assert!(vcs.copy(dir()).unwrap().dirty);
        }

        #[test]
        fn configured_base_branch_is_fast_forwarded() {
            let mut f = fixture();
            f.config = Config::new(BranchName::new("develop").unwrap(), "upstream");
            let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("develop").behind(1));
            let p = Scripted::non_interactive();

            orchestrator(&vcs, &p, &f).sync(SyncMode::Start).unwrap();
            assert!(vcs.operations().contains(&MockOperation::MergeFfOnly {
                dir: dir().to_path_buf(),
                onto: "upstream/develop".into()
            }));
        }
    }
}
