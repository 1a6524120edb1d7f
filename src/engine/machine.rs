//! engine::machine
//!
//! Pure transition function for the feature-branch sync.
//!
//! # Design
//!
//! [`SyncMachine::apply`] maps the current phase and an observed
//! [`SyncEvent`] to the next phase and the [`Effect`]s the driver must
//! perform, in order. It does no I/O, so every path (including the failure
//! paths) is unit- and property-testable. The driver in
//! [`super::orchestrator`] performs each effect and feeds the result back as
//! the next event.
//!
//! ```text
//! Idle ─dirty─> Stashing ─> StateSaved ─> Fetching ─behind>0─> ConflictPreview ─> Rebasing
//!   └─clean──────────────────┘               │                      │               │  │
//!                                    behind=0└─> Resolved <─────────┼───────────────┘  │
//!                                                                   └─> Cancelled       └─> Paused
//! ```
//!
//! # Invariants
//!
//! - The state record is saved before [`Effect::Fetch`] is ever emitted.
//! - [`Effect::RestoreStash`] is emitted at most once per machine, and only
//!   when a stash was pushed (or recorded, for a resumed sync).
//! - Every terminal phase except `Paused` emits [`Effect::ClearState`].

use thiserror::Error;

use super::SyncOutcome;
use crate::core::ops::SyncState;

/// Phase of a feature-branch sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    /// Nothing has happened yet.
    Idle,
    /// Uncommitted changes are being stashed.
    Stashing,
    /// The state record is being written.
    StateSaved,
    /// Fetching the base branch and measuring distance.
    Fetching,
    /// Looking for files changed on both sides.
    ConflictPreview,
    /// Git is rebasing.
    Rebasing,
    /// Finished; the branch contains the base.
    Resolved,
    /// Stopped on a conflict; the record is kept for a later invocation.
    Paused,
    /// Abandoned by the user; pre-sync state restored.
    Aborted,
    /// The user declined to proceed.
    Cancelled,
    /// A non-conflict error occurred; changes restored.
    Failed,
}

impl SyncPhase {
    /// Whether the invocation ends in this phase.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SyncPhase::Resolved
                | SyncPhase::Paused
                | SyncPhase::Aborted
                | SyncPhase::Cancelled
                | SyncPhase::Failed
        )
    }
}

/// Something the driver observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// A fresh sync starts on a tree that is or is not dirty.
    Begin { dirty: bool },
    /// The stash was pushed.
    Stashed,
    /// The state record was written.
    StateWritten,
    /// Fetch finished; HEAD is `behind` commits behind the base.
    Fetched { behind: usize },
    /// The overlap check finished; `proceed` is false if the user declined.
    Previewed { proceed: bool },
    /// A rebase step finished cleanly.
    RebaseFinished,
    /// A rebase step stopped on a conflict.
    RebaseConflicted,
    /// The user asked to continue a paused sync.
    Continue { rebase_in_progress: bool },
    /// The user asked to abort.
    Abort { rebase_in_progress: bool },
    /// The last effect failed with a non-conflict error.
    Failed,
}

/// Work the driver must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    PushStash,
    SaveState(SyncState),
    Fetch,
    PreviewConflicts,
    Rebase,
    ContinueRebase,
    AbortRebase,
    RestoreStash,
    ClearState,
    Report(SyncOutcome),
}

/// An event that makes no sense in the current phase.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid sync transition: {event:?} while {phase:?}")]
pub struct TransitionError {
    pub phase: SyncPhase,
    pub event: SyncEvent,
}

/// Feature-branch sync state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncMachine {
    phase: SyncPhase,
    stashed: bool,
}

impl Default for SyncMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncMachine {
    /// A machine for a fresh sync.
    pub fn new() -> Self {
        Self {
            phase: SyncPhase::Idle,
            stashed: false,
        }
    }

    /// A machine rebuilt from a persisted record.
    ///
    /// With a record the sync is `Paused`; without one it is `Idle`, which
    /// still accepts `Abort`.
    pub fn resume(state: Option<SyncState>) -> Self {
        match state {
            Some(state) => Self {
                phase: SyncPhase::Paused,
                stashed: state.stashed,
            },
            None => Self::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Whether a stash is owed back to the working tree.
    pub fn stashed(&self) -> bool {
        self.stashed
    }

    /// Advance on `event`, returning the effects to perform in order.
    pub fn apply(&mut self, event: SyncEvent) -> Result<Vec<Effect>, TransitionError> {
        use SyncEvent as E;
        use SyncPhase as P;

        let (next, effects) = match (self.phase, event) {
            (P::Idle, E::Begin { dirty: true }) => (P::Stashing, vec![Effect::PushStash]),
            (P::Idle, E::Begin { dirty: false }) => (
                P::StateSaved,
                vec![Effect::SaveState(SyncState { stashed: false })],
            ),
            (P::Stashing, E::Stashed) => {
                self.stashed = true;
                (
                    P::StateSaved,
                    vec![Effect::SaveState(SyncState { stashed: true })],
                )
            }
            (P::StateSaved, E::StateWritten) => (P::Fetching, vec![Effect::Fetch]),
            (P::Fetching, E::Fetched { behind: 0 }) => {
                (P::Resolved, self.settle(SyncOutcome::UpToDate))
            }
            (P::Fetching, E::Fetched { .. }) => {
                (P::ConflictPreview, vec![Effect::PreviewConflicts])
            }
            (P::ConflictPreview, E::Previewed { proceed: true }) => {
                (P::Rebasing, vec![Effect::Rebase])
            }
            (P::ConflictPreview, E::Previewed { proceed: false }) => {
                (P::Cancelled, self.settle(SyncOutcome::Cancelled))
            }
            (P::Rebasing, E::RebaseFinished) => (P::Resolved, self.settle(SyncOutcome::Synced)),
            (P::Rebasing, E::RebaseConflicted) => {
                (P::Paused, vec![Effect::Report(SyncOutcome::Paused)])
            }
            (P::Paused, E::Continue { rebase_in_progress: true }) => {
                (P::Rebasing, vec![Effect::ContinueRebase])
            }
            (P::Paused, E::Continue { rebase_in_progress: false }) => {
                (P::Resolved, self.settle(SyncOutcome::Synced))
            }
            (P::Idle | P::Paused, E::Abort { rebase_in_progress }) => {
                let mut effects = Vec::new();
                if rebase_in_progress {
                    effects.push(Effect::AbortRebase);
                }
                effects.extend(self.settle(SyncOutcome::Aborted));
                (P::Aborted, effects)
            }
            // Nothing was stashed or saved yet.
            (P::Stashing, E::Failed) => (P::Failed, Vec::new()),
            (
                P::StateSaved | P::Fetching | P::ConflictPreview | P::Rebasing,
                E::Failed,
            ) => {
                let mut effects = self.restore();
                effects.push(Effect::ClearState);
                (P::Failed, effects)
            }
            (phase, event) => return Err(TransitionError { phase, event }),
        };

        tracing::debug!(from = ?self.phase, to = ?next, ?event, "sync transition");
        self.phase = next;
        Ok(effects)
    }

    /// Restore, clear, report.
    fn settle(&mut self, outcome: SyncOutcome) -> Vec<Effect> {
        let mut effects = self.restore();
        effects.push(Effect::ClearState);
        effects.push(Effect::Report(outcome));
        effects
    }

    fn restore(&mut self) -> Vec<Effect> {
        if std::mem::take(&mut self.stashed) {
            vec![Effect::RestoreStash]
        } else {
            Vec::new()
        }
    }
}
