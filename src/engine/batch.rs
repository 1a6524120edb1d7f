//! engine::batch
//!
//! Rebase every feature worktree onto the base branch.
//!
//! # Design
//!
//! One fetch up front, then each worktree in `git worktree list` order. A
//! unit never pauses: conflicts are aborted on the spot and reported, dirty
//! trees are skipped rather than stashed, and an error in one unit is
//! classified and the batch moves on. No sync record is ever written.

use std::fmt;
use std::path::Path;

use super::SyncError;
use crate::core::config::Config;
use crate::core::types::WorkingCopyRef;
use crate::git::{GitError, RebaseOutcome, RunMode, Vcs};
use crate::ui::output::{self, Verbosity};

/// What happened to one worktree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Rebased; the base had `commits` new commits.
    Rebased { commits: usize },
    /// Already contained the base.
    UpToDate,
    /// Uncommitted changes; left alone.
    SkippedDirty,
    /// The rebase conflicted and was aborted; the worktree is unchanged.
    FailedConflict,
    /// A git operation failed.
    Failed { message: String },
}

impl BatchOutcome {
    /// Whether this unit counts against the batch.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            BatchOutcome::FailedConflict | BatchOutcome::Failed { .. }
        )
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOutcome::Rebased { commits } => {
                write!(f, "✓ rebased ({})", output::plural(*commits, "commit"))
            }
            BatchOutcome::UpToDate => write!(f, "✓ up to date"),
            BatchOutcome::SkippedDirty => write!(f, "⊘ skipped (uncommitted changes)"),
            BatchOutcome::FailedConflict => write!(f, "✗ conflicts (rebase aborted)"),
            BatchOutcome::Failed { message } => write!(f, "✗ failed: {}", message),
        }
    }
}

/// One worktree and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub working_copy: WorkingCopyRef,
    pub outcome: BatchOutcome,
}

/// Every processed unit, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub units: Vec<UnitReport>,
}

impl BatchSummary {
    fn count(&self, pred: impl Fn(&BatchOutcome) -> bool) -> usize {
        self.units.iter().filter(|u| pred(&u.outcome)).count()
    }

    pub fn rebased(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::Rebased { .. }))
    }

    pub fn up_to_date(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::UpToDate))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::SkippedDirty))
    }

    pub fn failed(&self) -> usize {
        self.count(BatchOutcome::is_failure)
    }

    /// Outcome for the worktree at `path`, if it was processed.
    pub fn outcome_for(&self, path: &Path) -> Option<&BatchOutcome> {
        self.units
            .iter()
            .find(|u| u.working_copy.path == path)
            .map(|u| &u.outcome)
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.rebased() > 0 {
            parts.push(format!("{} rebased", self.rebased()));
        }
        if self.up_to_date() > 0 {
            parts.push(format!("{} up to date", self.up_to_date()));
        }
        if self.skipped() > 0 {
            parts.push(format!("{} skipped", self.skipped()));
        }
        if self.failed() > 0 {
            parts.push(format!("{} failed", self.failed()));
        }
        if parts.is_empty() {
            write!(f, "No feature worktrees to sync")
        } else {
            write!(f, "Summary: {}", parts.join(", "))
        }
    }
}

/// Runs the feature-branch rebase across all worktrees.
pub struct BatchRunner<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
    config: &'a Config,
    verbosity: Verbosity,
}

impl<'a, V: Vcs + ?Sized> BatchRunner<'a, V> {
    pub fn new(vcs: &'a V, config: &'a Config) -> Self {
        Self {
            vcs,
            config,
            verbosity: Verbosity::Normal,
        }
    }

    /// Set the output verbosity.
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Sync every feature worktree of the repository containing `from`.
    ///
    /// Only listing the worktrees can fail the whole batch. A worktree whose
    /// branch cannot be read is reported as failed like any other unit.
    pub fn run(&self, from: &Path) -> Result<BatchSummary, SyncError> {
        let worktrees = self.vcs.list_worktrees(from)?;
        let base_ref = self.config.base_ref();

        output::print(
            format!("Rebasing all worktrees onto {}...", base_ref),
            self.verbosity,
        );
        if let Err(e) = self.vcs.fetch(
            from,
            self.config.remote(),
            self.config.base_branch().as_str(),
        ) {
            tracing::debug!(error = %e, "batch fetch failed");
            output::warn(
                format!("fetch failed ({}); using last-known {}", e, base_ref),
                self.verbosity,
            );
        }

        let mut summary = BatchSummary::default();
        for path in worktrees {
            let (working_copy, outcome) = match self.vcs.current_branch(&path) {
                Ok(None) => {
                    tracing::debug!(path = %path.display(), "skipping detached worktree");
                    continue;
                }
                Ok(Some(branch)) if self.config.is_base_branch(&branch) => continue,
                Ok(Some(branch)) => {
                    let outcome = self.sync_unit(&path, &base_ref);
                    (WorkingCopyRef::new(path, Some(branch)), outcome)
                }
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "cannot read branch");
                    let outcome = BatchOutcome::Failed {
                        message: e.to_string(),
                    };
                    (WorkingCopyRef::new(path, None), outcome)
                }
            };

            output::print(
                format!("  {:<30} {}", working_copy.short_name(), outcome),
                self.verbosity,
            );
            summary.units.push(UnitReport {
                working_copy,
                outcome,
            });
        }

        output::print(format!("\n{}", summary), self.verbosity);
        Ok(summary)
    }

    fn sync_unit(&self, dir: &Path, base_ref: &str) -> BatchOutcome {
        match self.try_sync_unit(dir, base_ref) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "unit failed");
                BatchOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    fn try_sync_unit(&self, dir: &Path, base_ref: &str) -> Result<BatchOutcome, GitError> {
        if self.vcs.is_dirty(dir)? {
            return Ok(BatchOutcome::SkippedDirty);
        }

        let distance = self.vcs.ahead_behind(dir, base_ref)?;
        if distance.is_current() {
            return Ok(BatchOutcome::UpToDate);
        }

        match self.vcs.rebase(dir, base_ref, RunMode::Silent)? {
            RebaseOutcome::Completed => Ok(BatchOutcome::Rebased {
                commits: distance.behind,
            }),
            RebaseOutcome::Conflict => {
                self.vcs.rebase_abort(dir)?;
                Ok(BatchOutcome::FailedConflict)
            }
        }
    }
}
