//! engine::publish
//!
//! Push a freshly synced feature branch.
//!
//! When the branch already tracks `<remote>/<branch>` the push uses
//! `--force-with-lease`, since a rebase rewrote it. Otherwise the branch is
//! pushed to a same-named remote branch and set as upstream. Push failures
//! are returned as-is; nothing is retried.

use std::path::Path;

use super::SyncError;
use crate::core::config::Config;
use crate::git::Vcs;
use crate::ui::output::{self, Verbosity};

/// How the branch was pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushKind {
    /// Over an existing upstream, with a lease.
    ForceWithLease,
    /// First push (or upstream pointed elsewhere); upstream now set.
    SetUpstream,
}

/// Push the branch checked out in `dir` to the configured remote.
pub fn publish<V: Vcs + ?Sized>(
    vcs: &V,
    config: &Config,
    dir: &Path,
    verbosity: Verbosity,
) -> Result<PushKind, SyncError> {
    let branch = vcs.current_branch(dir)?.ok_or(SyncError::DetachedHead)?;
    if config.is_base_branch(&branch) {
        return Err(SyncError::SubmitBaseBranch(branch.to_string()));
    }

    let expected = branch.on_remote(config.remote());
    let upstream = vcs.upstream(dir)?;
    tracing::debug!(%branch, ?upstream, %expected, "publishing");

    let kind = if upstream.as_deref() == Some(expected.as_str()) {
        output::print(format!("Pushing {} (force-with-lease)...", branch), verbosity);
        vcs.push_force_with_lease(dir, verbosity.run_mode())
            .map_err(SyncError::Push)?;
        PushKind::ForceWithLease
    } else {
        if let Some(other) = &upstream {
            output::warn(
                format!("{} tracks {}; pushing to {} instead", branch, other, expected),
                verbosity,
            );
        }
        output::print(format!("Pushing {} to {}...", branch, expected), verbosity);
        vcs.push_set_upstream(dir, config.remote(), verbosity.run_mode())
            .map_err(SyncError::Push)?;
        PushKind::SetUpstream
    };

    output::success(format!("Submitted {}", branch), verbosity);
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BranchName;
    use crate::git::mock::{FailOn, MockCopy, MockOperation, MockVcs};

    const DIR: &str = "/src/app";

    fn config() -> Config {
        Config::new(BranchName::new("main").unwrap(), "origin")
    }

    #[test]
    fn tracked_branch_is_force_pushed_with_lease() {
        let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature").tracking("origin/feature"));
        let kind = publish(&vcs, &config(), Path::new(DIR), Verbosity::Quiet).unwrap();
        assert_eq!(kind, PushKind::ForceWithLease);
        assert_eq!(
            vcs.operations(),
            vec![MockOperation::PushForceWithLease { dir: DIR.into() }]
        );
    }

    #[test]
    fn untracked_branch_sets_upstream() {
        let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature"));
        let kind = publish(&vcs, &config(), Path::new(DIR), Verbosity::Quiet).unwrap();
        assert_eq!(kind, PushKind::SetUpstream);
        assert_eq!(
            vcs.upstream(Path::new(DIR)).unwrap().as_deref(),
            Some("origin/feature")
        );
    }

    #[test]
    fn mismatched_upstream_is_repointed() {
        let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("feature").tracking("origin/main"));
        let kind = publish(&vcs, &config(), Path::new(DIR), Verbosity::Quiet).unwrap();
        assert_eq!(kind, PushKind::SetUpstream);
    }

    #[test]
    fn base_branch_is_refused() {
        let vcs = MockVcs::new().with_copy(DIR, MockCopy::on_branch("main"));
        let err = publish(&vcs, &config(), Path::new(DIR), Verbosity::Quiet).unwrap_err();
        assert!(matches!(err, SyncError::SubmitBaseBranch(_)));
        assert!(vcs.operations().is_empty());
    }

    #[test]
    fn push_failure_is_fatal() {
        let vcs = MockVcs::new()
            .with_copy(DIR, MockCopy::on_branch("feature"))
            .fail_on(FailOn::Push);
        let err = publish(&vcs, &config(), Path::new(DIR), Verbosity::Quiet).unwrap_err();
        assert!(matches!(err, SyncError::Push(_)));
        assert_eq!(vcs.operations().len(), 1);
    }
}
