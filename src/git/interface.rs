//! git::interface
//!
//! Read-side Git access using git2.
//!
//! `Git` answers questions about one worktree: the checked-out branch,
//! dirtiness, a paused rebase, distance from a remote-tracking ref, paths
//! changed since the merge base, and the list of worktrees. It never writes.
//! Mutations go through the `git` CLI in [`super::vcs::GitVcs`] so the
//! user's hooks and rebase configuration apply.
//!
//! ```ignore
//! use wtsync::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let ab = git.ahead_behind("origin/main")?;
//! println!("{} behind", ab.behind);
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{AheadBehind, BranchName, TypeError};

/// Failure reading or changing a repository.
///
/// `Clone` so test doubles can hand out the same injected failure repeatedly.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GitError {
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// Nothing to sync without a checkout.
    #[error("bare repository not supported")]
    BareRepo,

    #[error("no such ref: {name}")]
    MissingRef { name: String },

    /// A `git` subprocess failed.
    #[error("{command}: {message}")]
    CommandFailed {
        /// The command line, e.g. `git fetch origin main`
        command: String,
        /// Trimmed stderr, or the exit status when output was not captured
        message: String,
    },

    #[error(transparent)]
    BadBranchName(#[from] TypeError),

    #[error("git error: {0}")]
    Libgit2(String),
}

impl GitError {
    /// `NotFound` becomes [`GitError::MissingRef`] named by `what`.
    fn from_git2(err: git2::Error, what: &str) -> Self {
        if err.code() == git2::ErrorCode::NotFound {
            return GitError::MissingRef {
                name: what.to_owned(),
            };
        }
        GitError::Libgit2(format!("{what}: {}", err.message()))
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Libgit2(err.message().to_owned())
    }
}

/// Where a worktree keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// `.git`, or `.git/worktrees/<name>` for a linked worktree
    pub git_dir: PathBuf,
    /// `.git` of the main worktree, shared by all of them
    pub common_dir: PathBuf,
    /// Root of this worktree's checkout
    pub work_dir: PathBuf,
}

/// What the repository is in the middle of, per `git2::RepositoryState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitState {
    Clean,
    /// `rebase-merge/` or `rebase-apply/` is present.
    Rebase,
    Merge,
    /// Cherry-pick, revert, bisect or `git am`.
    Other(&'static str),
}

impl GitState {
    /// ```
    /// use wtsync::git::GitState;
    ///
    /// assert!(GitState::Merge.is_in_progress());
    /// assert!(!GitState::Clean.is_in_progress());
    /// ```
    pub fn is_in_progress(self) -> bool {
        self != GitState::Clean
    }

    pub fn is_rebase(self) -> bool {
        self == GitState::Rebase
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            GitState::Clean => "clean",
            GitState::Rebase => "rebase",
            GitState::Merge => "merge",
            GitState::Other(what) => what,
        })
    }
}

/// Counts of changed entries in one worktree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Entries with changes in the index.
    pub staged: usize,
    /// Tracked files changed in the working tree only.
    pub unstaged: usize,
    pub untracked: usize,
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// True when a stash would have something to save.
    ///
    /// Untracked files count: `git stash push -u` takes them too.
    pub fn is_dirty(&self) -> bool {
        self.staged > 0 || self.unstaged > 0 || self.untracked > 0 || self.has_conflicts
    }

    fn record(&mut self, status: git2::Status) {
        let staged = git2::Status::INDEX_NEW
            | git2::Status::INDEX_MODIFIED
            | git2::Status::INDEX_DELETED
            | git2::Status::INDEX_RENAMED
            | git2::Status::INDEX_TYPECHANGE;
        let unstaged = git2::Status::WT_MODIFIED
            | git2::Status::WT_DELETED
            | git2::Status::WT_RENAMED
            | git2::Status::WT_TYPECHANGE;

        self.has_conflicts |= status.contains(git2::Status::CONFLICTED);
        self.staged += usize::from(status.intersects(staged));
        self.unstaged += usize::from(status.intersects(unstaged));
        self.untracked += usize::from(status.contains(git2::Status::WT_NEW));
    }
}

/// Read-only view of one worktree.
pub struct Git {
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    /// Discover the worktree containing `path`, which may be any
    /// directory below its root.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        match git2::Repository::discover(path) {
            Ok(repo) if repo.is_bare() => Err(GitError::BareRepo),
            Ok(repo) => Ok(Self { repo }),
            Err(_) => Err(GitError::NotARepo {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn info(&self) -> Result<RepoInfo, GitError> {
        Ok(RepoInfo {
            git_dir: self.repo.path().to_path_buf(),
            common_dir: self.repo.commondir().to_path_buf(),
            work_dir: self.work_dir()?.to_path_buf(),
        })
    }

    fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    /// Root of the main worktree, whichever worktree this was opened from.
    pub fn main_worktree(&self) -> Result<PathBuf, GitError> {
        if !self.repo.is_worktree() {
            return Ok(self.work_dir()?.to_path_buf());
        }
        let main = git2::Repository::open(self.repo.commondir())
            .map_err(|e| GitError::from_git2(e, "main worktree"))?;
        main.workdir()
            .map(Path::to_path_buf)
            .ok_or(GitError::BareRepo)
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Which multi-step operation, if any, this worktree is paused in.
    pub fn state(&self) -> GitState {
        use git2::RepositoryState as S;

        match self.repo.state() {
            S::Clean => GitState::Clean,
            S::Rebase | S::RebaseInteractive | S::RebaseMerge | S::ApplyMailboxOrRebase => {
                GitState::Rebase
            }
            S::Merge => GitState::Merge,
            S::CherryPick | S::CherryPickSequence => GitState::Other("cherry-pick"),
            S::Revert | S::RevertSequence => GitState::Other("revert"),
            S::Bisect => GitState::Other("bisect"),
            S::ApplyMailbox => GitState::Other("am"),
        }
    }

    /// Changed-entry counts, untracked files included, ignored files not.
    pub fn worktree_status(&self) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(false)
            .include_ignored(false);

        let entries = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "status"))?;

        let mut status = WorktreeStatus::default();
        for entry in entries.iter() {
            status.record(entry.status());
        }
        Ok(status)
    }

    // =========================================================================
    // Branches and Refs
    // =========================================================================

    /// The checked-out branch. `None` for a detached HEAD (a paused rebase
    /// detaches it too) or an unborn one.
    pub fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        };
        match head.shorthand() {
            Some(name) if head.is_branch() => Ok(Some(BranchName::new(name)?)),
            _ => Ok(None),
        }
    }

    /// Upstream of the current branch as `<remote>/<branch>`, if configured.
    pub fn upstream(&self) -> Result<Option<String>, GitError> {
        let Some(branch) = self.current_branch()? else {
            return Ok(None);
        };
        let local = format!("refs/heads/{}", branch);
        match self.repo.branch_upstream_name(&local) {
            Ok(buf) => Ok(buf
                .as_str()
                .map(|name| name.trim_start_matches("refs/remotes/").to_string())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, &local)),
        }
    }

    fn resolve_commit(&self, spec: &str) -> Result<git2::Oid, GitError> {
        let object = self
            .repo
            .revparse_single(spec)
            .map_err(|e| GitError::from_git2(e, spec))?;
        let commit = object
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, spec))?;
        Ok(commit.id())
    }

    // =========================================================================
    // Ancestry
    // =========================================================================

    /// Count commits HEAD has that `onto` lacks (ahead) and vice versa (behind).
    pub fn ahead_behind(&self, onto: &str) -> Result<AheadBehind, GitError> {
        let head = self.resolve_commit("HEAD")?;
        let target = self.resolve_commit(onto)?;
        let (ahead, behind) = self
            .repo
            .graph_ahead_behind(head, target)
            .map_err(|e| GitError::from_git2(e, onto))?;
        Ok(AheadBehind { ahead, behind })
    }

    /// Whether HEAD can be fast-forwarded to `onto` (HEAD is an ancestor of it).
    pub fn can_fast_forward(&self, onto: &str) -> Result<bool, GitError> {
        let head = self.resolve_commit("HEAD")?;
        let target = self.resolve_commit(onto)?;
        if head == target {
            return Ok(true);
        }
        self.repo
            .graph_descendant_of(target, head)
            .map_err(|e| GitError::from_git2(e, onto))
    }

    /// Paths changed on `to` since it diverged from `from`.
    ///
    /// Equivalent to `git diff --name-only <from>...<to>`. Renames contribute
    /// both the old and the new path.
    pub fn changed_since_fork(&self, from: &str, to: &str) -> Result<BTreeSet<String>, GitError> {
        let from_oid = self.resolve_commit(from)?;
        let to_oid = self.resolve_commit(to)?;
        let base = self
            .repo
            .merge_base(from_oid, to_oid)
            .map_err(|e| GitError::from_git2(e, "merge-base"))?;

        let base_tree = self.repo.find_commit(base)?.tree()?;
        let to_tree = self.repo.find_commit(to_oid)?.tree()?;
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&base_tree), Some(&to_tree), None)?;

        let mut paths = BTreeSet::new();
        for delta in diff.deltas() {
            for file in [delta.old_file(), delta.new_file()] {
                if let Some(path) = file.path() {
                    paths.insert(path.to_string_lossy().into_owned());
                }
            }
        }
        Ok(paths)
    }

    // =========================================================================
    // Worktrees
    // =========================================================================

    /// All worktrees of this repository: the main one first, then linked ones
    /// sorted by name. Linked worktrees whose directory is gone are skipped.
    pub fn worktrees(&self) -> Result<Vec<PathBuf>, GitError> {
        let mut result = vec![self.main_worktree()?];

        let names = self.repo.worktrees()?;
        let mut names: Vec<&str> = names.iter().flatten().collect();
        names.sort_unstable();

        for name in names {
            let worktree = self
                .repo
                .find_worktree(name)
                .map_err(|e| GitError::from_git2(e, name))?;
            if worktree.validate().is_err() {
                tracing::debug!(worktree = name, "skipping prunable worktree");
                continue;
            }
            result.push(worktree.path().to_path_buf());
        }

        Ok(result)
    }
}
