//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the only doorway to Git. Reads go through git2
//! ([`Git`]); mutations (stash, fetch, rebase, merge, push) shell out to the
//! `git` executable through [`GitVcs`] so the user's hooks and rebase
//! configuration apply exactly as they would at the prompt. No other module
//! imports `git2` or spawns `git`.
//!
//! The engine only sees the [`Vcs`] trait, which [`mock::MockVcs`] also
//! implements for deterministic tests.
//!
//! # Example
//!
//! ```ignore
//! use wtsync::git::{GitVcs, Vcs};
//! use std::path::Path;
//!
//! let vcs = GitVcs::new();
//! let dir = Path::new(".");
//! vcs.fetch(dir, "origin", "main")?;
//! println!("{} behind", vcs.ahead_behind(dir, "origin/main")?.behind);
//! ```

mod interface;
pub mod mock;
mod vcs;

pub use interface::{Git, GitError, GitState, RepoInfo, WorktreeStatus};
pub use vcs::{FastForward, GitVcs, RebaseOutcome, RunMode, Vcs};
