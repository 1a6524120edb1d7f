//! wt - one worktree per branch, kept current with a shared base branch
//!
//! Each feature branch lives in its own git worktree. `wt sync` brings the
//! current worktree up to date with the base branch; `wt sync --all` does the
//! same for every worktree; `wt submit` syncs and pushes. A sync that stops
//! on a rebase conflict survives process exit and is resumed with
//! `--continue` or undone with `--abort`.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Sync state machine, its driver, batch mode and publishing
//! - [`core`] - Domain types, configuration, durable sync record and lock
//! - [`git`] - Repository reads (git2) and mutations (git CLI) behind one trait
//! - [`ui`] - Output and prompts
//!
//! # Correctness Invariants
//!
//! 1. The sync record is on disk before any network I/O
//! 2. A stash pushed by a sync is popped exactly once
//! 3. The base branch only ever moves by fast-forward
//! 4. One `wt` process mutates a repository at a time

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod ui;
