//! core
//!
//! Core domain types, persisted state, and configuration for wt.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, AheadBehind, WorkingCopyRef
//! - [`conflict`] - Advisory conflict prediction
//! - [`ops`] - Sync state record and repository locking
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for wt storage
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Nothing here talks to git; the engine composes these with [`crate::git`]

pub mod config;
pub mod conflict;
pub mod ops;
pub mod paths;
pub mod types;
