//! core::ops
//!
//! Durable operation state and locking.
//!
//! # Modules
//!
//! - [`sync_state`] - Record of an in-flight or paused sync
//! - [`lock`] - Exclusive repository lock
//!
//! # Architecture
//!
//! Every mutating command:
//! 1. Acquires the exclusive repo lock
//! 2. Writes the sync state record before any network interaction
//! 3. Deletes the record on resolution, abort, or any non-conflict failure
//! 4. Leaves the record in place only when paused on a conflict

pub mod lock;
pub mod sync_state;

pub use lock::{LockError, RepoLock};
pub use sync_state::{StateError, SyncState, SyncStateStore};
