//! engine::modes
//!
//! Which part of the sync lifecycle an invocation asks for.
//!
//! # Example
//!
//! ```
//! use wtsync::engine::modes::SyncMode;
//!
//! assert_eq!(SyncMode::from_flags(false, false).unwrap(), SyncMode::Start);
//! assert_eq!(SyncMode::from_flags(true, false).unwrap(), SyncMode::Continue);
//! assert!(SyncMode::from_flags(true, true).is_err());
//! ```

use thiserror::Error;

/// Errors from mode resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModeError {
    /// Both `--continue` and `--abort` were given.
    #[error("--continue and --abort cannot be used together")]
    ConflictingFlags,
}

/// Sync mode selected by flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Start a new sync of the current branch.
    #[default]
    Start,
    /// Resume a paused sync after conflicts were resolved.
    Continue,
    /// Abandon a paused sync and restore the pre-sync state.
    Abort,
}

impl SyncMode {
    /// Resolve mode from `--continue` / `--abort`.
    pub fn from_flags(continue_: bool, abort: bool) -> Result<Self, ModeError> {
        match (continue_, abort) {
            (true, true) => Err(ModeError::ConflictingFlags),
            (true, false) => Ok(Self::Continue),
            (false, true) => Ok(Self::Abort),
            (false, false) => Ok(Self::Start),
        }
    }

    /// Whether this mode resumes previously persisted state.
    pub fn resumes(self) -> bool {
        !matches!(self, Self::Start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_flag_combinations() {
        assert_eq!(SyncMode::from_flags(false, false), Ok(SyncMode::Start));
        assert_eq!(SyncMode::from_flags(true, false), Ok(SyncMode::Continue));
        assert_eq!(SyncMode::from_flags(false, true), Ok(SyncMode::Abort));
        assert_eq!(
            SyncMode::from_flags(true, true),
            Err(ModeError::ConflictingFlags)
        );
    }

    #[test]
    fn only_start_is_fresh() {
        assert!(!SyncMode::Start.resumes());
        assert!(SyncMode::Continue.resumes());
        assert!(SyncMode::Abort.resumes());
    }
}
