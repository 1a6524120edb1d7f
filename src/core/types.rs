//! core::types
//!
//! Validated names and small value types shared by the git layer and the
//! engine.
//!
//! ```
//! use wtsync::core::types::BranchName;
//!
//! let branch = BranchName::new("alice/login-form").unwrap();
//! assert_eq!(branch.as_str(), "alice/login-form");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),
}

/// A branch name that `git check-ref-format --branch` would accept.
///
/// Rejected: the empty name, `@`, a leading `-`, a trailing `/`, any of
/// `..` `@{` `//`, a space or ASCII control character, any of `~^:\?*[`,
/// and components starting with `.` or ending in `.lock`. Other Unicode,
/// non-ASCII whitespace included, is left to git.
///
/// ```
/// use wtsync::core::types::BranchName;
///
/// assert!(BranchName::new("feature/search").is_ok());
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        match refname_problem(&name) {
            Some(why) => Err(TypeError::InvalidBranchName(format!("'{name}': {why}"))),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The remote-tracking ref for this branch, e.g. `origin/main`.
    pub fn on_remote(&self, remote: &str) -> String {
        format!("{}/{}", remote, self.0)
    }
}

fn refname_problem(name: &str) -> Option<String> {
    match name {
        "" => return Some("cannot be empty".into()),
        "@" => return Some("'@' is reserved".into()),
        _ if name.starts_with('-') => return Some("cannot start with '-'".into()),
        _ if name.ends_with('/') => return Some("cannot end with '/'".into()),
        _ => {}
    }
    if let Some(seq) = ["..", "@{", "//"].into_iter().find(|seq| name.contains(seq)) {
        return Some(format!("cannot contain '{seq}'"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| c.is_ascii_control() || " ~^:\\?*[".contains(*c))
    {
        return Some(format!("cannot contain {c:?}"));
    }
    name.split('/').find_map(|part| {
        if part.starts_with('.') {
            Some(format!("'{part}' starts with '.'"))
        } else if part.ends_with(".lock") {
            Some(format!("'{part}' ends with '.lock'"))
        } else {
            None
        }
    })
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for BranchName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How far HEAD is ahead of and behind a remote-tracking ref.
///
/// Always recomputed; the remote can move between invocations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AheadBehind {
    /// Commits on HEAD that the ref does not have.
    pub ahead: usize,
    /// Commits on the ref that HEAD does not have.
    pub behind: usize,
}

impl AheadBehind {
    /// True when there is nothing to pull in.
    pub fn is_current(&self) -> bool {
        self.behind == 0
    }
}

/// One working copy (worktree) of the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopyRef {
    /// Absolute path of the worktree's root directory.
    pub path: PathBuf,
    /// Branch checked out there; `None` when HEAD is detached.
    pub branch: Option<BranchName>,
}

impl WorkingCopyRef {
    pub fn new(path: PathBuf, branch: Option<BranchName>) -> Self {
        Self { path, branch }
    }

    /// Short display name: the final path component.
    pub fn short_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
