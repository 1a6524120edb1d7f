//! core::conflict
//!
//! Advisory conflict prediction before a rebase.
//!
//! A path is a conflict candidate when it changed on the remote side since
//! the merge base *and* changed locally since the merge base. Overlap does
//! not mean git will fail to merge the path, and no overlap does not
//! guarantee a clean rebase; the result only decides whether to warn.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use wtsync::core::conflict::predict;
//!
//! let remote: BTreeSet<String> = ["x", "y"].iter().map(|s| s.to_string()).collect();
//! let local: BTreeSet<String> = ["y", "z"].iter().map(|s| s.to_string()).collect();
//!
//! let overlap = predict(&remote, &local);
//! assert_eq!(overlap.paths().collect::<Vec<_>>(), vec!["y"]);
//! ```

use std::collections::BTreeSet;

/// Paths changed on both sides since divergence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictPrediction {
    candidates: BTreeSet<String>,
}

impl ConflictPrediction {
    /// True when no path changed on both sides.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Number of candidate paths.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Candidate paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(String::as_str)
    }

    /// Consume into the underlying set.
    pub fn into_set(self) -> BTreeSet<String> {
        self.candidates
    }
}

/// Intersect the remote-side and local-side change sets.
///
/// Pure: depends only on its two arguments.
pub fn predict(
    remote_changed: &BTreeSet<String>,
    local_changed: &BTreeSet<String>,
) -> ConflictPrediction {
    ConflictPrediction {
        candidates: remote_changed.intersection(local_changed).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn overlap_is_intersection() {
        let prediction = predict(&set(&["x", "y"]), &set(&["y", "z"]));
        assert_eq!(prediction.into_set(), set(&["y"]));
    }

    #[test]
    fn disjoint_sides_predict_nothing() {
        let prediction = predict(&set(&["src/a.rs"]), &set(&["src/b.rs"]));
        assert!(prediction.is_empty());
        assert_eq!(prediction.len(), 0);
    }

    #[test]
    fn empty_side_predicts_nothing() {
        assert!(predict(&set(&[]), &set(&["a"])).is_empty());
        assert!(predict(&set(&["a"]), &set(&[])).is_empty());
    }

    #[test]
    fn paths_are_sorted() {
        let prediction = predict(&set(&["b", "a", "c"]), &set(&["c", "a"]));
        assert_eq!(prediction.paths().collect::<Vec<_>>(), vec!["a", "c"]);
    }
}
