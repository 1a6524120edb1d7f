//! Shared fixtures for integration tests.
//!
//! A [`Sandbox`] is a bare `origin`, a main clone on `main`, and a teammate
//! clone used to move `origin/main` forward.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

pub struct Sandbox {
    root: TempDir,
    pub origin: PathBuf,
    pub main: PathBuf,
    pub teammate: PathBuf,
}

impl Sandbox {
    /// Create the three repositories with one shared commit on `main`.
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        let origin = root.path().join("origin.git");
        let main = root.path().join("app");
        let teammate = root.path().join("teammate");

        run_git(root.path(), &["init", "--bare", "-b", "main", "origin.git"]);

        run_git(root.path(), &["init", "-b", "main", "app"]);
        configure(&main);
        std::fs::write(main.join("README.md"), "# App\n").unwrap();
        run_git(&main, &["add", "README.md"]);
        run_git(&main, &["commit", "-m", "Initial commit"]);
        run_git(&main, &["remote", "add", "origin", origin.to_str().unwrap()]);
        run_git(&main, &["push", "-u", "origin", "main"]);

        run_git(
            root.path(),
            &["clone", origin.to_str().unwrap(), "teammate"],
        );
        configure(&teammate);

        Self {
            root,
            origin,
            main,
            teammate,
        }
    }

    /// Directory for a sibling of the main clone.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// Add a linked worktree at `<root>/<name>` on a new branch from `main`.
    pub fn add_worktree(&self, name: &str, branch: &str) -> PathBuf {
        let path = self.path(name);
        run_git(
            &self.main,
            &["worktree", "add", "-b", branch, path.to_str().unwrap(), "main"],
        );
        path
    }

    /// Push `count` commits to `origin/main` from the teammate clone.
    pub fn advance_origin(&self, count: usize) {
        run_git(&self.teammate, &["pull", "--ff-only", "origin", "main"]);
        for i in 0..count {
            commit_file(
                &self.teammate,
                &format!("upstream-{}.txt", i),
                &format!("upstream {}\n", i),
                &format!("Upstream change {}", i),
            );
        }
        run_git(&self.teammate, &["push", "origin", "main"]);
    }

    /// Push one commit touching `path` to `origin/main`.
    pub fn push_upstream_change(&self, path: &str, content: &str) {
        run_git(&self.teammate, &["pull", "--ff-only", "origin", "main"]);
        commit_file(&self.teammate, path, content, &format!("Upstream edit of {}", path));
        run_git(&self.teammate, &["push", "origin", "main"]);
    }
}

/// Identity and editors so git never blocks on input.
fn configure(dir: &Path) {
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test User"]);
    run_git(dir, &["config", "core.editor", "true"]);
    run_git(dir, &["config", "sequence.editor", "true"]);
}

/// Write a file and commit it.
pub fn commit_file(dir: &Path, path: &str, content: &str, message: &str) {
    std::fs::write(dir.join(path), content).unwrap();
    run_git(dir, &["add", path]);
    run_git(dir, &["commit", "-m", message]);
}

/// Resolve `rev` in `dir`.
pub fn rev_parse(dir: &Path, rev: &str) -> String {
    git_stdout(dir, &["rev-parse", rev])
}

/// Number of entries in `git stash list`.
pub fn stash_count(dir: &Path) -> usize {
    git_stdout(dir, &["stash", "list"]).lines().count()
}

/// Run a git command and return trimmed stdout.
pub fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// Run a git command in the given directory.
pub fn run_git(dir: &Path, args: &[&str]) {
    git_stdout(dir, args);
}
