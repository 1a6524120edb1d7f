//! ui::output
//!
//! Lines for the person at the terminal.
//!
//! Progress and results go to stdout, warnings and errors to stderr. Only
//! errors survive `--quiet`. Developer diagnostics use `tracing` instead.

use std::fmt::Display;

use crate::git::RunMode;

/// How much the user wants to hear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// `-q`: errors only, git captured.
    Quiet,
    #[default]
    Normal,
    /// `--debug`: normal output plus `tracing` diagnostics on stderr.
    Debug,
}

impl Verbosity {
    /// `--quiet` wins over `--debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        match (quiet, debug) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Debug,
            (false, false) => Verbosity::Normal,
        }
    }

    /// How git subprocesses should treat the terminal at this verbosity.
    pub fn run_mode(self) -> RunMode {
        match self {
            Verbosity::Quiet => RunMode::Silent,
            Verbosity::Normal | Verbosity::Debug => RunMode::Passthrough,
        }
    }

    fn speaks(self) -> bool {
        self != Verbosity::Quiet
    }
}

pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity.speaks() {
        println!("{}", message);
    }
}

/// Always shown, on stderr.
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity.speaks() {
        eprintln!("warning: {}", message);
    }
}

/// A finished step, marked with a check.
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity.speaks() {
        println!("✓ {}", message);
    }
}

/// One prefixed line per item.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    prefixed(items.iter().map(ToString::to_string), prefix)
}

/// Indent every line of a block, e.g. `git status --short` output.
pub fn indent(block: &str, prefix: &str) -> String {
    prefixed(block.lines().map(str::to_string), prefix)
}

fn prefixed(lines: impl Iterator<Item = String>, prefix: &str) -> String {
    lines
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// "1 commit", "3 commits".
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn quiet_silences_git() {
        assert_eq!(Verbosity::Quiet.run_mode(), RunMode::Silent);
        assert_eq!(Verbosity::Normal.run_mode(), RunMode::Passthrough);
    }

    #[test]
    fn list_and_indent() {
        assert_eq!(format_list(&["a", "b"], "  - "), "  - a\n  - b");
        assert_eq!(indent(" M a\n?? b", "    "), "     M a\n    ?? b");
    }

    #[test]
    fn pluralization() {
        assert_eq!(plural(1, "commit"), "1 commit");
        assert_eq!(plural(0, "commit"), "0 commits");
        assert_eq!(plural(3, "file"), "3 files");
    }
}
