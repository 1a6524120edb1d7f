//! cli::args
//!
//! The `wt` command line, declared with clap derive. `--cwd`, `--debug`,
//! `--quiet` and the interactivity switches are global, so they may appear
//! before or after the subcommand.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// wt - one worktree per branch, kept current with the base branch
#[derive(Parser, Debug)]
#[command(name = "wt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if wt was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Log every step to stderr (overridden by WT_LOG)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Ask before rebasing even when stdin is not a terminal
    #[arg(
        long = "interactive",
        global = true,
        conflicts_with = "no_interactive"
    )]
    pub interactive_flag: bool,

    /// Never prompt; conflict warnings proceed, stashing on the base branch does not
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Whether prompts are shown. An explicit `--interactive` wins; quiet
    /// runs never prompt; otherwise prompt only on a terminal.
    pub fn interactive(&self) -> bool {
        match (self.interactive_flag, self.no_interactive || self.quiet) {
            (true, _) => true,
            (false, true) => false,
            (false, false) => std::io::stdin().is_terminal(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebase the current branch onto the base branch
    #[command(
        name = "sync",
        visible_alias = "rebase",
        long_about = "Bring the current worktree up to date with the base branch.\n\n\
            On a feature branch, uncommitted changes are stashed, the base branch is \
            fetched from the remote, and the branch is rebased onto it. If the rebase \
            stops on a conflict, the sync pauses: resolve the files, then run \
            `wt sync --continue`, or give up with `wt sync --abort`. Your stashed \
            changes come back either way.\n\n\
            On the base branch itself, sync fetches and fast-forwards. It never \
            rewrites the base branch; if local history has diverged it stops.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Catch up with the base branch (most common usage)
    wt sync

    # After a conflict: fix the files, stage them, then
    git add -A
    wt sync --continue

    # Give up on a paused sync and restore your changes
    wt sync --abort

    # Rebase every clean feature worktree in one pass
    wt sync --all

COMMON SCENARIOS:
    Teammate merged to main while you were working:
        wt sync                # stash, fetch, rebase, restore
        wt submit              # push the rebased branch

    Many worktrees open at once:
        wt sync -a             # dirty worktrees are skipped, not touched"
    )]
    Sync {
        /// Resume a sync paused on conflicts
        #[arg(long = "continue", conflicts_with_all = ["abort", "all"])]
        continue_: bool,

        /// Abandon a paused sync and restore stashed changes
        #[arg(long, conflicts_with = "all")]
        abort: bool,

        /// Sync every feature worktree of this repository
        #[arg(short, long)]
        all: bool,
    },

    /// Sync the current branch, then push it
    #[command(
        name = "submit",
        long_about = "Sync the current feature branch and push it to the remote.\n\n\
            Runs the same steps as `wt sync`. When the branch is current with the \
            base branch afterwards, it is pushed: with --force-with-lease if it \
            already tracks a same-named remote branch, otherwise with upstream \
            tracking set. A paused or cancelled sync pushes nothing.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Publish your branch, up to date with main
    wt submit

    # Conflict during submit: resolve, then resume and push
    git add -A
    wt submit --continue"
    )]
    Submit {
        /// Resume a paused sync, then push
        #[arg(long = "continue", conflicts_with = "abort")]
        continue_: bool,

        /// Abandon a paused sync without pushing
        #[arg(long)]
        abort: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sync_flags() {
        let cli = Cli::try_parse_from(["wt", "sync", "--continue"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Sync {
                continue_: true,
                abort: false,
                all: false
            }
        ));
    }

    #[test]
    fn rebase_is_an_alias() {
        let cli = Cli::try_parse_from(["wt", "rebase", "-a"]).unwrap();
        assert!(matches!(cli.command, Command::Sync { all: true, .. }));
    }

    #[test]
    fn continue_and_abort_conflict() {
        assert!(Cli::try_parse_from(["wt", "sync", "--continue", "--abort"]).is_err());
        assert!(Cli::try_parse_from(["wt", "sync", "--all", "--abort"]).is_err());
        assert!(Cli::try_parse_from(["wt", "submit", "--continue", "--abort"]).is_err());
    }

    #[test]
    fn quiet_implies_non_interactive() {
        let cli = Cli::try_parse_from(["wt", "-q", "sync"]).unwrap();
        assert!(!cli.interactive());

        let cli = Cli::try_parse_from(["wt", "--interactive", "-q", "sync"]).unwrap();
        assert!(cli.interactive());

        let cli = Cli::try_parse_from(["wt", "sync", "--no-interactive"]).unwrap();
        assert!(!cli.interactive());
    }

    #[test]
    fn interactive_flags_conflict() {
        assert!(
            Cli::try_parse_from(["wt", "--interactive", "--no-interactive", "sync"]).is_err()
        );
    }
}
