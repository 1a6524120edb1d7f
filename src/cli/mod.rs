//! cli
//!
//! The `wt` front end: flags in, log subscriber up, one command out.
//!
//! Nothing here touches a repository; commands hand the work to
//! [`crate::engine`] once they hold the repository lock.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::engine;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "WT_LOG";

pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let ctx = engine::Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
        interactive: cli.interactive(),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Log to stderr. `WT_LOG` wins over `--debug`.
fn init_logging(debug: bool) {
    let fallback = if debug { "wtsync=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    // A subscriber may already be set when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
