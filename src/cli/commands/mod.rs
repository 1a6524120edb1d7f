//! cli::commands
//!
//! One handler per subcommand. A handler opens a [`Session`] (which takes
//! the repository lock), runs the engine and prints what happened. The
//! repository is only changed by the engine.

mod submit;
mod sync;

pub use submit::submit;
pub use sync::sync;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::args::Command;
use crate::core::config::Config;
use crate::core::ops::{RepoLock, SyncStateStore};
use crate::core::paths::WtPaths;
use crate::engine::Context;
use crate::git::Git;

pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Sync {
            continue_,
            abort,
            all,
        } => sync(ctx, continue_, abort, all),
        Command::Submit { continue_, abort } => submit(ctx, continue_, abort),
    }
}

/// Everything a mutating command needs, resolved from the working directory.
///
/// The repository lock is held until the session is dropped.
pub(crate) struct Session {
    /// Root of the worktree the command runs in.
    pub workdir: PathBuf,
    pub config: Config,
    pub store: SyncStateStore,
    _lock: RepoLock,
}

impl Session {
    pub fn open(ctx: &Context) -> Result<Self> {
        let cwd = match &ctx.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir().context("cannot read the current directory")?,
        };

        let git = Git::open(&cwd)?;
        let info = git.info()?;
        let paths = WtPaths::from_repo_info(&info);
        let main_worktree = git.main_worktree()?;

        let config = Config::load(&main_worktree)?;
        let lock = RepoLock::acquire(&paths)?;

        Ok(Self {
            workdir: info.work_dir,
            config,
            store: SyncStateStore::new(&paths),
            _lock: lock,
        })
    }
}
