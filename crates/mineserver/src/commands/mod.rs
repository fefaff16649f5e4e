//! CLI command implementations

pub mod backup;
pub mod restore;

use anyhow::{Context, Result};
use mineserver_core::AppConfig;
use tokio_util::sync::CancellationToken;

use crate::cli::BackupCommands;
use crate::output;

/// Dispatch a `backup` subcommand
pub async fn run_backup(command: BackupCommands, config: &AppConfig) -> Result<()> {
    match command {
        BackupCommands::Save(args) => backup::save(args, config).await,
        BackupCommands::Restore(args) => restore::run(args, config).await,
        BackupCommands::Rollover(args) => backup::rollover(args, config).await,
        BackupCommands::List(args) => backup::list(args, config),
    }
}

/// Runs blocking work on the blocking pool and cancels it on Ctrl-C.
///
/// After an interrupt the work is still awaited so it can stop at its next
/// I/O boundary and report the cancellation.
pub(crate) async fn run_cancellable<T, F>(work: F) -> Result<T>
where
    F: FnOnce(CancellationToken) -> T + Send + 'static,
    T: Send + 'static,
{
    let token = CancellationToken::new();
    let worker_token = token.clone();
    let mut handle = tokio::task::spawn_blocking(move || work(worker_token));

    tokio::select! {
        joined = &mut handle => joined.context("Background task failed"),
        _ = tokio::signal::ctrl_c() => {
            output::warning("Interrupted, stopping at the next file boundary...");
            token.cancel();
            handle.await.context("Background task failed")
        }
    }
}
