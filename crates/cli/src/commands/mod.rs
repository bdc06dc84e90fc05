mod pair;
mod send;
mod sessions;
mod status;

use anyhow::{Result, bail};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::info;
use wc::PollHandle;

use crate::cli::{Cli, Commands};
use crate::context::CommandContext;

/// Runs the selected command and returns the JSON document to print.
pub async fn dispatch(cli: Cli) -> Result<Value> {
	let ctx = CommandContext::from_cli(&cli)?;

	match cli.command {
		Commands::Pair(args) => pair::run(&ctx, args).await,
		Commands::Send { request, wait } => send::run(&ctx, &request, wait).await,
		Commands::Status { transaction_id } => status::run(&ctx, &transaction_id).await,
		Commands::Sessions { action } => sessions::run(&ctx, action),
	}
}

/// Waits for a poller's callback; Ctrl-C cancels the poller.
async fn await_outcome<T>(handle: PollHandle, rx: oneshot::Receiver<wc::Result<T>>) -> Result<T> {
	tokio::select! {
		outcome = rx => match outcome {
			Ok(result) => Ok(result?),
			Err(_) => bail!("poller stopped without a result ({})", handle.state()),
		},
		_ = tokio::signal::ctrl_c() => {
			handle.cancel();
			let state = handle.wait().await;
			info!(target = "wc.cli", %state, "interrupted");
			bail!("interrupted while waiting for the wallet")
		}
	}
}
