use std::time::Duration;

use anyhow::Result;
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tracing::{info, warn};
use wc::{Pairing, PairingOutcome, SessionManager, TerminalQrRenderer, now_ms};

use crate::cli::PairArgs;
use crate::context::CommandContext;
use crate::output::{self, SessionSummary};

pub async fn run(ctx: &CommandContext, args: PairArgs) -> Result<Value> {
	let mut options = ctx.config.session_options();
	if let Some(ttl) = args.ttl_secs {
		options = options.with_session_ttl(Duration::from_secs(ttl));
	}
	let mut manager = SessionManager::new(options, ctx.capabilities()?, ctx.store.clone());

	let outcome = match manager.resume().await? {
		Pairing::Resumed(session) => {
			return Ok(json!({
				"status": "resumed",
				"session": SessionSummary::new(&session, now_ms()),
			}));
		}
		Pairing::Negotiated(outcome) => outcome,
	};

	if !manager.persist()? {
		warn!(target = "wc.cli", "session registry not initialized; run `wc sessions init` to keep sessions");
	}
	if !args.no_qr {
		print_qr(&outcome);
	}

	let pending = json!({
		"status": "pending",
		"sessionId": outcome.session.session_id,
		"payload": outcome.payload,
	});
	if !args.wait {
		return Ok(pending);
	}
	output::emit(&pending)?;

	let (tx, rx) = oneshot::channel();
	let handle = manager.listen_session_status(
		move |result| {
			let _ = tx.send(result);
		},
		ctx.config.poll_interval(),
		ctx.config.poll_timeout(),
	)?;
	let status = super::await_outcome(handle, rx).await?;
	let accounts = manager.record_approval(&status)?;
	info!(target = "wc.cli", session_id = %outcome.session.session_id, accounts = accounts.len(), "wallet responded");

	let status = if accounts.is_empty() { "rejected" } else { "approved" };
	Ok(json!({
		"status": status,
		"sessionId": outcome.session.session_id,
		"accounts": accounts,
	}))
}

fn print_qr(outcome: &PairingOutcome) {
	match TerminalQrRenderer::lines(&outcome.payload) {
		Ok(lines) => {
			eprintln!();
			for line in lines {
				eprintln!("  {line}");
			}
			eprintln!();
		}
		Err(err) => warn!(target = "wc.cli", error = %err, "failed to render pairing QR code"),
	}
}
