use anyhow::{Context, Result};
use serde_json::{Value, json};
use tokio::sync::oneshot;

use crate::context::CommandContext;
use crate::output;

pub async fn run(ctx: &CommandContext, request: &str, wait: bool) -> Result<Value> {
	let request: Value = serde_json::from_str(request).context("request must be valid JSON")?;
	let relay = ctx.relay()?;

	let transaction_id = relay.submit(&request).await?;
	let submitted = json!({ "status": "submitted", "transactionId": transaction_id });
	if !wait {
		return Ok(submitted);
	}
	output::emit(&submitted)?;

	let (tx, rx) = oneshot::channel();
	let handle = relay.listen_transaction_status(
		&transaction_id,
		move |result| {
			let _ = tx.send(result);
		},
		ctx.config.poll_interval(),
		ctx.config.poll_timeout(),
	)?;
	let result = super::await_outcome(handle, rx).await?;

	Ok(json!({ "status": "answered", "transactionId": transaction_id, "result": result }))
}
