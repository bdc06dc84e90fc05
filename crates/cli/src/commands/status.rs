use anyhow::Result;
use serde_json::{Value, json};

use crate::context::CommandContext;

pub async fn run(ctx: &CommandContext, transaction_id: &str) -> Result<Value> {
	let relay = ctx.relay()?;

	Ok(match relay.fetch_status(transaction_id).await? {
		Some(result) => json!({ "status": "answered", "transactionId": transaction_id, "result": result }),
		None => json!({ "status": "pending", "transactionId": transaction_id }),
	})
}
