use anyhow::Result;
use serde_json::{Value, json};
use wc::now_ms;

use crate::cli::SessionsAction;
use crate::context::CommandContext;
use crate::output::SessionSummary;

pub fn run(ctx: &CommandContext, action: SessionsAction) -> Result<Value> {
	let store = &ctx.store;

	match action {
		SessionsAction::Init => {
			let created = store.init()?;
			Ok(json!({ "initialized": true, "created": created }))
		}
		SessionsAction::List => {
			let now = now_ms();
			let sessions: Vec<SessionSummary> = store.list_all()?.iter().map(|s| SessionSummary::new(s, now)).collect();
			let initialized = store.is_initialized()?;
			Ok(json!({ "initialized": initialized, "sessions": sessions }))
		}
		SessionsAction::Purge => {
			let removed = store.purge_expired(now_ms())?;
			Ok(json!({ "removed": removed }))
		}
		SessionsAction::Remove { session_id } => {
			let removed = store.delete(&session_id)?;
			Ok(json!({ "sessionId": session_id, "removed": removed }))
		}
	}
}
