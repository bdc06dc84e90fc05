use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use wc::Session;

/// Session fields safe to print; the shared key never leaves the store.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
	pub session_id: String,
	pub bridge_url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dapp_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expires: Option<u64>,
	pub live: bool,
	pub accounts: Vec<String>,
}

impl SessionSummary {
	pub fn new(session: &Session, now_ms: u64) -> Self {
		Self {
			session_id: session.session_id.clone(),
			bridge_url: session.bridge_url.clone(),
			dapp_name: session.dapp_name.clone(),
			expires: session.expires,
			live: session.is_live(now_ms),
			accounts: session.accounts.clone().unwrap_or_default(),
		}
	}
}

/// Writes `value` as pretty JSON followed by a newline to stdout.
pub fn emit<T: Serialize + ?Sized>(value: &T) -> Result<()> {
	let mut stdout = std::io::stdout().lock();
	serde_json::to_writer_pretty(&mut stdout, value)?;
	writeln!(stdout)?;
	Ok(())
}
