//! Encrypted transaction submission and status lookup for a paired session.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use wc_protocol::{NewTransactionRequest, Session, paths};

use crate::bridge::BridgeClient;
use crate::channel::EncryptedChannel;
use crate::crypto::CryptoProvider;
use crate::error::{Error, Result};
use crate::poller::{PollHandle, StatusPoller};

/// Sends wallet requests through the bridge under the session key.
///
/// Holds a snapshot of the session taken when the relay was built.
#[derive(Clone)]
pub struct TransactionRelay {
	session: Option<Session>,
	crypto: Arc<dyn CryptoProvider>,
	bridge: Arc<dyn BridgeClient>,
}

impl std::fmt::Debug for TransactionRelay {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TransactionRelay")
			.field("session_id", &self.session.as_ref().map(|s| &s.session_id))
			.finish_non_exhaustive()
	}
}

impl TransactionRelay {
	pub fn new(session: Option<Session>, crypto: Arc<dyn CryptoProvider>, bridge: Arc<dyn BridgeClient>) -> Self {
		Self { session, crypto, bridge }
	}

	pub fn session(&self) -> Option<&Session> {
		self.session.as_ref()
	}

	fn channel(&self) -> Result<(&Session, EncryptedChannel)> {
		let session = self.session.as_ref().ok_or(Error::NoSession)?;
		Ok((session, EncryptedChannel::for_session(session, &self.crypto, &self.bridge)))
	}

	/// Encrypts `request` and posts it to the bridge; returns the transaction id.
	pub async fn submit<T: Serialize + ?Sized>(&self, request: &T) -> Result<String> {
		let (session, channel) = self.channel()?;
		let body = NewTransactionRequest {
			data: channel.seal(request)?,
			dapp_name: session.dapp_name.clone(),
		};

		let response = self
			.bridge
			.submit_transaction(&session.bridge_url, &session.session_id, &body)
			.await?;
		info!(
			target = "wc.relay",
			session_id = %session.session_id,
			transaction_id = %response.transaction_id,
			"submitted transaction"
		);
		Ok(response.transaction_id)
	}

	/// Fetches and decrypts the wallet's answer; `None` while it is pending.
	pub async fn fetch_status(&self, transaction_id: &str) -> Result<Option<Value>> {
		let (_, channel) = self.channel()?;
		let path = status_path(transaction_id)?;
		fetch_decrypted(&channel, &path).await
	}

	/// Polls the transaction status until the wallet answers.
	pub fn listen_transaction_status<C>(&self, transaction_id: &str, callback: C, interval: Duration, timeout: Duration) -> Result<PollHandle>
	where
		C: FnOnce(Result<Value>) + Send + 'static,
	{
		let (_, channel) = self.channel()?;
		let path = status_path(transaction_id)?;
		let fetch = move || {
			let channel = channel.clone();
			let path = path.clone();
			async move { fetch_decrypted(&channel, &path).await }
		};
		Ok(StatusPoller::new(fetch, callback, interval, timeout)?.start())
	}
}

fn status_path(transaction_id: &str) -> Result<String> {
	if transaction_id.trim().is_empty() {
		return Err(Error::InvalidArgument("transaction id must not be empty".to_string()));
	}
	// The id becomes a single path segment.
	if transaction_id.contains(['/', '\\', '?', '#', '%']) || transaction_id == "." || transaction_id == ".." {
		return Err(Error::InvalidArgument(format!("invalid transaction id {transaction_id:?}")));
	}
	Ok(paths::transaction_status(transaction_id))
}

async fn fetch_decrypted(channel: &EncryptedChannel, path: &str) -> Result<Option<Value>> {
	let decrypted = channel.fetch(path).await?;
	if decrypted.is_none() {
		debug!(target = "wc.relay", %path, "transaction status pending");
	}
	Ok(decrypted.map(|d| d.data))
}
