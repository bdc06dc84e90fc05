//! Encrypted request/response helpers bound to one session's key and bridge.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use wc_protocol::{Envelope, Session, SharedKey};

use crate::bridge::BridgeClient;
use crate::crypto::CryptoProvider;
use crate::error::{Error, Result};

/// Decrypted bridge blob.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Decrypted {
	pub data: Value,
	pub ttl_in_seconds: Option<u64>,
}

#[derive(Clone)]
pub(crate) struct EncryptedChannel {
	bridge_url: String,
	shared_key: SharedKey,
	crypto: Arc<dyn CryptoProvider>,
	bridge: Arc<dyn BridgeClient>,
}

impl EncryptedChannel {
	pub fn new(bridge_url: String, shared_key: SharedKey, crypto: Arc<dyn CryptoProvider>, bridge: Arc<dyn BridgeClient>) -> Self {
		Self {
			bridge_url,
			shared_key,
			crypto,
			bridge,
		}
	}

	pub fn for_session(session: &Session, crypto: &Arc<dyn CryptoProvider>, bridge: &Arc<dyn BridgeClient>) -> Self {
		Self::new(session.bridge_url.clone(), session.shared_key.clone(), Arc::clone(crypto), Arc::clone(bridge))
	}

	/// Fetches `path` and decrypts it as JSON; `Ok(None)` when nothing is there yet.
	pub async fn fetch(&self, path: &str) -> Result<Option<Decrypted>> {
		let Some(blob) = self.bridge.fetch_blob(&self.bridge_url, path).await? else {
			return Ok(None);
		};

		let plaintext = self.crypto.decrypt(&self.shared_key, &blob.data)?;
		let data = serde_json::from_slice(&plaintext).map_err(|e| Error::Decryption(format!("decrypted payload is not JSON: {e}")))?;
		Ok(Some(Decrypted {
			data,
			ttl_in_seconds: blob.ttl_in_seconds,
		}))
	}

	/// Serializes `value` to JSON and encrypts it under the session key.
	pub fn seal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Envelope> {
		let plaintext = serde_json::to_vec(value)?;
		self.crypto.encrypt(&self.shared_key, &plaintext)
	}
}
