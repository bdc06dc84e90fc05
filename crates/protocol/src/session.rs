//! Session records, registry patches, and the pairing payload.

use serde::{Deserialize, Serialize};

use crate::key::SharedKey;

/// Pairing context between one dapp instance and a wallet.
///
/// Format as persisted in the local registry:
/// ```json
/// {
///   "bridgeUrl": "https://bridge.example.org",
///   "sessionId": "abc123",
///   "sharedKey": "<base64>",
///   "dappName": "Example Dapp",
///   "expires": 1735689600000,
///   "accounts": ["0x1"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	/// Relay server base URL, fixed for the session lifetime
	pub bridge_url: String,
	/// Server-issued identifier
	pub session_id: String,
	/// Locally generated key, never sent to the bridge in plaintext
	pub shared_key: SharedKey,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dapp_name: Option<String>,
	/// Absolute expiry in milliseconds since the UNIX epoch
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires: Option<u64>,
	/// Wallet accounts, present once the wallet approved the pairing
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub accounts: Option<Vec<String>>,
}

impl Session {
	/// Returns `true` while `now_ms` is strictly before the expiry.
	///
	/// A session without an expiry is never live.
	pub fn is_live(&self, now_ms: u64) -> bool {
		self.expires.is_some_and(|expires| expires > now_ms)
	}

	/// Returns `true` once the wallet has approved the pairing.
	pub fn is_approved(&self) -> bool {
		self.accounts.as_ref().is_some_and(|accounts| !accounts.is_empty())
	}

	/// Builds the payload a wallet needs to join this session.
	pub fn pairing_payload(&self) -> PairingPayload {
		PairingPayload {
			bridge_url: self.bridge_url.clone(),
			session_id: self.session_id.clone(),
			shared_key: self.shared_key.clone(),
			dapp_name: self.dapp_name.clone(),
			expires: self.expires,
		}
	}

	/// Applies every field present in `patch`, leaving the rest untouched.
	pub fn apply(&mut self, patch: &SessionPatch) {
		if let Some(bridge_url) = &patch.bridge_url {
			self.bridge_url.clone_from(bridge_url);
		}
		if let Some(dapp_name) = &patch.dapp_name {
			self.dapp_name = Some(dapp_name.clone());
		}
		if let Some(expires) = patch.expires {
			self.expires = Some(expires);
		}
		if let Some(accounts) = &patch.accounts {
			self.accounts = Some(accounts.clone());
		}
	}
}

/// Partial session used to merge fields into an existing registry record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
	pub session_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bridge_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dapp_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub accounts: Option<Vec<String>>,
}

impl SessionPatch {
	pub fn new(session_id: impl Into<String>) -> Self {
		Self {
			session_id: session_id.into(),
			..Default::default()
		}
	}

	pub fn with_accounts(mut self, accounts: Vec<String>) -> Self {
		self.accounts = Some(accounts);
		self
	}

	pub fn with_expires(mut self, expires: u64) -> Self {
		self.expires = Some(expires);
		self
	}

	pub fn with_dapp_name(mut self, dapp_name: impl Into<String>) -> Self {
		self.dapp_name = Some(dapp_name.into());
		self
	}
}

/// Data encoded into the QR code / shareable pairing string.
///
/// Wallets parse this object directly, so field names must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingPayload {
	pub bridge_url: String,
	pub session_id: String,
	pub shared_key: SharedKey,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dapp_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires: Option<u64>,
}
