//! Request and response bodies of the bridge REST surface.

use serde::{Deserialize, Serialize};

/// Encrypted transport envelope produced by a crypto provider.
///
/// The bridge only ever sees this shape:
/// ```json
/// { "data": "<base64 ciphertext>", "nonce": "<base64 nonce>" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
	/// Base64-encoded ciphertext including the authentication tag
	pub data: String,
	/// Base64-encoded nonce
	pub nonce: String,
}

/// Response to `POST /session/new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
	pub session_id: String,
}

/// Body of `POST /session/{id}/transaction/new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransactionRequest {
	pub data: Envelope,
	pub dapp_name: Option<String>,
}

/// Response to `POST /session/{id}/transaction/new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransactionResponse {
	pub transaction_id: String,
}

/// Body returned by `GET /session/{id}` and `GET /transaction-status/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedBlob {
	pub data: Envelope,
	/// Remaining lifetime of the blob on the bridge, when reported
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ttl_in_seconds: Option<u64>,
}

/// Bridge paths used by the dapp client.
pub mod paths {
	pub const NEW_SESSION: &str = "/session/new";

	pub fn session(session_id: &str) -> String {
		format!("/session/{session_id}")
	}

	pub fn new_transaction(session_id: &str) -> String {
		format!("/session/{session_id}/transaction/new")
	}

	pub fn transaction_status(transaction_id: &str) -> String {
		format!("/transaction-status/{transaction_id}")
	}
}
