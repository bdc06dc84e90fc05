//! In-memory bridge for testing the protocol layer without a relay server.
//!
//! # Example
//!
//! ```ignore
//! let bridge = Arc::new(FakeBridge::new().with_session_id("abc123"));
//! let manager = SessionManager::new(options, Capabilities::new(crypto, bridge.clone()), store);
//! manager.negotiate().await?;
//! assert_eq!(bridge.requests().len(), 1);
//! ```

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use wc_protocol::{CreateSessionResponse, EncryptedBlob, NewTransactionRequest, NewTransactionResponse, SharedKey};

use crate::bridge::BridgeClient;
use crate::crypto::{AesGcmProvider, CryptoProvider};
use crate::error::{Error, Result};

/// A call observed by [`FakeBridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
	CreateSession {
		bridge_url: String,
	},
	Fetch {
		bridge_url: String,
		path: String,
	},
	SubmitTransaction {
		bridge_url: String,
		session_id: String,
		request: NewTransactionRequest,
	},
}

#[derive(Debug, Clone)]
enum Reply {
	Blob(EncryptedBlob),
	Fail(u16, String),
}

#[derive(Debug, Default)]
struct FakeState {
	session_ids: VecDeque<String>,
	replies: HashMap<String, Reply>,
	create_failure: Option<(u16, String)>,
	submit_failure: Option<(u16, String)>,
	requests: Vec<RecordedRequest>,
	created: usize,
	submitted: usize,
}

/// Scriptable [`BridgeClient`] that records every request it receives.
#[derive(Debug, Default)]
pub struct FakeBridge {
	state: Mutex<FakeState>,
}

impl FakeBridge {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues the id returned by the next `create_session` call.
	///
	/// Without a queued id, sessions are numbered `session-1`, `session-2`...
	pub fn with_session_id(self, session_id: impl Into<String>) -> Self {
		self.state.lock().session_ids.push_back(session_id.into());
		self
	}

	/// Makes every `create_session` call fail with the given HTTP status.
	pub fn fail_create(&self, status: u16, message: &str) {
		self.state.lock().create_failure = Some((status, message.to_string()));
	}

	/// Makes every `submit_transaction` call fail with the given HTTP status.
	pub fn fail_submit(&self, status: u16, message: &str) {
		self.state.lock().submit_failure = Some((status, message.to_string()));
	}

	/// Serves `blob` for `GET {path}`.
	pub fn put_blob(&self, path: &str, blob: EncryptedBlob) {
		self.state.lock().replies.insert(path.to_string(), Reply::Blob(blob));
	}

	/// Encrypts `value` under `key` (AES-GCM) and serves it for `GET {path}`.
	pub fn put_encrypted(&self, path: &str, key: &SharedKey, value: &Value) -> Result<()> {
		let plaintext = serde_json::to_vec(value)?;
		let data = AesGcmProvider.encrypt(key, &plaintext)?;
		self.put_blob(path, EncryptedBlob { data, ttl_in_seconds: None });
		Ok(())
	}

	/// Makes `GET {path}` fail with the given HTTP status.
	pub fn fail_fetch(&self, path: &str, status: u16, message: &str) {
		self.state.lock().replies.insert(path.to_string(), Reply::Fail(status, message.to_string()));
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.state.lock().requests.clone()
	}

	/// Bodies of every transaction submission, in order.
	pub fn submitted(&self) -> Vec<NewTransactionRequest> {
		self.state
			.lock()
			.requests
			.iter()
			.filter_map(|r| match r {
				RecordedRequest::SubmitTransaction { request, .. } => Some(request.clone()),
				_ => None,
			})
			.collect()
	}
}

fn bridge_error(status: u16, message: &str) -> Error {
	Error::Bridge {
		status,
		message: message.to_string(),
	}
}

#[async_trait]
impl BridgeClient for FakeBridge {
	async fn create_session(&self, bridge_url: &str) -> Result<CreateSessionResponse> {
		let mut state = self.state.lock();
		state.requests.push(RecordedRequest::CreateSession {
			bridge_url: bridge_url.to_string(),
		});
		if let Some((status, message)) = &state.create_failure {
			return Err(bridge_error(*status, message));
		}

		state.created += 1;
		let session_id = match state.session_ids.pop_front() {
			Some(id) => id,
			None => format!("session-{}", state.created),
		};
		Ok(CreateSessionResponse { session_id })
	}

	async fn fetch_blob(&self, bridge_url: &str, path: &str) -> Result<Option<EncryptedBlob>> {
		let mut state = self.state.lock();
		state.requests.push(RecordedRequest::Fetch {
			bridge_url: bridge_url.to_string(),
			path: path.to_string(),
		});
		match state.replies.get(path) {
			Some(Reply::Blob(blob)) => Ok(Some(blob.clone())),
			Some(Reply::Fail(status, message)) => Err(bridge_error(*status, message)),
			None => Ok(None),
		}
	}

	async fn submit_transaction(&self, bridge_url: &str, session_id: &str, request: &NewTransactionRequest) -> Result<NewTransactionResponse> {
		let mut state = self.state.lock();
		state.requests.push(RecordedRequest::SubmitTransaction {
			bridge_url: bridge_url.to_string(),
			session_id: session_id.to_string(),
			request: request.clone(),
		});
		if let Some((status, message)) = &state.submit_failure {
			return Err(bridge_error(*status, message));
		}

		state.submitted += 1;
		Ok(NewTransactionResponse {
			transaction_id: format!("tx-{}", state.submitted),
		})
	}
}
