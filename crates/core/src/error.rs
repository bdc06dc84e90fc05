//! Error types for the pairing and relay client.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the session, relay, poller, and store layers.
#[derive(Debug, Error)]
pub enum Error {
	/// Negotiation attempted on an instance that already holds a session.
	///
	/// A fresh manager must be used for every pairing attempt.
	#[error("Session already created: {session_id}")]
	AlreadyPaired { session_id: String },

	/// Operation requires an active session but none is established.
	#[error("No active session; pair with a wallet before sending requests")]
	NoSession,

	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// Bridge answered with a client or server error status.
	#[error("Bridge error {status}: {message}")]
	Bridge { status: u16, message: String },

	/// Request never produced an HTTP response (DNS, TLS, connection reset...).
	#[error("Bridge transport error: {0}")]
	Transport(#[from] reqwest::Error),

	/// Envelope failed authentication or was produced with another key.
	///
	/// The session should be treated as compromised and discarded.
	#[error("Decryption failed: {0}")]
	Decryption(String),

	#[error("Encryption failed: {0}")]
	Encryption(String),

	#[error("Session store error: {0}")]
	Storage(String),

	#[error("QR render failed: {0}")]
	QrRender(String),

	/// Status poller gave up before the bridge produced a result.
	#[error("Timed out after {0:?} waiting for status")]
	PollTimeout(Duration),

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns the HTTP status for bridge-level failures.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Bridge { status, .. } => Some(*status),
			Self::Transport(err) => err.status().map(|s| s.as_u16()),
			_ => None,
		}
	}
}
