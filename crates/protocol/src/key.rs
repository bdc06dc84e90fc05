//! Symmetric session key material.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of a session key in bytes (256 bits).
pub const SHARED_KEY_LEN: usize = 32;

/// Key shared between the dapp and the wallet for one session.
///
/// Serialized as standard base64 text. `Debug` output is redacted so keys
/// never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedKey([u8; SHARED_KEY_LEN]);

impl SharedKey {
	pub fn from_bytes(bytes: [u8; SHARED_KEY_LEN]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; SHARED_KEY_LEN] {
		&self.0
	}

	pub fn to_base64(&self) -> String {
		BASE64.encode(self.0)
	}

	/// Parses a base64-encoded key, rejecting anything that is not exactly 32 bytes.
	pub fn from_base64(encoded: &str) -> Result<Self, KeyDecodeError> {
		let bytes = BASE64.decode(encoded.trim()).map_err(|e| KeyDecodeError(e.to_string()))?;
		let bytes: [u8; SHARED_KEY_LEN] = bytes
			.try_into()
			.map_err(|v: Vec<u8>| KeyDecodeError(format!("expected {SHARED_KEY_LEN} bytes, got {}", v.len())))?;
		Ok(Self(bytes))
	}
}

impl fmt::Debug for SharedKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("SharedKey(<redacted>)")
	}
}

impl Serialize for SharedKey {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_base64())
	}
}

impl<'de> Deserialize<'de> for SharedKey {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let encoded = String::deserialize(deserializer)?;
		Self::from_base64(&encoded).map_err(D::Error::custom)
	}
}

/// Error returned when key text is not valid base64 or has the wrong length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDecodeError(String);

impl fmt::Display for KeyDecodeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "invalid shared key: {}", self.0)
	}
}

impl std::error::Error for KeyDecodeError {}
