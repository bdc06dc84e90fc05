//! Symmetric key generation and authenticated encryption.
//!
//! The protocol only depends on the [`CryptoProvider`] contract: a fresh
//! random key per session, and `decrypt(encrypt(p)) == p` under the same key
//! with tampering detected as [`Error::Decryption`].
//!
//! [`AesGcmProvider`] is the default: AES-256-GCM with a random 96-bit nonce
//! per message, producing an [`Envelope`] of base64 fields.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use wc_protocol::{Envelope, SHARED_KEY_LEN, SharedKey};

use crate::error::{Error, Result};

/// Nonce size for AES-GCM (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

/// Capability interface for session key material and envelope encryption.
pub trait CryptoProvider: Send + Sync {
	fn generate_key(&self) -> Result<SharedKey>;

	fn encrypt(&self, key: &SharedKey, plaintext: &[u8]) -> Result<Envelope>;

	fn decrypt(&self, key: &SharedKey, envelope: &Envelope) -> Result<Vec<u8>>;
}

/// AES-256-GCM provider backed by the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmProvider;

impl AesGcmProvider {
	fn cipher(key: &SharedKey) -> Result<Aes256Gcm> {
		Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| Error::Encryption(format!("invalid key: {e}")))
	}
}

impl CryptoProvider for AesGcmProvider {
	fn generate_key(&self) -> Result<SharedKey> {
		let mut bytes = [0u8; SHARED_KEY_LEN];
		rand::rng().fill_bytes(&mut bytes);
		Ok(SharedKey::from_bytes(bytes))
	}

	fn encrypt(&self, key: &SharedKey, plaintext: &[u8]) -> Result<Envelope> {
		let cipher = Self::cipher(key)?;

		let mut nonce_bytes = [0u8; NONCE_SIZE];
		rand::rng().fill_bytes(&mut nonce_bytes);
		let nonce = Nonce::from_slice(&nonce_bytes);

		let ciphertext = cipher.encrypt(nonce, plaintext).map_err(|e| Error::Encryption(e.to_string()))?;

		Ok(Envelope {
			data: BASE64.encode(ciphertext),
			nonce: BASE64.encode(nonce_bytes),
		})
	}

	fn decrypt(&self, key: &SharedKey, envelope: &Envelope) -> Result<Vec<u8>> {
		let cipher = Self::cipher(key)?;

		let nonce_bytes = BASE64
			.decode(&envelope.nonce)
			.map_err(|e| Error::Decryption(format!("invalid nonce encoding: {e}")))?;
		if nonce_bytes.len() != NONCE_SIZE {
			return Err(Error::Decryption(format!("expected {NONCE_SIZE}-byte nonce, got {}", nonce_bytes.len())));
		}

		let ciphertext = BASE64
			.decode(&envelope.data)
			.map_err(|e| Error::Decryption(format!("invalid ciphertext encoding: {e}")))?;

		cipher
			.decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
			.map_err(|_| Error::Decryption("envelope failed authentication".to_string()))
	}
}
