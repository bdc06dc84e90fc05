//! Pairing lifecycle: resume a stored live session or negotiate a new one.
//!
//! # Flow
//!
//! 1. [`SessionManager::resume`] loads stored sessions, keeps those that have
//!    not expired, and asks the bridge (concurrently) whether each one still
//!    carries wallet-approved accounts.
//! 2. The first approved session in store order is adopted. Otherwise the
//!    manager falls through to [`SessionManager::negotiate`].
//! 3. `negotiate` generates the shared key, registers a session with the
//!    bridge, and returns the pairing payload (plus a rendered QR code when a
//!    renderer is configured) for the wallet to scan.
//!
//! A manager pairs at most once. Resuming or negotiating on an instance that
//! already holds a session id fails with [`Error::AlreadyPaired`]; use a fresh
//! manager for every pairing attempt.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use wc_protocol::{Session, SessionPatch, SharedKey, paths};

use crate::bridge::{BridgeClient, HttpBridgeClient};
use crate::channel::EncryptedChannel;
use crate::crypto::{AesGcmProvider, CryptoProvider};
use crate::error::{Error, Result};
use crate::poller::{PollHandle, StatusPoller};
use crate::qr::{QrRenderer, SvgDataUrlRenderer};
use crate::relay::TransactionRelay;
use crate::store::SessionStore;

/// Current wall-clock time in milliseconds since the UNIX epoch.
pub fn now_ms() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// External collaborators injected into the manager.
#[derive(Clone)]
pub struct Capabilities {
	pub crypto: Arc<dyn CryptoProvider>,
	pub bridge: Arc<dyn BridgeClient>,
	pub qr: Option<Arc<dyn QrRenderer>>,
}

impl Capabilities {
	pub fn new(crypto: Arc<dyn CryptoProvider>, bridge: Arc<dyn BridgeClient>) -> Self {
		Self { crypto, bridge, qr: None }
	}

	/// AES-GCM envelopes, a `reqwest` bridge client, and SVG QR codes.
	pub fn http() -> Result<Self> {
		Ok(Self::new(Arc::new(AesGcmProvider), Arc::new(HttpBridgeClient::new()?)).with_qr_renderer(Arc::new(SvgDataUrlRenderer)))
	}

	pub fn with_qr_renderer(mut self, qr: Arc<dyn QrRenderer>) -> Self {
		self.qr = Some(qr);
		self
	}
}

/// Pairing parameters for one manager.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
	pub bridge_url: String,
	pub dapp_name: Option<String>,
	/// Absolute expiry (ms since epoch); takes precedence over `session_ttl`.
	pub expires: Option<u64>,
	/// Lifetime used to compute `expires` at negotiation time.
	pub session_ttl: Option<Duration>,
	/// Pre-generated key; one is generated during negotiation when absent.
	pub shared_key: Option<SharedKey>,
}

impl SessionOptions {
	pub fn new(bridge_url: impl Into<String>) -> Self {
		Self {
			bridge_url: bridge_url.into(),
			..Default::default()
		}
	}

	pub fn with_dapp_name(mut self, dapp_name: impl Into<String>) -> Self {
		self.dapp_name = Some(dapp_name.into());
		self
	}

	pub fn with_expires(mut self, expires: u64) -> Self {
		self.expires = Some(expires);
		self
	}

	pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
		self.session_ttl = Some(ttl);
		self
	}

	pub fn with_shared_key(mut self, key: SharedKey) -> Self {
		self.shared_key = Some(key);
		self
	}
}

/// Result of [`SessionManager::negotiate`].
#[derive(Debug, Clone)]
pub struct PairingOutcome {
	pub session: Session,
	/// JSON pairing payload, the text a wallet must receive
	pub payload: String,
	/// Rendered QR code, absent when no renderer is configured or rendering failed
	pub qr_code: Option<String>,
}

/// How [`SessionManager::resume`] obtained its session.
#[derive(Debug, Clone)]
pub enum Pairing {
	Resumed(Session),
	Negotiated(PairingOutcome),
}

impl Pairing {
	pub fn session(&self) -> &Session {
		match self {
			Self::Resumed(session) => session,
			Self::Negotiated(outcome) => &outcome.session,
		}
	}
}

/// Decrypted `/session/{id}` blob.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
	pub data: Value,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ttl_in_seconds: Option<u64>,
}

impl SessionStatus {
	/// Accounts reported by the wallet, if any.
	pub fn accounts(&self) -> Vec<String> {
		accounts_from(&self.data)
	}
}

/// Extracts wallet accounts from decrypted session data.
///
/// Accepts either `{"accounts": [...]}` or a bare array of addresses.
fn accounts_from(data: &Value) -> Vec<String> {
	let list = match data {
		Value::Array(items) => items,
		Value::Object(map) => match map.get("accounts") {
			Some(Value::Array(items)) => items,
			_ => return Vec::new(),
		},
		_ => return Vec::new(),
	};
	list.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
}

/// Owns the pairing state of one dapp instance.
pub struct SessionManager {
	bridge_url: String,
	dapp_name: Option<String>,
	session_ttl: Option<Duration>,
	expires: Option<u64>,
	session_id: Option<String>,
	shared_key: Option<SharedKey>,
	accounts: Option<Vec<String>>,
	capabilities: Capabilities,
	store: SessionStore,
}

impl std::fmt::Debug for SessionManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionManager")
			.field("bridge_url", &self.bridge_url)
			.field("session_id", &self.session_id)
			.field("expires", &self.expires)
			.finish_non_exhaustive()
	}
}

impl SessionManager {
	pub fn new(options: SessionOptions, capabilities: Capabilities, store: SessionStore) -> Self {
		Self {
			bridge_url: options.bridge_url,
			dapp_name: options.dapp_name,
			session_ttl: options.session_ttl,
			expires: options.expires,
			session_id: None,
			shared_key: options.shared_key,
			accounts: None,
			capabilities,
			store,
		}
	}

	pub fn session_id(&self) -> Option<&str> {
		self.session_id.as_deref()
	}

	pub fn bridge_url(&self) -> &str {
		&self.bridge_url
	}

	pub fn store(&self) -> &SessionStore {
		&self.store
	}

	/// Snapshot of the active session, once a session id and key are known.
	pub fn session(&self) -> Option<Session> {
		Some(Session {
			bridge_url: self.bridge_url.clone(),
			session_id: self.session_id.clone()?,
			shared_key: self.shared_key.clone()?,
			dapp_name: self.dapp_name.clone(),
			expires: self.expires,
			accounts: self.accounts.clone(),
		})
	}

	/// Adopts the first stored live session the wallet still approves, or
	/// negotiates a new one.
	pub async fn resume(&mut self) -> Result<Pairing> {
		self.ensure_unpaired()?;
		let now = now_ms();
		let stored = self.store.list_all().unwrap_or_else(|err| {
			warn!(target = "wc.session", error = %err, "failed to read session registry; negotiating fresh");
			Vec::new()
		});

		let candidates: Vec<Session> = stored.into_iter().filter(|s| s.is_live(now)).collect();
		debug!(target = "wc.session", candidates = candidates.len(), "checking stored sessions");

		let checks = candidates.into_iter().map(|session| {
			let channel = EncryptedChannel::for_session(&session, &self.capabilities.crypto, &self.capabilities.bridge);
			async move {
				match channel.fetch(&paths::session(&session.session_id)).await {
					Ok(Some(status)) => {
						let accounts = accounts_from(&status.data);
						if accounts.is_empty() {
							debug!(target = "wc.session", session_id = %session.session_id, "stored session has no accounts");
							return None;
						}
						Some(Session {
							accounts: Some(accounts),
							..session
						})
					}
					Ok(None) => {
						debug!(target = "wc.session", session_id = %session.session_id, "stored session not approved");
						None
					}
					Err(err) => {
						debug!(target = "wc.session", session_id = %session.session_id, error = %err, "stored session check failed");
						None
					}
				}
			}
		});
		// join_all keeps input order, so selection follows store order.
		let survivor = join_all(checks).await.into_iter().flatten().next();

		let Some(session) = survivor else {
			return Ok(Pairing::Negotiated(self.negotiate().await?));
		};

		self.adopt(&session);
		if let Some(accounts) = &session.accounts {
			let patch = SessionPatch::new(session.session_id.clone()).with_accounts(accounts.clone());
			if let Err(err) = self.store.update(&patch) {
				warn!(target = "wc.session", session_id = %session.session_id, error = %err, "failed to record accounts");
			}
		}
		info!(target = "wc.session", session_id = %session.session_id, "resumed stored session");
		Ok(Pairing::Resumed(session))
	}

	/// Registers a new session with the bridge and builds the pairing payload.
	pub async fn negotiate(&mut self) -> Result<PairingOutcome> {
		self.ensure_unpaired()?;

		if self.expires.is_none() {
			self.expires = self.session_ttl.map(expiry_after).transpose()?;
		}
		if self.shared_key.is_none() {
			self.shared_key = Some(self.capabilities.crypto.generate_key()?);
		}

		let response = self.capabilities.bridge.create_session(&self.bridge_url).await?;
		self.session_id = Some(response.session_id);

		let session = self.session().ok_or(Error::NoSession)?;
		let payload = serde_json::to_string(&session.pairing_payload())?;
		let qr_code = self.render_qr(&payload);

		info!(target = "wc.session", session_id = %session.session_id, bridge = %self.bridge_url, "negotiated new session");
		Ok(PairingOutcome { session, payload, qr_code })
	}

	/// Session id and key are assigned once per manager.
	fn ensure_unpaired(&self) -> Result<()> {
		match &self.session_id {
			Some(session_id) => Err(Error::AlreadyPaired {
				session_id: session_id.clone(),
			}),
			None => Ok(()),
		}
	}

	fn render_qr(&self, payload: &str) -> Option<String> {
		let renderer = self.capabilities.qr.as_ref()?;
		match renderer.render(payload) {
			Ok(code) => Some(code),
			Err(err) => {
				warn!(target = "wc.session", error = %err, "failed to render pairing QR code");
				None
			}
		}
	}

	fn adopt(&mut self, session: &Session) {
		self.bridge_url.clone_from(&session.bridge_url);
		self.session_id = Some(session.session_id.clone());
		self.shared_key = Some(session.shared_key.clone());
		self.dapp_name.clone_from(&session.dapp_name);
		self.expires = session.expires;
		self.accounts.clone_from(&session.accounts);
	}

	/// Saves the active session to the store.
	///
	/// Returns `false` when the store is not initialized.
	pub fn persist(&self) -> Result<bool> {
		let session = self.session().ok_or(Error::NoSession)?;
		self.store.save(&session)
	}

	/// Records wallet approval from a session status, in memory and in the store.
	///
	/// Returns the accounts found in the status.
	pub fn record_approval(&mut self, status: &SessionStatus) -> Result<Vec<String>> {
		let session_id = self.session_id.clone().ok_or(Error::NoSession)?;
		let accounts = status.accounts();
		if accounts.is_empty() {
			return Ok(accounts);
		}

		self.accounts = Some(accounts.clone());
		if !self.store.update(&SessionPatch::new(session_id.clone()).with_accounts(accounts.clone()))? {
			debug!(target = "wc.session", %session_id, "session not stored; approval kept in memory only");
		}
		Ok(accounts)
	}

	fn channel(&self) -> Result<(EncryptedChannel, String)> {
		let session = self.session().ok_or(Error::NoSession)?;
		let path = paths::session(&session.session_id);
		Ok((EncryptedChannel::for_session(&session, &self.capabilities.crypto, &self.capabilities.bridge), path))
	}

	/// Fetches the wallet's current session data, `None` while not approved.
	pub async fn fetch_session_status(&self) -> Result<Option<SessionStatus>> {
		let (channel, path) = self.channel()?;
		fetch_status(&channel, &path).await
	}

	/// Polls the session status until the wallet responds.
	pub fn listen_session_status<C>(&self, callback: C, interval: Duration, timeout: Duration) -> Result<PollHandle>
	where
		C: FnOnce(Result<SessionStatus>) + Send + 'static,
	{
		let (channel, path) = self.channel()?;
		let fetch = move || {
			let channel = channel.clone();
			let path = path.clone();
			async move { fetch_status(&channel, &path).await }
		};
		Ok(StatusPoller::new(fetch, callback, interval, timeout)?.start())
	}

	/// Builds a relay bound to the current session snapshot.
	pub fn transaction_relay(&self) -> TransactionRelay {
		TransactionRelay::new(
			self.session(),
			Arc::clone(&self.capabilities.crypto),
			Arc::clone(&self.capabilities.bridge),
		)
	}
}

/// Absolute expiry `ttl` from now, rejecting lifetimes past the end of the clock.
fn expiry_after(ttl: Duration) -> Result<u64> {
	u64::try_from(ttl.as_millis())
		.ok()
		.and_then(|ms| now_ms().checked_add(ms))
		.ok_or_else(|| Error::InvalidArgument(format!("session ttl {ttl:?} is too large")))
}

async fn fetch_status(channel: &EncryptedChannel, path: &str) -> Result<Option<SessionStatus>> {
	Ok(channel.fetch(path).await?.map(|decrypted| SessionStatus {
		data: decrypted.data,
		ttl_in_seconds: decrypted.ttl_in_seconds,
	}))
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use wc_protocol::SHARED_KEY_LEN;

	use super::*;
	use crate::fake_bridge::{FakeBridge, RecordedRequest};

	const BRIDGE: &str = "https://bridge.test";
	const HOUR_MS: u64 = 3_600_000;

	struct FailingRenderer;

	impl QrRenderer for FailingRenderer {
		fn render(&self, _payload: &str) -> Result<String> {
			Err(Error::QrRender("canvas unavailable".to_string()))
		}
	}

	fn manager(bridge: &Arc<FakeBridge>, store: SessionStore) -> SessionManager {
		let capabilities = Capabilities::new(Arc::new(AesGcmProvider), bridge.clone());
		SessionManager::new(SessionOptions::new(BRIDGE).with_dapp_name("Demo"), capabilities, store)
	}

	fn stored(id: &str, key_byte: u8, expires: u64) -> Session {
		Session {
			bridge_url: BRIDGE.to_string(),
			session_id: id.to_string(),
			shared_key: SharedKey::from_bytes([key_byte; SHARED_KEY_LEN]),
			dapp_name: Some("Demo".to_string()),
			expires: Some(expires),
			accounts: None,
		}
	}

	#[tokio::test]
	async fn negotiate_registers_session_and_builds_payload() {
		let bridge = Arc::new(FakeBridge::new().with_session_id("abc123"));
		let mut manager = manager(&bridge, SessionStore::in_memory());

		let outcome = manager.negotiate().await.unwrap();
		assert_eq!(outcome.session.session_id, "abc123");
		assert_eq!(manager.session_id(), Some("abc123"));
		assert!(outcome.qr_code.is_none());

		let payload: Value = serde_json::from_str(&outcome.payload).unwrap();
		assert_eq!(payload["bridgeUrl"], BRIDGE);
		assert_eq!(payload["sessionId"], "abc123");
		assert_eq!(payload["dappName"], "Demo");
		assert_eq!(payload["sharedKey"], outcome.session.shared_key.to_base64());

		assert_eq!(
			bridge.requests(),
			vec![RecordedRequest::CreateSession {
				bridge_url: BRIDGE.to_string()
			}]
		);
	}

	#[tokio::test]
	async fn negotiate_twice_fails_without_mutation() {
		let bridge = Arc::new(FakeBridge::new().with_session_id("first").with_session_id("second"));
		let mut manager = manager(&bridge, SessionStore::in_memory());

		manager.negotiate().await.unwrap();
		let before = manager.session().unwrap();

		let err = manager.negotiate().await.unwrap_err();
		assert!(matches!(err, Error::AlreadyPaired { ref session_id } if session_id == "first"));
		assert_eq!(manager.session().unwrap(), before);
		assert_eq!(bridge.requests().len(), 1);
	}

	#[tokio::test]
	async fn resume_after_negotiate_keeps_session() {
		let now = now_ms();
		let store = SessionStore::in_memory();
		store.init().unwrap();
		let stored_session = stored("stored", 1, now + HOUR_MS);
		store.save(&stored_session).unwrap();

		let bridge = Arc::new(FakeBridge::new().with_session_id("mine"));
		bridge
			.put_encrypted(&paths::session("stored"), &stored_session.shared_key, &json!(["0x1"]))
			.unwrap();
		let mut manager = manager(&bridge, store);
		manager.negotiate().await.unwrap();
		let before = manager.session().unwrap();

		let err = manager.resume().await.unwrap_err();
		assert!(matches!(err, Error::AlreadyPaired { ref session_id } if session_id == "mine"));
		assert_eq!(manager.session().unwrap(), before);
		assert_eq!(manager.session_id(), Some("mine"));
		assert_ne!(before.shared_key, stored_session.shared_key);
		assert!(!bridge.requests().iter().any(|r| matches!(r, RecordedRequest::Fetch { .. })));
	}

	#[tokio::test]
	async fn oversized_ttl_is_rejected_without_mutation() {
		let bridge = Arc::new(FakeBridge::new());
		let options = SessionOptions::new(BRIDGE).with_session_ttl(Duration::from_secs(u64::MAX));
		let mut manager = SessionManager::new(options, Capabilities::new(Arc::new(AesGcmProvider), bridge.clone()), SessionStore::in_memory());

		let err = manager.negotiate().await.unwrap_err();
		assert!(matches!(err, Error::InvalidArgument(_)));
		assert!(manager.session().is_none());
		assert!(bridge.requests().is_empty());
	}

	#[tokio::test]
	async fn negotiate_keeps_preset_key_and_computes_expiry() {
		let bridge = Arc::new(FakeBridge::new());
		let key = SharedKey::from_bytes([8u8; SHARED_KEY_LEN]);
		let options = SessionOptions::new(BRIDGE)
			.with_shared_key(key.clone())
			.with_session_ttl(Duration::from_secs(60));
		let mut manager = SessionManager::new(options, Capabilities::new(Arc::new(AesGcmProvider), bridge), SessionStore::in_memory());

		let before = now_ms();
		let outcome = manager.negotiate().await.unwrap();
		assert_eq!(outcome.session.shared_key, key);
		let expires = outcome.session.expires.unwrap();
		assert!(expires >= before + 60_000 && expires <= now_ms() + 60_000);
	}

	#[tokio::test]
	async fn negotiate_surfaces_bridge_errors() {
		let bridge = Arc::new(FakeBridge::new());
		bridge.fail_create(503, "Service Unavailable");
		let mut manager = manager(&bridge, SessionStore::in_memory());

		let err = manager.negotiate().await.unwrap_err();
		assert!(matches!(err, Error::Bridge { status: 503, .. }));
		assert!(manager.session_id().is_none());
	}

	#[tokio::test]
	async fn qr_failure_does_not_abort_negotiation() {
		let bridge = Arc::new(FakeBridge::new().with_session_id("abc123"));
		let capabilities = Capabilities::new(Arc::new(AesGcmProvider), bridge).with_qr_renderer(Arc::new(FailingRenderer));
		let mut manager = SessionManager::new(SessionOptions::new(BRIDGE), capabilities, SessionStore::in_memory());

		let outcome = manager.negotiate().await.unwrap();
		assert_eq!(outcome.session.session_id, "abc123");
		assert!(outcome.qr_code.is_none());
	}

	#[tokio::test]
	async fn qr_renderer_output_is_returned() {
		let bridge = Arc::new(FakeBridge::new());
		let capabilities = Capabilities::new(Arc::new(AesGcmProvider), bridge).with_qr_renderer(Arc::new(SvgDataUrlRenderer));
		let mut manager = SessionManager::new(SessionOptions::new(BRIDGE), capabilities, SessionStore::in_memory());

		let outcome = manager.negotiate().await.unwrap();
		assert!(outcome.qr_code.unwrap().starts_with("data:image/svg+xml;base64,"));
	}

	#[tokio::test]
	async fn resume_adopts_the_only_approved_live_session() {
		let now = now_ms();
		let store = SessionStore::in_memory();
		store.init().unwrap();

		let expired = stored("expired", 1, now - HOUR_MS);
		let pending = stored("pending", 2, now + HOUR_MS);
		let approved = stored("approved", 3, now + HOUR_MS);
		let failing = stored("failing", 4, now + HOUR_MS);
		let empty = stored("empty", 5, now + HOUR_MS);
		for session in [&expired, &approved, &pending, &failing, &empty] {
			store.save(session).unwrap();
		}

		let bridge = Arc::new(FakeBridge::new());
		bridge
			.put_encrypted(&paths::session("expired"), &expired.shared_key, &json!({"accounts": ["0xdead"]}))
			.unwrap();
		bridge
			.put_encrypted(&paths::session("approved"), &approved.shared_key, &json!({"accounts": ["0xabc"]}))
			.unwrap();
		bridge
			.put_encrypted(&paths::session("empty"), &empty.shared_key, &json!({"accounts": []}))
			.unwrap();
		bridge.fail_fetch(&paths::session("failing"), 500, "boom");

		let mut manager = manager(&bridge, store.clone());
		let pairing = manager.resume().await.unwrap();

		let Pairing::Resumed(session) = pairing else {
			panic!("expected resumed session");
		};
		assert_eq!(session.session_id, "approved");
		assert_eq!(session.accounts, Some(vec!["0xabc".to_string()]));
		assert_eq!(manager.session().unwrap().shared_key, approved.shared_key);

		// Expired sessions are never queried; no new session is created.
		let requests = bridge.requests();
		assert!(!requests.iter().any(|r| matches!(r, RecordedRequest::Fetch { path, .. } if path == "/session/expired")));
		assert!(!requests.iter().any(|r| matches!(r, RecordedRequest::CreateSession { .. })));

		// Accounts are reconciled into the registry.
		assert_eq!(store.get("approved").unwrap().unwrap().accounts, Some(vec!["0xabc".to_string()]));
	}

	#[tokio::test]
	async fn resume_prefers_most_recently_stored() {
		let now = now_ms();
		let store = SessionStore::in_memory();
		store.init().unwrap();
		let older = stored("older", 1, now + HOUR_MS);
		let newer = stored("newer", 2, now + HOUR_MS);
		store.save(&older).unwrap();
		store.save(&newer).unwrap();

		let bridge = Arc::new(FakeBridge::new());
		bridge.put_encrypted(&paths::session("older"), &older.shared_key, &json!(["0x1"])).unwrap();
		bridge.put_encrypted(&paths::session("newer"), &newer.shared_key, &json!(["0x2"])).unwrap();

		let mut manager = manager(&bridge, store);
		let pairing = manager.resume().await.unwrap();
		assert_eq!(pairing.session().session_id, "newer");
	}

	#[tokio::test]
	async fn resume_falls_through_to_negotiation() {
		let now = now_ms();
		let store = SessionStore::in_memory();
		store.init().unwrap();
		store.save(&stored("stale", 1, now - 1)).unwrap();
		store.save(&stored("pending", 2, now + HOUR_MS)).unwrap();

		let bridge = Arc::new(FakeBridge::new().with_session_id("fresh"));
		let mut manager = manager(&bridge, store);

		let pairing = manager.resume().await.unwrap();
		let Pairing::Negotiated(outcome) = pairing else {
			panic!("expected negotiated session");
		};
		assert_eq!(outcome.session.session_id, "fresh");
	}

	#[tokio::test]
	async fn resume_ignores_key_mismatch() {
		let now = now_ms();
		let store = SessionStore::in_memory();
		store.init().unwrap();
		let session = stored("rekeyed", 1, now + HOUR_MS);
		store.save(&session).unwrap();

		let bridge = Arc::new(FakeBridge::new().with_session_id("fresh"));
		let other_key = SharedKey::from_bytes([9u8; SHARED_KEY_LEN]);
		bridge.put_encrypted(&paths::session("rekeyed"), &other_key, &json!(["0x1"])).unwrap();

		let mut manager = manager(&bridge, store);
		assert!(matches!(manager.resume().await.unwrap(), Pairing::Negotiated(_)));
	}

	#[tokio::test]
	async fn persist_requires_session_and_initialized_store() {
		let bridge = Arc::new(FakeBridge::new().with_session_id("abc123"));
		let store = SessionStore::in_memory();
		let mut manager = manager(&bridge, store.clone());

		assert!(matches!(manager.persist(), Err(Error::NoSession)));
		manager.negotiate().await.unwrap();

		assert!(!manager.persist().unwrap());
		manager.store().init().unwrap();
		assert!(manager.persist().unwrap());
		assert_eq!(manager.bridge_url(), BRIDGE);
		assert_eq!(store.get("abc123").unwrap().unwrap().dapp_name.as_deref(), Some("Demo"));
	}

	#[tokio::test]
	async fn session_status_and_approval() {
		let bridge = Arc::new(FakeBridge::new().with_session_id("abc123"));
		let store = SessionStore::in_memory();
		store.init().unwrap();
		let mut manager = manager(&bridge, store.clone());

		assert!(matches!(manager.fetch_session_status().await, Err(Error::NoSession)));

		let outcome = manager.negotiate().await.unwrap();
		manager.persist().unwrap();
		assert_eq!(manager.fetch_session_status().await.unwrap(), None);

		bridge
			.put_encrypted(&paths::session("abc123"), &outcome.session.shared_key, &json!({"accounts": ["0xabc"]}))
			.unwrap();
		let status = manager.fetch_session_status().await.unwrap().unwrap();
		assert_eq!(status.accounts(), ["0xabc"]);

		assert_eq!(manager.record_approval(&status).unwrap(), ["0xabc"]);
		assert!(manager.session().unwrap().is_approved());
		assert!(store.get("abc123").unwrap().unwrap().is_approved());
	}

	#[tokio::test]
	async fn listen_session_status_completes_when_wallet_approves() {
		let bridge = Arc::new(FakeBridge::new().with_session_id("abc123"));
		let mut manager = manager(&bridge, SessionStore::in_memory());
		let outcome = manager.negotiate().await.unwrap();
		bridge
			.put_encrypted(&paths::session("abc123"), &outcome.session.shared_key, &json!({"accounts": ["0x1"]}))
			.unwrap();

		let (tx, rx) = tokio::sync::oneshot::channel();
		let handle = manager
			.listen_session_status(
				move |result| {
					let _ = tx.send(result);
				},
				Duration::from_millis(10),
				Duration::from_secs(5),
			)
			.unwrap();

		let status = rx.await.unwrap().unwrap();
		assert_eq!(status.accounts(), ["0x1"]);
		assert_eq!(handle.wait().await, crate::PollState::Completed);
	}

	#[test]
	fn accounts_extraction_shapes() {
		assert_eq!(accounts_from(&json!({"accounts": ["0x1", "0x2"]})), ["0x1", "0x2"]);
		assert_eq!(accounts_from(&json!(["0x3"])), ["0x3"]);
		assert!(accounts_from(&json!({"approved": true})).is_empty());
		assert!(accounts_from(&json!(null)).is_empty());
	}
}
