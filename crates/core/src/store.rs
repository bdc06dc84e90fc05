//! Local registry of known sessions, keyed by session id.
//!
//! The registry is one versioned JSON blob stored under [`REGISTRY_KEY`]:
//!
//! ```json
//! { "schema": 1, "sessions": { "<sessionId>": { ...Session, "revision": 3 } } }
//! ```
//!
//! The registry must be created with [`SessionStore::init`] before first use.
//! Until then every mutation is a silent no-op that returns `Ok(false)`, so a
//! missing cache never breaks the pairing flow; a lost session can always be
//! re-paired.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wc_protocol::{Session, SessionPatch};

use crate::error::{Error, Result};
use crate::storage::{MemoryStorage, Storage};

/// Storage key holding the session registry.
pub const REGISTRY_KEY: &str = "wcsmngt";

const REGISTRY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
	schema: u32,
	#[serde(default)]
	sessions: HashMap<String, StoredSession>,
}

impl Default for RegistryFile {
	fn default() -> Self {
		Self {
			schema: REGISTRY_SCHEMA_VERSION,
			sessions: HashMap::new(),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
	#[serde(flatten)]
	session: Session,
	/// Save counter; higher means more recently stored.
	#[serde(default)]
	revision: u64,
}

/// CRUD facade over the registry blob in an injected [`Storage`].
///
/// Clones share the same storage and lock, so read-modify-write cycles are
/// serialized across every handle to one registry.
#[derive(Clone)]
pub struct SessionStore {
	storage: Arc<dyn Storage>,
	key: String,
	lock: Arc<Mutex<()>>,
}

impl fmt::Debug for SessionStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionStore").field("key", &self.key).finish_non_exhaustive()
	}
}

impl SessionStore {
	pub fn new(storage: Arc<dyn Storage>) -> Self {
		Self::with_key(storage, REGISTRY_KEY)
	}

	pub fn with_key(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
		Self {
			storage,
			key: key.into(),
			lock: Arc::new(Mutex::new(())),
		}
	}

	/// Creates a store over fresh [`MemoryStorage`]; not yet initialized.
	pub fn in_memory() -> Self {
		Self::new(Arc::new(MemoryStorage::new()))
	}

	/// Creates an empty registry unless one already exists.
	///
	/// Returns `true` when a new registry was written.
	pub fn init(&self) -> Result<bool> {
		let _guard = self.lock.lock();
		if self.load()?.is_some() {
			return Ok(false);
		}
		self.write(&RegistryFile::default())?;
		debug!(target = "wc.store", key = %self.key, "initialized session registry");
		Ok(true)
	}

	pub fn is_initialized(&self) -> Result<bool> {
		let _guard = self.lock.lock();
		Ok(self.load()?.is_some())
	}

	/// Inserts or replaces the record for `session.session_id`.
	pub fn save(&self, session: &Session) -> Result<bool> {
		let _guard = self.lock.lock();
		let Some(mut registry) = self.load()? else {
			debug!(target = "wc.store", session_id = %session.session_id, "registry not initialized; save skipped");
			return Ok(false);
		};

		let revision = registry.sessions.values().map(|s| s.revision).max().unwrap_or(0) + 1;
		registry.sessions.insert(
			session.session_id.clone(),
			StoredSession {
				session: session.clone(),
				revision,
			},
		);
		self.write(&registry)?;
		Ok(true)
	}

	/// Merges `patch` into an existing record; never creates one.
	pub fn update(&self, patch: &SessionPatch) -> Result<bool> {
		let _guard = self.lock.lock();
		let Some(mut registry) = self.load()? else {
			debug!(target = "wc.store", session_id = %patch.session_id, "registry not initialized; update skipped");
			return Ok(false);
		};

		let Some(stored) = registry.sessions.get_mut(&patch.session_id) else {
			warn!(target = "wc.store", session_id = %patch.session_id, "no stored session to update");
			return Ok(false);
		};
		stored.session.apply(patch);
		self.write(&registry)?;
		Ok(true)
	}

	/// Removes the record for `session_id`; returns whether one existed.
	pub fn delete(&self, session_id: &str) -> Result<bool> {
		let _guard = self.lock.lock();
		let Some(mut registry) = self.load()? else {
			return Ok(false);
		};
		if registry.sessions.remove(session_id).is_none() {
			return Ok(false);
		}
		self.write(&registry)?;
		Ok(true)
	}

	pub fn get(&self, session_id: &str) -> Result<Option<Session>> {
		let _guard = self.lock.lock();
		Ok(self
			.load()?
			.and_then(|mut registry| registry.sessions.remove(session_id))
			.map(|stored| stored.session))
	}

	/// Returns every stored session, most recently stored first.
	pub fn list_all(&self) -> Result<Vec<Session>> {
		let _guard = self.lock.lock();
		let Some(registry) = self.load()? else {
			return Ok(Vec::new());
		};

		let mut stored: Vec<StoredSession> = registry.sessions.into_values().collect();
		stored.sort_by(|a, b| b.revision.cmp(&a.revision).then_with(|| a.session.session_id.cmp(&b.session.session_id)));
		Ok(stored.into_iter().map(|s| s.session).collect())
	}

	/// Drops every record that is no longer live at `now_ms`.
	///
	/// Expired sessions are otherwise kept until explicitly purged.
	pub fn purge_expired(&self, now_ms: u64) -> Result<usize> {
		let _guard = self.lock.lock();
		let Some(mut registry) = self.load()? else {
			return Ok(0);
		};

		let before = registry.sessions.len();
		registry.sessions.retain(|_, stored| stored.session.is_live(now_ms));
		let removed = before - registry.sessions.len();
		if removed > 0 {
			self.write(&registry)?;
			debug!(target = "wc.store", removed, "purged expired sessions");
		}
		Ok(removed)
	}

	fn load(&self) -> Result<Option<RegistryFile>> {
		let Some(raw) = self.storage.get_item(&self.key)? else {
			return Ok(None);
		};
		let registry: RegistryFile = serde_json::from_str(&raw).map_err(|e| Error::Storage(format!("corrupt session registry: {e}")))?;
		if registry.schema != REGISTRY_SCHEMA_VERSION {
			return Err(Error::Storage(format!(
				"unsupported session registry schema {} (expected {})",
				registry.schema, REGISTRY_SCHEMA_VERSION
			)));
		}
		Ok(Some(registry))
	}

	fn write(&self, registry: &RegistryFile) -> Result<()> {
		let json = serde_json::to_string(registry)?;
		self.storage.set_item(&self.key, &json)
	}
}
