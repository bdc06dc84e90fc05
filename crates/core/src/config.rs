//! Client configuration loaded from `<config dir>/wc/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::session::SessionOptions;

pub const DEFAULT_BRIDGE_URL: &str = "https://bridge.walletconnect.org";

/// Directory name under the platform config dir.
const APP_DIR: &str = "wc";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
	pub bridge_url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dapp_name: Option<String>,
	pub session_ttl_secs: u64,
	pub poll_interval_ms: u64,
	pub poll_timeout_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub store_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			bridge_url: DEFAULT_BRIDGE_URL.to_string(),
			dapp_name: None,
			session_ttl_secs: 86_400,
			poll_interval_ms: 1_000,
			poll_timeout_ms: 60_000,
			store_dir: None,
		}
	}
}

impl ClientConfig {
	/// `<config dir>/wc/config.json`, when the platform has a config dir.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
	}

	/// Loads the config at `path` (or the default path); defaults when the
	/// file does not exist.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let path = match path {
			Some(path) => path.to_path_buf(),
			None => match Self::default_path() {
				Some(path) => path,
				None => return Ok(Self::default()),
			},
		};

		let contents = match std::fs::read_to_string(&path) {
			Ok(contents) => contents,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				debug!(target = "wc.config", path = %path.display(), "no config file; using defaults");
				return Ok(Self::default());
			}
			Err(err) => return Err(err.into()),
		};
		let config = Self::from_json(&contents).map_err(|err| match err {
			Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
			other => other,
		})?;
		debug!(target = "wc.config", path = %path.display(), "loaded config");
		Ok(config)
	}

	pub fn from_json(json: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<()> {
		if self.bridge_url.trim().is_empty() {
			return Err(Error::Config("bridgeUrl must not be empty".to_string()));
		}
		if self.session_ttl_secs.checked_mul(1_000).is_none() {
			return Err(Error::Config(format!("sessionTtlSecs {} is too large", self.session_ttl_secs)));
		}
		if self.poll_interval_ms == 0 {
			return Err(Error::Config("pollIntervalMs must be greater than zero".to_string()));
		}
		Ok(())
	}

	/// Directory holding the session registry.
	pub fn store_dir(&self) -> Result<PathBuf> {
		if let Some(dir) = &self.store_dir {
			return Ok(dir.clone());
		}
		dirs::config_dir()
			.map(|dir| dir.join(APP_DIR))
			.ok_or_else(|| Error::Config("no platform config directory; set storeDir".to_string()))
	}

	pub fn session_ttl(&self) -> Duration {
		Duration::from_secs(self.session_ttl_secs)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn poll_timeout(&self) -> Duration {
		Duration::from_millis(self.poll_timeout_ms)
	}

	pub fn session_options(&self) -> SessionOptions {
		let mut options = SessionOptions::new(self.bridge_url.clone()).with_session_ttl(self.session_ttl());
		options.dapp_name.clone_from(&self.dapp_name);
		options
	}
}
