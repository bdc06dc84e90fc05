//! Per-invocation state: resolved configuration and the session registry.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;
use wc::{AesGcmProvider, Capabilities, ClientConfig, FileStorage, HttpBridgeClient, Session, SessionStore, TransactionRelay, now_ms};

use crate::cli::Cli;

pub struct CommandContext {
	pub config: ClientConfig,
	pub store: SessionStore,
}

impl CommandContext {
	/// Loads the config file, then applies command-line overrides.
	pub fn from_cli(cli: &Cli) -> Result<Self> {
		let mut config = ClientConfig::load(cli.config.as_deref())?;
		if let Some(bridge) = &cli.bridge {
			config.bridge_url.clone_from(bridge);
		}
		if let Some(name) = &cli.dapp_name {
			config.dapp_name = Some(name.clone());
		}
		if let Some(dir) = &cli.store_dir {
			config.store_dir = Some(dir.clone());
		}
		Self::new(config)
	}

	pub fn new(config: ClientConfig) -> Result<Self> {
		let dir = config.store_dir()?;
		debug!(target = "wc.cli", store = %dir.display(), bridge = %config.bridge_url, "resolved context");
		let store = SessionStore::new(Arc::new(FileStorage::new(dir)));
		Ok(Self { config, store })
	}

	pub fn capabilities(&self) -> Result<Capabilities> {
		Ok(Capabilities::new(Arc::new(AesGcmProvider), Arc::new(HttpBridgeClient::new()?)))
	}

	/// Most recently stored session that is live and wallet-approved.
	pub fn active_session(&self) -> Result<Option<Session>> {
		let now = now_ms();
		Ok(self.store.list_all()?.into_iter().find(|s| s.is_live(now) && s.is_approved()))
	}

	/// Relay bound to [`Self::active_session`]; submitting fails without one.
	pub fn relay(&self) -> Result<TransactionRelay> {
		let capabilities = self.capabilities()?;
		Ok(TransactionRelay::new(self.active_session()?, capabilities.crypto, capabilities.bridge))
	}
}
