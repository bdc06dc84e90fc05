//! HTTP client for the relay server's REST surface.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, header};
use tracing::debug;
use wc_protocol::{CreateSessionResponse, EncryptedBlob, NewTransactionRequest, NewTransactionResponse, paths};

use crate::error::{Error, Result};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Capability interface over the bridge endpoints used by the dapp.
///
/// Implementations are stateless: every call names the bridge it talks to,
/// since stored sessions may live on different bridges.
#[async_trait]
pub trait BridgeClient: Send + Sync {
	/// `POST {bridge_url}/session/new`.
	async fn create_session(&self, bridge_url: &str) -> Result<CreateSessionResponse>;

	/// `GET {bridge_url}{path}`; `Ok(None)` when the bridge has nothing yet.
	async fn fetch_blob(&self, bridge_url: &str, path: &str) -> Result<Option<EncryptedBlob>>;

	/// `POST {bridge_url}/session/{session_id}/transaction/new`.
	async fn submit_transaction(&self, bridge_url: &str, session_id: &str, request: &NewTransactionRequest) -> Result<NewTransactionResponse>;
}

/// [`BridgeClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpBridgeClient {
	client: reqwest::Client,
}

impl HttpBridgeClient {
	pub fn new() -> Result<Self> {
		Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
	}

	pub fn with_timeout(timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
		Ok(Self { client })
	}

	/// Wraps an existing client, e.g. one with custom TLS or proxy settings.
	pub fn from_client(client: reqwest::Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl BridgeClient for HttpBridgeClient {
	async fn create_session(&self, bridge_url: &str) -> Result<CreateSessionResponse> {
		let url = join_url(bridge_url, paths::NEW_SESSION);
		debug!(target = "wc.bridge", %url, "creating session");

		let response = self
			.client
			.post(&url)
			.header(header::ACCEPT, "application/json")
			.header(header::CONTENT_TYPE, "application/json")
			.send()
			.await?;
		let response = ensure_success(response).await?;
		Ok(response.json().await?)
	}

	async fn fetch_blob(&self, bridge_url: &str, path: &str) -> Result<Option<EncryptedBlob>> {
		let url = join_url(bridge_url, path);

		let response = self.client.get(&url).header(header::ACCEPT, "application/json").send().await?;
		if matches!(response.status(), StatusCode::NO_CONTENT | StatusCode::NOT_FOUND) {
			debug!(target = "wc.bridge", %url, status = response.status().as_u16(), "no data yet");
			return Ok(None);
		}

		let response = ensure_success(response).await?;
		let body = response.text().await?;
		if body.trim().is_empty() {
			return Ok(None);
		}
		Ok(Some(serde_json::from_str(&body)?))
	}

	async fn submit_transaction(&self, bridge_url: &str, session_id: &str, request: &NewTransactionRequest) -> Result<NewTransactionResponse> {
		let url = join_url(bridge_url, &paths::new_transaction(session_id));
		debug!(target = "wc.bridge", %url, "submitting transaction");

		let response = self
			.client
			.post(&url)
			.header(header::ACCEPT, "application/json")
			.json(request)
			.send()
			.await?;
		let response = ensure_success(response).await?;
		Ok(response.json().await?)
	}
}

/// Converts any non-2xx response into [`Error::Bridge`].
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}

	let body = response.text().await.unwrap_or_default();
	let message = if body.trim().is_empty() {
		status.canonical_reason().unwrap_or("unknown status").to_string()
	} else {
		body.trim().to_string()
	};
	Err(Error::Bridge {
		status: status.as_u16(),
		message,
	})
}

fn join_url(bridge_url: &str, path: &str) -> String {
	format!("{}{}", bridge_url.trim_end_matches('/'), path)
}
