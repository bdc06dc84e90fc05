//! wc: dapp-side client for pairing with wallets over an encrypted relay bridge.
//!
//! The dapp and the wallet never talk directly. Both exchange AES-GCM
//! envelopes through a bridge server keyed by session id:
//!
//! - [`SessionManager`] resumes a stored live session or negotiates a new
//!   one and produces the pairing payload (and QR code) for the wallet.
//! - [`TransactionRelay`] encrypts requests, submits them, and reads the
//!   wallet's answers.
//! - [`StatusPoller`] repeatedly fetches a status until a result arrives,
//!   the timeout elapses, or the caller cancels.
//! - [`SessionStore`] persists sessions under a single registry key on an
//!   injected [`Storage`] backend.

pub mod bridge;
mod channel;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fake_bridge;
pub mod poller;
pub mod qr;
pub mod relay;
pub mod session;
pub mod storage;
pub mod store;

pub use bridge::{BridgeClient, HttpBridgeClient};
pub use config::{ClientConfig, DEFAULT_BRIDGE_URL};
pub use crypto::{AesGcmProvider, CryptoProvider};
pub use error::{Error, Result};
pub use poller::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, PollHandle, PollState, StatusPoller};
pub use qr::{QrRenderer, SvgDataUrlRenderer, TerminalQrRenderer};
pub use relay::TransactionRelay;
pub use session::{Capabilities, Pairing, PairingOutcome, SessionManager, SessionOptions, SessionStatus, now_ms};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{REGISTRY_KEY, SessionStore};
pub use wc_protocol as protocol;
pub use wc_protocol::{Session, SessionPatch, SharedKey};
