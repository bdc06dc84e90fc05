//! Wire types for the dapp/bridge pairing protocol.
//!
//! This crate contains the serde-serializable types exchanged with the relay
//! server ("bridge"), persisted in the local session registry, and encoded
//! into the pairing payload that a wallet scans. These types represent the
//! "protocol layer" - the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * camelCase on the wire: wallets parse these field names directly
//! * Stable: Changes only when the wire protocol changes
//!
//! The protocol engine built on top of these types lives in `wc-rs`.

pub mod bridge;
pub mod key;
pub mod session;

pub use bridge::*;
pub use key::*;
pub use session::*;
