//! Proof of Peacemaking - expressions, acknowledgements and proofs
//!
//! A participant publishes an expression of peacemaking; others acknowledge
//! it; the two then consent, one step each, to a proof of the exchange.
//!
//! ## Services
//!
//! - **Auth**: wallet nonce signing (EIP-191), passkeys, email/password, sessions
//! - **Interaction**: expressions, acknowledgements and the proof state machine
//! - **Notifications**: persisted notifications with a live per-user feed
//! - **Statistics**: aggregate counts refreshed on writes
//! - **Conversations**: scheduled conversations backed by conferencing rooms

pub mod auth;
pub mod config;
pub mod conversation;
pub mod db;
pub mod domain;
pub mod interaction;
pub mod notifications;
pub mod ports;
pub mod routes;
pub mod server;
pub mod statistics;
pub mod store;
pub mod types;

pub use config::Args;
pub use types::{PeacemakingError, Result};
