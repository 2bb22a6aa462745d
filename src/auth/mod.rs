//! Authentication for Proof of Peacemaking
//!
//! Provides:
//! - Opaque session tokens with purpose and expiry
//! - Wallet nonce/signature login and email/password accounts
//! - Passkey (WebAuthn) registration and login ceremonies
//! - Password hashing with Argon2

pub mod passkeys;
pub mod password;
pub mod service;
pub mod sessions;

pub use passkeys::PasskeyService;
pub use password::{hash_password, verify_password};
pub use service::{normalize_address, AuthOutcome, AuthService, VerifyOutcome};
pub use sessions::{spawn_sweep_task, SessionManager};
