//! External ports
//!
//! Collaborators the core consumes but does not own. Each port is a trait
//! with a production adapter; tests swap in deterministic fakes.

pub mod clock;
pub mod media;
pub mod random;
pub mod rooms;
pub mod signature;
pub mod webauthn;

pub use clock::{Clock, ManualClock, SystemClock};
pub use media::{MediaUrlValidator, StrictMediaValidator};
pub use random::{draw_nonce, session_token, OsRandom, RandomSource, NONCE_RANGE};
pub use rooms::{LiveKitRoomService, RoomService, UnconfiguredRoomService};
pub use signature::{challenge_for, Eip191Verifier, SignatureVerifier};
pub use webauthn::{
    AuthenticationStart, RegistrationStart, VerifiedAssertion, VerifiedCredential,
    WebauthnRsVerifier, WebauthnUser, WebauthnVerifier,
};
