//! Shared types for the Proof of Peacemaking server

pub mod error;

pub use error::{PeacemakingError, Result};
