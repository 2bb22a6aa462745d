//! HTTP server, application state and service wiring

pub mod cookies;
pub mod http;
mod services;

pub use http::{run, AppState, BoxBody};
pub use services::{Ports, Services};
