//! Per-user notifications
//!
//! Notifications are persisted first and then offered to every live
//! subscriber of the recipient. Live delivery is best effort; the stored
//! list is authoritative.

pub mod bus;

pub use bus::{NotificationBus, NotificationStream, SUBSCRIBER_BUFFER};
