//! Domain entities
//!
//! Plain data carried between the services, the stores and the HTTP layer.
//! Identifiers are opaque strings; stores never rely on their structure.

mod acknowledgement;
mod conversation;
mod expression;
mod notification;
mod passkey;
mod proof;
mod session;
mod statistics;
mod user;

pub use acknowledgement::{Acknowledgement, AcknowledgementStatus};
pub use conversation::{Conversation, ConversationStatus, NewConversation};
pub use expression::{validate_content, ContentMap, Expression, ExpressionStatus, Medium};
pub use notification::{Notification, NotificationType, NotificationView, UserNotification};
pub use passkey::{PasskeyCredential, UserPasskey};
pub use proof::{ProofRequest, ProofRequestStatus, ProofToken, ProofTokenStatus};
pub use session::{
    Session, SessionPurpose, AUTH_SESSION_TTL_SECS, CEREMONY_SESSION_TTL_SECS,
};
pub use statistics::{StatisticsSnapshot, UNKNOWN_CITIZENSHIP};
pub use user::{Principal, User};

/// Generate a new opaque identifier (24 hex characters)
pub fn new_id() -> String {
    bson::oid::ObjectId::new().to_hex()
}
