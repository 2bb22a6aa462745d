//! Database schemas
//!
//! MongoDB document structures, their indexes, and conversions to and from
//! the domain types. Field names are camelCase on disk.

mod conversation;
mod interaction;
mod notification;
mod passkey;
mod session;
mod statistics;
mod user;

pub use conversation::{ConversationDoc, CONVERSATION_COLLECTION};
pub use interaction::{
    AcknowledgementDoc, ExpressionDoc, ProofRequestDoc, ProofTokenDoc, ACKNOWLEDGEMENT_COLLECTION,
    EXPRESSION_COLLECTION, PROOF_REQUEST_COLLECTION, PROOF_TOKEN_COLLECTION,
};
pub use notification::{
    NotificationDoc, UserNotificationDoc, NOTIFICATION_COLLECTION, USER_NOTIFICATION_COLLECTION,
};
pub use passkey::{
    PasskeyCredentialDoc, UserPasskeyDoc, PASSKEY_CREDENTIAL_COLLECTION, USER_PASSKEY_COLLECTION,
};
pub use session::{SessionDoc, SESSION_COLLECTION};
pub use statistics::{StatisticsDoc, STATISTICS_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use bson::oid::ObjectId;
use chrono::Utc;

use crate::types::{PeacemakingError, Result};

/// Parse an opaque id into an ObjectId
pub fn oid(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| PeacemakingError::BadRequest(format!("invalid id: {}", id)))
}

pub(crate) fn bson_time(dt: chrono::DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_chrono(dt)
}

/// Binary values are stored as unpadded base64url strings
pub(crate) fn encode_bytes(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn decode_bytes(value: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| PeacemakingError::Internal(format!("corrupt binary field: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_rejects_garbage() {
        assert!(oid("64b7f0c2a1e4d5f6a7b8c9d0").is_ok());
        assert!(matches!(oid("nope"), Err(PeacemakingError::BadRequest(_))));
    }

    #[test]
    fn test_bytes_encoding() {
        let raw = vec![0u8, 255, 17, 42];
        assert_eq!(decode_bytes(&encode_bytes(&raw)).unwrap(), raw);
    }
}
