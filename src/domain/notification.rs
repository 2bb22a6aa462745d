use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationType {
    NewAcknowledgement,
    ProofRequestReceived,
    ProofRequestAccepted,
    ProofRequestRejected,
    NftMinted,
    ExpressionConfirmed,
    AcknowledgementConfirmed,
    ConversationCreated,
    ConversationStarted,
    ConversationEnded,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewAcknowledgement => "new-acknowledgement",
            Self::ProofRequestReceived => "proof-request-received",
            Self::ProofRequestAccepted => "proof-request-accepted",
            Self::ProofRequestRejected => "proof-request-rejected",
            Self::NftMinted => "nft-minted",
            Self::ExpressionConfirmed => "expression-confirmed",
            Self::AcknowledgementConfirmed => "acknowledgement-confirmed",
            Self::ConversationCreated => "conversation-created",
            Self::ConversationStarted => "conversation-started",
            Self::ConversationEnded => "conversation-ended",
        }
    }
}

/// An event addressed to one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: impl Into<String>,
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: super::new_id(),
            user_id: user_id.into(),
            kind,
            title: title.into(),
            message: message.into(),
            data: BTreeMap::new(),
            created_at,
        }
    }

    /// Attach a data entry
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

/// Per-user read state of a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotification {
    pub user_id: String,
    pub notification_id: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

/// A notification joined with its read state, as listed to the recipient
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_wire_names() {
        let json = serde_json::to_string(&NotificationType::ProofRequestReceived).unwrap();
        assert_eq!(json, "\"proof-request-received\"");
        assert_eq!(NotificationType::NftMinted.as_str(), "nft-minted");
    }

    #[test]
    fn test_notification_json_shape() {
        let n = Notification::new("u1", NotificationType::NewAcknowledgement, "t", "m", Utc::now())
            .with("expressionId", "e1");
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["type"], "new-acknowledgement");
        assert_eq!(v["userId"], "u1");
        assert_eq!(v["data"]["expressionId"], "e1");
    }
}
