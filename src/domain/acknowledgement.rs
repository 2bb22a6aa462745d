use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContentMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcknowledgementStatus {
    Active,
    Refuted,
}

impl AcknowledgementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Refuted => "refuted",
        }
    }
}

/// A response from one user to another user's expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
    pub id: String,
    pub expression_id: String,
    pub acknowledger_id: String,
    pub content: ContentMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain_id: Option<i64>,
    pub status: AcknowledgementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
