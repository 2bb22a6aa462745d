use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ProofRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

/// Consent negotiation for minting a proof of an expression/acknowledgement pair.
///
/// The initiator is the expression creator and the peer is the acknowledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub id: String,
    pub expression_id: String,
    pub acknowledgement_id: String,
    pub initiator_id: String,
    pub peer_id: String,
    pub status: ProofRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProofRequest {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.initiator_id == user_id || self.peer_id == user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofTokenStatus {
    Accepted,
    Minted,
}

impl ProofTokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Minted => "minted",
        }
    }
}

/// The artifact produced by an accepted proof request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofToken {
    pub id: String,
    pub request_id: String,
    /// Numeric token id assigned on chain, set when minted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<i64>,
    pub expression_id: String,
    pub acknowledgement_id: String,
    pub creator_id: String,
    pub acknowledger_id: String,
    pub content_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain_hash: Option<String>,
    pub status: ProofTokenStatus,
    pub created_at: DateTime<Utc>,
    pub minted_at: Option<DateTime<Utc>>,
}
