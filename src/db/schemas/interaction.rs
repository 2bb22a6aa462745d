//! Interaction Schemas
//!
//! Expressions, acknowledgements, proof requests and proof tokens. Status
//! fields are plain strings so conditional updates can filter on them.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{bson_time, oid};
use crate::db::mongo::IntoIndexes;
use crate::domain::{
    Acknowledgement, AcknowledgementStatus, ContentMap, Expression, ExpressionStatus,
    ProofRequest, ProofRequestStatus, ProofToken, ProofTokenStatus,
};
use crate::types::{PeacemakingError, Result};

pub const EXPRESSION_COLLECTION: &str = "expressions";
pub const ACKNOWLEDGEMENT_COLLECTION: &str = "acknowledgements";
pub const PROOF_REQUEST_COLLECTION: &str = "proof_requests";
pub const PROOF_TOKEN_COLLECTION: &str = "proof_tokens";

fn unknown_status(kind: &str, value: &str) -> PeacemakingError {
    PeacemakingError::Internal(format!("unknown {} status: {}", kind, value))
}

fn named(name: &str) -> Option<IndexOptions> {
    Some(IndexOptions::builder().name(name.to_string()).build())
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub creator_id: String,
    /// medium -> text or URL
    #[serde(default)]
    pub content: ContentMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain_id: Option<i64>,
    pub status: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl ExpressionDoc {
    pub fn from_domain(e: &Expression) -> Result<Self> {
        Ok(Self {
            id: oid(&e.id)?,
            creator_id: e.creator_id.clone(),
            content: e.content.clone(),
            hash: e.hash.clone(),
            on_chain_id: e.on_chain_id,
            status: e.status.as_str().to_string(),
            created_at: bson_time(e.created_at),
            updated_at: bson_time(e.updated_at),
        })
    }

    pub fn into_domain(self) -> Result<Expression> {
        let status = match self.status.as_str() {
            "draft" => ExpressionStatus::Draft,
            "confirmed" => ExpressionStatus::Confirmed,
            other => return Err(unknown_status("expression", other)),
        };
        Ok(Expression {
            id: self.id.to_hex(),
            creator_id: self.creator_id,
            content: self.content,
            hash: self.hash,
            on_chain_id: self.on_chain_id,
            status,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        })
    }
}

impl IntoIndexes for ExpressionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (doc! { "createdAt": -1 }, named("created_at_desc")),
            (doc! { "creatorId": 1 }, named("creator_id_index")),
        ]
    }
}

// =============================================================================
// Acknowledgements
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgementDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub expression_id: String,
    pub acknowledger_id: String,
    #[serde(default)]
    pub content: ContentMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain_id: Option<i64>,
    pub status: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl AcknowledgementDoc {
    pub fn from_domain(a: &Acknowledgement) -> Result<Self> {
        Ok(Self {
            id: oid(&a.id)?,
            expression_id: a.expression_id.clone(),
            acknowledger_id: a.acknowledger_id.clone(),
            content: a.content.clone(),
            hash: a.hash.clone(),
            on_chain_id: a.on_chain_id,
            status: a.status.as_str().to_string(),
            created_at: bson_time(a.created_at),
            updated_at: bson_time(a.updated_at),
        })
    }

    pub fn into_domain(self) -> Result<Acknowledgement> {
        let status = match self.status.as_str() {
            "active" => AcknowledgementStatus::Active,
            "refuted" => AcknowledgementStatus::Refuted,
            other => return Err(unknown_status("acknowledgement", other)),
        };
        Ok(Acknowledgement {
            id: self.id.to_hex(),
            expression_id: self.expression_id,
            acknowledger_id: self.acknowledger_id,
            content: self.content,
            hash: self.hash,
            on_chain_id: self.on_chain_id,
            status,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        })
    }
}

impl IntoIndexes for AcknowledgementDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "expressionId": 1, "acknowledgerId": 1 },
            named("expression_acknowledger_index"),
        )]
    }
}

// =============================================================================
// Proof requests
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequestDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub expression_id: String,
    pub acknowledgement_id: String,
    pub initiator_id: String,
    pub peer_id: String,
    /// pending, accepted or rejected
    pub status: String,
    /// `<expressionId>:<peerId>` while pending or accepted, unset once rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_pair: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Key shared by every request for one expression and peer
pub fn open_pair_key(expression_id: &str, peer_id: &str) -> String {
    format!("{}:{}", expression_id, peer_id)
}

impl ProofRequestDoc {
    pub fn from_domain(r: &ProofRequest) -> Result<Self> {
        Ok(Self {
            id: oid(&r.id)?,
            expression_id: r.expression_id.clone(),
            acknowledgement_id: r.acknowledgement_id.clone(),
            initiator_id: r.initiator_id.clone(),
            peer_id: r.peer_id.clone(),
            status: r.status.as_str().to_string(),
            open_pair: (r.status != ProofRequestStatus::Rejected)
                .then(|| open_pair_key(&r.expression_id, &r.peer_id)),
            created_at: bson_time(r.created_at),
            updated_at: bson_time(r.updated_at),
        })
    }

    pub fn into_domain(self) -> Result<ProofRequest> {
        let status = match self.status.as_str() {
            "pending" => ProofRequestStatus::Pending,
            "accepted" => ProofRequestStatus::Accepted,
            "rejected" => ProofRequestStatus::Rejected,
            other => return Err(unknown_status("proof request", other)),
        };
        Ok(ProofRequest {
            id: self.id.to_hex(),
            expression_id: self.expression_id,
            acknowledgement_id: self.acknowledgement_id,
            initiator_id: self.initiator_id,
            peer_id: self.peer_id,
            status,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        })
    }
}

impl IntoIndexes for ProofRequestDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one pending or accepted request per expression and peer
            (
                doc! { "openPair": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(doc! { "openPair": { "$exists": true } })
                        .name("open_pair_unique".to_string())
                        .build(),
                ),
            ),
            (doc! { "expressionId": 1, "peerId": 1 }, named("expression_peer_index")),
            (doc! { "initiatorId": 1 }, named("initiator_id_index")),
            (doc! { "peerId": 1 }, named("peer_id_index")),
        ]
    }
}

// =============================================================================
// Proof tokens
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofTokenDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<i64>,
    pub expression_id: String,
    pub acknowledgement_id: String,
    pub creator_id: String,
    pub acknowledger_id: String,
    pub content_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain_hash: Option<String>,
    /// accepted or minted
    pub status: String,
    pub created_at: DateTime,
    #[serde(default)]
    pub minted_at: Option<DateTime>,
}

impl ProofTokenDoc {
    pub fn from_domain(t: &ProofToken) -> Result<Self> {
        Ok(Self {
            id: oid(&t.id)?,
            request_id: t.request_id.clone(),
            token_id: t.token_id,
            expression_id: t.expression_id.clone(),
            acknowledgement_id: t.acknowledgement_id.clone(),
            creator_id: t.creator_id.clone(),
            acknowledger_id: t.acknowledger_id.clone(),
            content_hash: t.content_hash.clone(),
            on_chain_hash: t.on_chain_hash.clone(),
            status: t.status.as_str().to_string(),
            created_at: bson_time(t.created_at),
            minted_at: t.minted_at.map(bson_time),
        })
    }

    pub fn into_domain(self) -> Result<ProofToken> {
        let status = match self.status.as_str() {
            "accepted" => ProofTokenStatus::Accepted,
            "minted" => ProofTokenStatus::Minted,
            other => return Err(unknown_status("proof token", other)),
        };
        Ok(ProofToken {
            id: self.id.to_hex(),
            request_id: self.request_id,
            token_id: self.token_id,
            expression_id: self.expression_id,
            acknowledgement_id: self.acknowledgement_id,
            creator_id: self.creator_id,
            acknowledger_id: self.acknowledger_id,
            content_hash: self.content_hash,
            on_chain_hash: self.on_chain_hash,
            status,
            created_at: self.created_at.to_chrono(),
            minted_at: self.minted_at.map(|t| t.to_chrono()),
        })
    }
}

impl IntoIndexes for ProofTokenDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One token per accepted request
            (
                doc! { "requestId": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("request_id_unique".to_string())
                        .build(),
                ),
            ),
            (doc! { "creatorId": 1 }, named("creator_id_index")),
            (doc! { "acknowledgerId": 1 }, named("acknowledger_id_index")),
        ]
    }
}
