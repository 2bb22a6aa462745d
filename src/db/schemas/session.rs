//! Session Schema
//!
//! Auth sessions live 24 hours, ceremony sessions 5 minutes. The TTL index
//! lets MongoDB reap expired sessions on its own; reads still check expiry
//! because the reaper runs only once a minute.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{bson_time, decode_bytes, encode_bytes};
use crate::db::mongo::IntoIndexes;
use crate::domain::{Session, SessionPurpose};
use crate::types::{PeacemakingError, Result};

/// Collection name for sessions
pub const SESSION_COLLECTION: &str = "sessions";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Opaque bearer token
    pub token: String,

    pub user_id: String,

    /// auth, registration-ceremony or authentication-ceremony
    pub purpose: String,

    /// Base64url ceremony state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceremony: Option<String>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub expires_at: DateTime,
}

impl SessionDoc {
    pub fn from_domain(session: &Session) -> Self {
        Self {
            id: None,
            token: session.token.clone(),
            user_id: session.user_id.clone(),
            purpose: session.purpose.as_str().to_string(),
            ceremony: session.ceremony.as_deref().map(encode_bytes),
            created_at: bson_time(session.created_at),
            updated_at: bson_time(session.updated_at),
            expires_at: bson_time(session.expires_at),
        }
    }

    pub fn into_domain(self) -> Result<Session> {
        let purpose = SessionPurpose::parse(&self.purpose).ok_or_else(|| {
            PeacemakingError::Internal(format!("unknown session purpose: {}", self.purpose))
        })?;
        let ceremony = self.ceremony.as_deref().map(decode_bytes).transpose()?;
        Ok(Session {
            token: self.token,
            user_id: self.user_id,
            purpose,
            ceremony,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
            expires_at: self.expires_at.to_chrono(),
        })
    }
}

impl IntoIndexes for SessionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "token": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("token_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "expiresAt": 1 },
                Some(
                    IndexOptions::builder()
                        .expire_after(std::time::Duration::from_secs(0))
                        .name("expires_at_ttl".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "userId": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_ceremony_survives_doc_roundtrip() {
        let now = Utc::now();
        let session = Session {
            token: "tok".into(),
            user_id: "u".into(),
            purpose: SessionPurpose::RegistrationCeremony,
            ceremony: Some(vec![1, 2, 3, 250]),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::seconds(300),
        };
        let doc = SessionDoc::from_domain(&session);
        assert_eq!(doc.purpose, "registration-ceremony");

        let back = doc.into_domain().unwrap();
        assert_eq!(back.ceremony, session.ceremony);
        assert_eq!(back.purpose, session.purpose);
    }
}
