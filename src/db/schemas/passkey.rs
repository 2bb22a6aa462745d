//! Passkey Schemas
//!
//! Credentials and their user bindings are kept in separate collections so a
//! credential can be deactivated without losing its sign-count history.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{bson_time, decode_bytes, encode_bytes, oid};
use crate::db::mongo::IntoIndexes;
use crate::domain::{PasskeyCredential, UserPasskey};
use crate::types::Result;

pub const PASSKEY_CREDENTIAL_COLLECTION: &str = "passkey_credentials";
pub const USER_PASSKEY_COLLECTION: &str = "user_passkeys";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyCredentialDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    /// Base64url raw credential id
    pub credential_id: String,

    /// Base64url public key material
    pub public_key: String,

    #[serde(default)]
    pub aaguid: String,

    #[serde(default)]
    pub sign_count: i64,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl PasskeyCredentialDoc {
    pub fn from_domain(credential: &PasskeyCredential) -> Result<Self> {
        Ok(Self {
            id: oid(&credential.id)?,
            credential_id: encode_bytes(&credential.credential_id),
            public_key: encode_bytes(&credential.public_key),
            aaguid: encode_bytes(&credential.aaguid),
            sign_count: credential.sign_count as i64,
            created_at: bson_time(credential.created_at),
            updated_at: bson_time(credential.updated_at),
        })
    }

    pub fn into_domain(self) -> Result<PasskeyCredential> {
        Ok(PasskeyCredential {
            id: self.id.to_hex(),
            credential_id: decode_bytes(&self.credential_id)?,
            public_key: decode_bytes(&self.public_key)?,
            aaguid: decode_bytes(&self.aaguid)?,
            sign_count: self.sign_count.clamp(0, u32::MAX as i64) as u32,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        })
    }
}

impl IntoIndexes for PasskeyCredentialDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "credentialId": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("credential_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPasskeyDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub user_id: String,

    /// Base64url raw credential id
    pub credential_id: String,

    /// Human label, e.g. "MacBook Touch ID"
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub device_info: String,

    #[serde(default)]
    pub active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime>,

    pub created_at: DateTime,
}

impl UserPasskeyDoc {
    pub fn from_domain(binding: &UserPasskey) -> Self {
        Self {
            id: None,
            user_id: binding.user_id.clone(),
            credential_id: encode_bytes(&binding.credential_id),
            name: binding.name.clone(),
            device_info: binding.device_info.clone(),
            active: binding.active,
            last_used_at: binding.last_used_at.map(bson_time),
            created_at: bson_time(binding.created_at),
        }
    }

    pub fn into_domain(self) -> Result<UserPasskey> {
        Ok(UserPasskey {
            user_id: self.user_id,
            credential_id: decode_bytes(&self.credential_id)?,
            name: self.name,
            device_info: self.device_info,
            active: self.active,
            last_used_at: self.last_used_at.map(|t| t.to_chrono()),
            created_at: self.created_at.to_chrono(),
        })
    }
}

impl IntoIndexes for UserPasskeyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "credentialId": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("credential_id_unique".to_string())
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
