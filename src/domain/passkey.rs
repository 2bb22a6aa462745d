use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A WebAuthn credential registered by an authenticator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyCredential {
    pub id: String,
    /// Raw credential id as issued by the authenticator
    pub credential_id: Vec<u8>,
    /// Serialized public key material
    pub public_key: Vec<u8>,
    pub aaguid: Vec<u8>,
    pub sign_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Binding of a credential to its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPasskey {
    pub user_id: String,
    pub credential_id: Vec<u8>,
    pub name: String,
    pub device_info: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
