use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A registered participant.
///
/// A user may be known only by wallet address (wallet login), only by email
/// (passkey or email login), or by both once a wallet has been connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub nonce: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citizenship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default)]
    pub subsidized_operations: BTreeSet<String>,
    /// Argon2 PHC string for email/password accounts
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A blank user with the given id and timestamps
    pub fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            address: None,
            email: None,
            username: None,
            nonce: 0,
            citizenship: None,
            city: None,
            subsidized_operations: BTreeSet::new(),
            password_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The identifier used as the request principal: email if set, else address
    pub fn identifier(&self) -> String {
        self.email
            .clone()
            .or_else(|| self.address.clone())
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| self.id.clone())
    }

    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id.clone(),
            identifier: self.identifier(),
        }
    }
}

/// The authenticated caller of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: String,
    pub identifier: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_prefers_email() {
        let mut user = User::new("u1".into(), Utc::now());
        user.address = Some("0xabc".into());
        assert_eq!(user.identifier(), "0xabc");

        user.email = Some("a@b.c".into());
        assert_eq!(user.identifier(), "a@b.c");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let mut user = User::new("u1".into(), Utc::now());
        user.password_hash = Some("$argon2id$secret".into());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
    }
}
