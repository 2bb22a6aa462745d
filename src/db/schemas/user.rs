//! User Schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{bson_time, oid};
use crate::db::mongo::IntoIndexes;
use crate::domain::User;
use crate::types::Result;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    /// Lowercase wallet address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Current login nonce
    #[serde(default)]
    pub nonce: i64,

    /// ISO country code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citizenship: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default)]
    pub subsidized_operations: Vec<String>,

    /// Argon2 hash for email/password accounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl UserDoc {
    pub fn from_domain(user: &User) -> Result<Self> {
        Ok(Self {
            id: oid(&user.id)?,
            address: user.address.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            nonce: user.nonce,
            citizenship: user.citizenship.clone(),
            city: user.city.clone(),
            subsidized_operations: user.subsidized_operations.iter().cloned().collect(),
            password_hash: user.password_hash.clone(),
            created_at: bson_time(user.created_at),
            updated_at: bson_time(user.updated_at),
        })
    }

    pub fn into_domain(self) -> User {
        User {
            id: self.id.to_hex(),
            address: self.address,
            email: self.email,
            username: self.username,
            nonce: self.nonce,
            citizenship: self.citizenship,
            city: self.city,
            subsidized_operations: self.subsidized_operations.into_iter().collect(),
            password_hash: self.password_hash,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        }
    }
}

fn unique_sparse(field: &str) -> (Document, Option<IndexOptions>) {
    (
        doc! { field: 1 },
        Some(
            IndexOptions::builder()
                .unique(true)
                .sparse(true)
                .name(format!("{}_unique", field))
                .build(),
        ),
    )
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            unique_sparse("address"),
            unique_sparse("email"),
            unique_sparse("username"),
            // Grouping key for citizenship statistics
            (
                doc! { "citizenship": 1 },
                Some(
                    IndexOptions::builder()
                        .name("citizenship_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
