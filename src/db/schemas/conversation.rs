//! Conversation Schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{bson_time, oid};
use crate::db::mongo::IntoIndexes;
use crate::domain::{Conversation, ConversationStatus};
use crate::types::{PeacemakingError, Result};

pub const CONVERSATION_COLLECTION: &str = "conversations";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub creator_id: String,
    /// scheduled, live or ended
    pub status: String,
    pub start_time: DateTime,
    #[serde(default)]
    pub end_time: Option<DateTime>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub room_name: String,
    /// User ids to notify on start/end
    #[serde(default)]
    pub subscribers: Vec<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl ConversationDoc {
    pub fn from_domain(c: &Conversation) -> Result<Self> {
        Ok(Self {
            id: oid(&c.id)?,
            title: c.title.clone(),
            description: c.description.clone(),
            image_url: c.image_url.clone(),
            creator_id: c.creator_id.clone(),
            status: c.status.as_str().to_string(),
            start_time: bson_time(c.start_time),
            end_time: c.end_time.map(bson_time),
            tags: c.tags.clone(),
            room_name: c.room_name.clone(),
            subscribers: c.subscribers.iter().cloned().collect(),
            created_at: bson_time(c.created_at),
            updated_at: bson_time(c.updated_at),
        })
    }

    pub fn into_domain(self) -> Result<Conversation> {
        let status = ConversationStatus::parse(&self.status).ok_or_else(|| {
            PeacemakingError::Internal(format!("unknown conversation status: {}", self.status))
        })?;
        Ok(Conversation {
            id: self.id.to_hex(),
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            creator_id: self.creator_id,
            status,
            start_time: self.start_time.to_chrono(),
            end_time: self.end_time.map(|t| t.to_chrono()),
            tags: self.tags,
            room_name: self.room_name,
            subscribers: self.subscribers.into_iter().collect(),
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        })
    }
}

impl IntoIndexes for ConversationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "status": 1, "startTime": 1 },
            Some(
                IndexOptions::builder()
                    .name("status_start_time_index".to_string())
                    .build(),
            ),
        )]
    }
}
