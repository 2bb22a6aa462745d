//! Notification Schemas
//!
//! Notification bodies and per-user read state are stored separately, the
//! read state carrying a copy of `createdAt` so listings sort without a join.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{bson_time, oid};
use crate::db::mongo::IntoIndexes;
use crate::domain::{Notification, NotificationType, NotificationView};
use crate::types::Result;

pub const NOTIFICATION_COLLECTION: &str = "notifications";
pub const USER_NOTIFICATION_COLLECTION: &str = "user_notifications";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime,
}

impl NotificationDoc {
    pub fn from_domain(n: &Notification) -> Result<Self> {
        Ok(Self {
            id: oid(&n.id)?,
            user_id: n.user_id.clone(),
            kind: n.kind,
            title: n.title.clone(),
            message: n.message.clone(),
            data: n.data.clone(),
            created_at: bson_time(n.created_at),
        })
    }

    pub fn into_domain(self) -> Notification {
        Notification {
            id: self.id.to_hex(),
            user_id: self.user_id,
            kind: self.kind,
            title: self.title,
            message: self.message,
            data: self.data,
            created_at: self.created_at.to_chrono(),
        }
    }
}

impl IntoIndexes for NotificationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "userId": 1, "createdAt": -1 },
            Some(
                IndexOptions::builder()
                    .name("user_created_at_index".to_string())
                    .build(),
            ),
        )]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotificationDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub notification_id: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub read_at: Option<DateTime>,
    pub created_at: DateTime,
}

impl UserNotificationDoc {
    pub fn unread(n: &Notification) -> Self {
        Self {
            id: None,
            user_id: n.user_id.clone(),
            notification_id: n.id.clone(),
            read: false,
            read_at: None,
            created_at: bson_time(n.created_at),
        }
    }

    /// Join with the notification body
    pub fn view(self, notification: Notification) -> NotificationView {
        NotificationView {
            notification,
            read: self.read,
            read_at: self.read_at.map(|t| t.to_chrono()),
        }
    }
}

impl IntoIndexes for UserNotificationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "userId": 1, "notificationId": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_notification_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "userId": 1, "read": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_read_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
