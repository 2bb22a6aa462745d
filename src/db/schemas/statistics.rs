//! Statistics Schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{bson_time, oid};
use crate::db::mongo::IntoIndexes;
use crate::domain::StatisticsSnapshot;
use crate::types::Result;

pub const STATISTICS_COLLECTION: &str = "statistics";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub total_users: i64,
    pub total_expressions: i64,
    pub total_acknowledgements: i64,
    #[serde(default)]
    pub citizenship_stats: BTreeMap<String, i64>,
    #[serde(default)]
    pub media_stats: BTreeMap<String, i64>,
    pub created_at: DateTime,
}

impl StatisticsDoc {
    pub fn from_domain(s: &StatisticsSnapshot) -> Result<Self> {
        Ok(Self {
            id: oid(&s.id)?,
            total_users: s.total_users,
            total_expressions: s.total_expressions,
            total_acknowledgements: s.total_acknowledgements,
            citizenship_stats: s.citizenship_stats.clone(),
            media_stats: s.media_stats.clone(),
            created_at: bson_time(s.created_at),
        })
    }

    pub fn into_domain(self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            id: self.id.to_hex(),
            total_users: self.total_users,
            total_expressions: self.total_expressions,
            total_acknowledgements: self.total_acknowledgements,
            citizenship_stats: self.citizenship_stats,
            media_stats: self.media_stats,
            created_at: self.created_at.to_chrono(),
        }
    }
}

impl IntoIndexes for StatisticsDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "createdAt": -1 },
            Some(
                IndexOptions::builder()
                    .name("created_at_desc".to_string())
                    .build(),
            ),
        )]
    }
}
