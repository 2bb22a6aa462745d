use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Citizenship bucket for users that have not declared one
pub const UNKNOWN_CITIZENSHIP: &str = "UNKNOWN";

/// Point-in-time platform counters. Snapshots are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub id: String,
    pub total_users: i64,
    pub total_expressions: i64,
    pub total_acknowledgements: i64,
    pub citizenship_stats: BTreeMap<String, i64>,
    pub media_stats: BTreeMap<String, i64>,
    pub created_at: DateTime<Utc>,
}

impl StatisticsSnapshot {
    /// The snapshot reported before any has been recorded
    pub fn zero(now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            total_users: 0,
            total_expressions: 0,
            total_acknowledgements: 0,
            citizenship_stats: BTreeMap::new(),
            media_stats: BTreeMap::new(),
            created_at: now,
        }
    }
}
