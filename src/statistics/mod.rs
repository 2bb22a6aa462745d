//! Platform statistics
//!
//! Snapshots are recomputed from the stores and appended; readers always see
//! the most recent one. Refreshes are advisory and never fail a write.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{new_id, StatisticsSnapshot};
use crate::ports::Clock;
use crate::store::{AcknowledgementStore, ExpressionStore, StatisticsStore, UserStore};
use crate::types::Result;

#[derive(Clone)]
pub struct StatisticsService {
    users: Arc<dyn UserStore>,
    expressions: Arc<dyn ExpressionStore>,
    acknowledgements: Arc<dyn AcknowledgementStore>,
    snapshots: Arc<dyn StatisticsStore>,
    clock: Arc<dyn Clock>,
}

impl StatisticsService {
    pub fn new(
        users: Arc<dyn UserStore>,
        expressions: Arc<dyn ExpressionStore>,
        acknowledgements: Arc<dyn AcknowledgementStore>,
        snapshots: Arc<dyn StatisticsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            expressions,
            acknowledgements,
            snapshots,
            clock,
        }
    }

    /// Recompute every counter and append a new snapshot
    pub async fn update_stats(&self) -> Result<StatisticsSnapshot> {
        let snapshot = StatisticsSnapshot {
            id: new_id(),
            total_users: self.users.total_count().await?,
            total_expressions: self.expressions.count().await?,
            total_acknowledgements: self.acknowledgements.count().await?,
            citizenship_stats: self.users.citizenship_distribution().await?,
            media_stats: self.expressions.media_distribution().await?,
            created_at: self.clock.now(),
        };
        self.snapshots.append(&snapshot).await?;

        debug!(
            users = snapshot.total_users,
            expressions = snapshot.total_expressions,
            acknowledgements = snapshot.total_acknowledgements,
            "Statistics snapshot recorded"
        );
        Ok(snapshot)
    }

    /// The newest snapshot, or a zero snapshot before the first refresh
    pub async fn latest(&self) -> Result<StatisticsSnapshot> {
        Ok(self
            .snapshots
            .latest()
            .await?
            .unwrap_or_else(|| StatisticsSnapshot::zero(self.clock.now())))
    }

    /// Refresh in the background; failures are only logged
    pub fn schedule_refresh(&self) -> tokio::task::JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.update_stats().await {
                warn!(error = %e, "Statistics refresh failed");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Expression, ExpressionStatus, User};
    use crate::ports::ManualClock;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn service(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> StatisticsService {
        StatisticsService::new(store.clone(), store.clone(), store.clone(), store, clock)
    }

    #[tokio::test]
    async fn test_zero_snapshot_before_first_refresh() {
        let stats = service(Arc::new(MemoryStore::new()), Arc::new(ManualClock::default()));
        let latest = stats.latest().await.unwrap();
        assert_eq!(latest.total_users, 0);
        assert!(latest.citizenship_stats.is_empty());
        assert!(latest.media_stats.is_empty());
    }

    #[tokio::test]
    async fn test_latest_is_newest() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let stats = service(store.clone(), clock.clone());

        stats.update_stats().await.unwrap();
        let now = clock.now();
        let mut user = User::new(new_id(), now);
        user.citizenship = Some("NO".into());
        UserStore::create(store.as_ref(), &user).await.unwrap();
        ExpressionStore::insert(
            store.as_ref(),
            &Expression {
                id: new_id(),
                creator_id: user.id.clone(),
                content: BTreeMap::from([("image".to_string(), "https://x.org/a.png".to_string())]),
                hash: None,
                on_chain_id: None,
                status: ExpressionStatus::Draft,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        clock.advance(Duration::seconds(5));
        stats.update_stats().await.unwrap();

        let latest = stats.latest().await.unwrap();
        assert_eq!(latest.total_users, 1);
        assert_eq!(latest.total_expressions, 1);
        assert_eq!(latest.citizenship_stats.get("NO"), Some(&1));
        assert_eq!(latest.media_stats.get("image"), Some(&1));
    }
}
