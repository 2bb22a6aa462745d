//! Statistics snapshot tests over the in-memory stores

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;
use peacemaking::domain::{
    new_id, Acknowledgement, AcknowledgementStatus, ContentMap, Expression, ExpressionStatus,
    User, UNKNOWN_CITIZENSHIP,
};
use peacemaking::ports::{Clock, ManualClock};
use peacemaking::statistics::StatisticsService;
use peacemaking::store::{AcknowledgementStore, ExpressionStore, MemoryStore, UserStore};

struct Fixture {
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    stats: StatisticsService,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::default());
    let stats = StatisticsService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        clock.clone(),
    );
    Fixture { store, clock, stats }
}

impl Fixture {
    async fn user(&self, citizenship: Option<&str>) -> User {
        let mut user = User::new(new_id(), self.clock.now());
        user.citizenship = citizenship.map(str::to_string);
        UserStore::create(self.store.as_ref(), &user).await.unwrap();
        user
    }

    async fn expression(&self, creator: &User, content: &[(&str, &str)]) -> Expression {
        let now = self.clock.now();
        let expression = Expression {
            id: new_id(),
            creator_id: creator.id.clone(),
            content: content
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<ContentMap>(),
            hash: None,
            on_chain_id: None,
            status: ExpressionStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        ExpressionStore::insert(self.store.as_ref(), &expression).await.unwrap();
        expression
    }

    async fn acknowledge(&self, expression: &Expression, by: &User) {
        let now = self.clock.now();
        let acknowledgement = Acknowledgement {
            id: new_id(),
            expression_id: expression.id.clone(),
            acknowledger_id: by.id.clone(),
            content: ContentMap::from([("text".to_string(), "heard".to_string())]),
            hash: None,
            on_chain_id: None,
            status: AcknowledgementStatus::Active,
            created_at: now,
            updated_at: now,
        };
        AcknowledgementStore::insert(self.store.as_ref(), &acknowledgement)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_empty_platform_reports_zero() {
    let f = fixture();
    let latest = f.stats.latest().await.unwrap();
    assert_eq!(
        (latest.total_users, latest.total_expressions, latest.total_acknowledgements),
        (0, 0, 0)
    );

    // A refresh over empty stores is still a valid snapshot
    let snapshot = f.stats.update_stats().await.unwrap();
    assert!(!snapshot.id.is_empty());
    assert!(snapshot.citizenship_stats.is_empty());
    assert_eq!(f.stats.latest().await.unwrap(), snapshot);
}

#[tokio::test]
async fn test_counts_and_distributions() {
    let f = fixture();
    let selin = f.user(Some("TR")).await;
    let anon = f.user(None).await;

    let first = f.expression(&selin, &[("text", "I am sorry")]).await;
    f.expression(
        &selin,
        &[("text", "Photos from the reunion"), ("image", "https://cdn.example.org/a.png")],
    )
    .await;
    let third = f.expression(&anon, &[("audio", "uploads/voice-note.ogg")]).await;
    f.acknowledge(&first, &anon).await;
    f.acknowledge(&third, &selin).await;

    let snapshot = f.stats.update_stats().await.unwrap();
    assert_eq!(snapshot.total_users, 2);
    assert_eq!(snapshot.total_expressions, 3);
    assert_eq!(snapshot.total_acknowledgements, 2);
    assert_eq!(
        snapshot.citizenship_stats,
        BTreeMap::from([("TR".to_string(), 1), (UNKNOWN_CITIZENSHIP.to_string(), 1)])
    );
    assert_eq!(
        snapshot.media_stats,
        BTreeMap::from([
            ("audio".to_string(), 1),
            ("image".to_string(), 1),
            ("text".to_string(), 2),
        ])
    );
    assert_eq!(f.stats.latest().await.unwrap(), snapshot);
}

#[tokio::test]
async fn test_snapshots_are_appended() {
    let f = fixture();
    let before = f.stats.update_stats().await.unwrap();

    f.user(Some("IE")).await;
    f.clock.advance(Duration::minutes(1));
    let after = f.stats.update_stats().await.unwrap();

    assert_ne!(before.id, after.id);
    assert!(after.created_at > before.created_at);
    assert_eq!(f.stats.latest().await.unwrap().total_users, 1);
}

#[tokio::test]
async fn test_background_refresh() {
    let f = fixture();
    f.user(Some("FR")).await;

    f.stats.schedule_refresh().await.unwrap();
    let latest = f.stats.latest().await.unwrap();
    assert_eq!(latest.citizenship_stats.get("FR"), Some(&1));
}
