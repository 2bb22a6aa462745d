//! Scheduled conversations
//!
//! A conversation owns one conferencing room named `conversation-<id>`. Only
//! its creator moves it from `scheduled` to `live` to `ended`; subscribers are
//! notified of each step.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{
    new_id, Conversation, ConversationStatus, NewConversation, Notification, NotificationType,
    Principal,
};
use crate::notifications::NotificationBus;
use crate::ports::{Clock, RoomService};
use crate::store::ConversationStore;
use crate::types::{PeacemakingError, Result};

/// Seconds an empty room stays open
pub const ROOM_EMPTY_TIMEOUT_SECS: u32 = 300;
pub const ROOM_MAX_PARTICIPANTS: u32 = 100;

/// Credentials for joining a conversation's room
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinToken {
    pub token: String,
    pub room_name: String,
    pub can_publish: bool,
}

pub struct ConversationService {
    conversations: Arc<dyn ConversationStore>,
    rooms: Arc<dyn RoomService>,
    bus: Arc<NotificationBus>,
    clock: Arc<dyn Clock>,
}

impl ConversationService {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        rooms: Arc<dyn RoomService>,
        bus: Arc<NotificationBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            conversations,
            rooms,
            bus,
            clock,
        }
    }

    async fn notify(&self, notification: Notification) {
        let user_id = notification.user_id.clone();
        if let Err(e) = self.bus.publish(notification).await {
            warn!(user_id = %user_id, error = %e, "Conversation notification not delivered");
        }
    }

    async fn notify_subscribers(
        &self,
        conversation: &Conversation,
        kind: NotificationType,
        title: &str,
        message: &str,
    ) {
        let now = self.clock.now();
        for subscriber in &conversation.subscribers {
            self.notify(
                Notification::new(subscriber, kind, title, message, now)
                    .with("conversationId", conversation.id.clone())
                    .with("title", conversation.title.clone()),
            )
            .await;
        }
    }

    pub async fn create(&self, principal: &Principal, input: NewConversation) -> Result<Conversation> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(PeacemakingError::BadRequest("title is required".into()));
        }

        let id = new_id();
        let room_name = format!("conversation-{}", id);
        self.rooms
            .create_room(&room_name, ROOM_EMPTY_TIMEOUT_SECS, ROOM_MAX_PARTICIPANTS)
            .await?;

        let now = self.clock.now();
        let conversation = Conversation {
            id,
            title,
            description: input.description,
            image_url: input.image_url,
            creator_id: principal.user_id.clone(),
            status: ConversationStatus::Scheduled,
            start_time: input.start_time,
            end_time: None,
            tags: input.tags,
            room_name,
            subscribers: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        };
        self.conversations.insert(&conversation).await?;
        info!(user_id = %principal.user_id, conversation_id = %conversation.id, "Conversation scheduled");

        self.notify(
            Notification::new(
                &principal.user_id,
                NotificationType::ConversationCreated,
                "Conversation scheduled",
                format!("\"{}\" has been scheduled", conversation.title),
                now,
            )
            .with("conversationId", conversation.id.clone()),
        )
        .await;

        Ok(conversation)
    }

    pub async fn get(&self, id: &str) -> Result<Conversation> {
        self.conversations
            .get(id)
            .await?
            .ok_or_else(|| PeacemakingError::NotFound(format!("conversation {}", id)))
    }

    pub async fn list(&self, status: Option<ConversationStatus>) -> Result<Vec<Conversation>> {
        self.conversations.list(status).await
    }

    async fn transition(
        &self,
        principal: &Principal,
        id: &str,
        from: ConversationStatus,
        to: ConversationStatus,
    ) -> Result<Conversation> {
        let conversation = self.get(id).await?;
        if conversation.creator_id != principal.user_id {
            return Err(PeacemakingError::Forbidden(
                "only the creator can change a conversation's status".into(),
            ));
        }

        if !self
            .conversations
            .transition(id, from, to, self.clock.now())
            .await?
        {
            return Err(PeacemakingError::Conflict(format!(
                "conversation is not {}",
                from.as_str()
            )));
        }
        info!(conversation_id = %id, status = to.as_str(), "Conversation status changed");
        self.get(id).await
    }

    /// `scheduled -> live`
    pub async fn start(&self, principal: &Principal, id: &str) -> Result<Conversation> {
        let conversation = self
            .transition(
                principal,
                id,
                ConversationStatus::Scheduled,
                ConversationStatus::Live,
            )
            .await?;
        self.notify_subscribers(
            &conversation,
            NotificationType::ConversationStarted,
            "Conversation started",
            "A conversation you follow is live",
        )
        .await;
        Ok(conversation)
    }

    /// `live -> ended`
    pub async fn end(&self, principal: &Principal, id: &str) -> Result<Conversation> {
        let conversation = self
            .transition(
                principal,
                id,
                ConversationStatus::Live,
                ConversationStatus::Ended,
            )
            .await?;
        self.notify_subscribers(
            &conversation,
            NotificationType::ConversationEnded,
            "Conversation ended",
            "A conversation you follow has ended",
        )
        .await;
        Ok(conversation)
    }

    pub async fn subscribe(&self, principal: &Principal, id: &str) -> Result<Conversation> {
        self.conversations
            .add_subscriber(id, &principal.user_id)
            .await?;
        self.get(id).await
    }

    pub async fn unsubscribe(&self, principal: &Principal, id: &str) -> Result<Conversation> {
        self.conversations
            .remove_subscriber(id, &principal.user_id)
            .await?;
        self.get(id).await
    }

    /// Room credentials for the caller; only the creator may publish
    pub async fn join_token(&self, principal: &Principal, id: &str) -> Result<JoinToken> {
        let conversation = self.get(id).await?;
        if conversation.status == ConversationStatus::Ended {
            return Err(PeacemakingError::Conflict("conversation has ended".into()));
        }

        let can_publish = conversation.creator_id == principal.user_id;
        let token =
            self.rooms
                .issue_join_token(&principal.user_id, &conversation.room_name, can_publish)?;
        Ok(JoinToken {
            token,
            room_name: conversation.room_name,
            can_publish,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ManualClock;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRooms {
        created: Mutex<Vec<(String, u32, u32)>>,
    }

    #[async_trait]
    impl RoomService for RecordingRooms {
        async fn create_room(&self, name: &str, empty: u32, max: u32) -> Result<()> {
            self.created
                .lock()
                .unwrap()
                .push((name.to_string(), empty, max));
            Ok(())
        }

        fn issue_join_token(&self, identity: &str, room: &str, publish: bool) -> Result<String> {
            Ok(format!("{}:{}:{}", identity, room, publish))
        }
    }

    fn principal(id: &str) -> Principal {
        Principal {
            user_id: id.into(),
            identifier: id.into(),
        }
    }

    fn setup() -> (ConversationService, Arc<RecordingRooms>, Arc<NotificationBus>) {
        let store = Arc::new(MemoryStore::new());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let rooms = Arc::new(RecordingRooms::default());
        let bus = Arc::new(NotificationBus::new(store.clone(), clock.clone()));
        let service = ConversationService::new(store, rooms.clone(), bus.clone(), clock);
        (service, rooms, bus)
    }

    fn input(title: &str) -> NewConversation {
        NewConversation {
            title: title.into(),
            description: String::new(),
            image_url: None,
            start_time: chrono::Utc::now(),
            tags: vec!["reconciliation".into()],
        }
    }

    #[tokio::test]
    async fn test_create_opens_room() {
        let (service, rooms, bus) = setup();
        let conversation = service
            .create(&principal("host"), input("Listening circle"))
            .await
            .unwrap();

        assert_eq!(conversation.status, ConversationStatus::Scheduled);
        assert_eq!(conversation.room_name, format!("conversation-{}", conversation.id));
        assert_eq!(
            rooms.created.lock().unwrap().clone(),
            vec![(conversation.room_name.clone(), 300, 100)]
        );

        let notes = bus.list_for_user("host").await.unwrap();
        assert_eq!(notes[0].notification.kind, NotificationType::ConversationCreated);
    }

    #[tokio::test]
    async fn test_lifecycle_and_subscribers() {
        let (service, _, bus) = setup();
        let host = principal("host");
        let guest = principal("guest");
        let conversation = service.create(&host, input("Circle")).await.unwrap();

        service.subscribe(&guest, &conversation.id).await.unwrap();
        service.subscribe(&guest, &conversation.id).await.unwrap();
        assert_eq!(service.get(&conversation.id).await.unwrap().subscribers.len(), 1);

        assert!(matches!(
            service.start(&guest, &conversation.id).await,
            Err(PeacemakingError::Forbidden(_))
        ));
        assert!(matches!(
            service.end(&host, &conversation.id).await,
            Err(PeacemakingError::Conflict(_))
        ));

        let live = service.start(&host, &conversation.id).await.unwrap();
        assert_eq!(live.status, ConversationStatus::Live);

        let ended = service.end(&host, &conversation.id).await.unwrap();
        assert_eq!(ended.status, ConversationStatus::Ended);
        assert!(ended.end_time.is_some());

        let kinds: Vec<_> = bus
            .list_for_user("guest")
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.notification.kind)
            .collect();
        assert!(kinds.contains(&NotificationType::ConversationStarted));
        assert!(kinds.contains(&NotificationType::ConversationEnded));

        assert!(matches!(
            service.join_token(&guest, &conversation.id).await,
            Err(PeacemakingError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_only_creator_publishes() {
        let (service, _, _) = setup();
        let host = principal("host");
        let conversation = service.create(&host, input("Circle")).await.unwrap();

        let host_token = service.join_token(&host, &conversation.id).await.unwrap();
        assert!(host_token.can_publish);

        let guest_token = service
            .join_token(&principal("guest"), &conversation.id)
            .await
            .unwrap();
        assert!(!guest_token.can_publish);
        assert_eq!(
            guest_token.token,
            format!("guest:{}:false", conversation.room_name)
        );
    }
}
