//! Persistence ports
//!
//! One trait per logical store, so that the services can run against MongoDB
//! in production and against the in-memory implementation in development and
//! tests. Status transitions are exposed as compare-and-set primitives: they
//! return `false` when the persisted state no longer matches `from`.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{
    Acknowledgement, AcknowledgementStatus, Conversation, ConversationStatus, Expression,
    Notification, NotificationView, PasskeyCredential, ProofRequest, ProofRequestStatus,
    ProofToken, Session, StatisticsSnapshot, User, UserPasskey,
};
use crate::types::Result;

pub use memory::MemoryStore;

/// Users and their unique identifiers
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when address, email or username belong to another user
    async fn create(&self, user: &User) -> Result<()>;
    async fn update(&self, user: &User) -> Result<()>;
    async fn get_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn get_by_address(&self, address: &str) -> Result<Option<User>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn update_nonce(&self, user_id: &str, nonce: i64) -> Result<()>;
    /// Replace the nonce only if it still equals `expected`
    async fn compare_and_set_nonce(&self, user_id: &str, expected: i64, nonce: i64)
        -> Result<bool>;
    async fn connect_wallet(&self, user_id: &str, address: &str) -> Result<()>;
    async fn delete(&self, user_id: &str) -> Result<()>;
    async fn total_count(&self) -> Result<i64>;
    /// Users per citizenship, undeclared ones counted as `UNKNOWN`
    async fn citizenship_distribution(&self) -> Result<BTreeMap<String, i64>>;
}

/// Opaque bearer tokens
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<()>;
    /// Raw lookup, expired sessions included
    async fn get(&self, token: &str) -> Result<Option<Session>>;
    async fn delete(&self, token: &str) -> Result<()>;
    /// Raw listing of a user's sessions, expired ones included
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>>;
    async fn delete_for_user(&self, user_id: &str) -> Result<u64>;
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// WebAuthn credentials and their owners
#[async_trait]
pub trait PasskeyStore: Send + Sync {
    async fn insert(&self, credential: &PasskeyCredential, binding: &UserPasskey) -> Result<()>;
    async fn get_credential(&self, credential_id: &[u8]) -> Result<Option<PasskeyCredential>>;
    async fn get_binding(&self, credential_id: &[u8]) -> Result<Option<UserPasskey>>;
    /// Credentials with an active binding to `user_id`
    async fn credentials_for_user(&self, user_id: &str) -> Result<Vec<PasskeyCredential>>;
    /// Advance the sign count only if it still equals `expected`
    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        expected: u32,
        sign_count: u32,
        public_key: Option<Vec<u8>>,
        now: DateTime<Utc>,
    ) -> Result<bool>;
    async fn touch(&self, credential_id: &[u8], now: DateTime<Utc>) -> Result<()>;
    async fn delete_for_user(&self, user_id: &str) -> Result<()>;
}

#[async_trait]
pub trait ExpressionStore: Send + Sync {
    async fn insert(&self, expression: &Expression) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Expression>>;
    /// Newest first
    async fn list_recent(&self, limit: usize) -> Result<Vec<Expression>>;
    async fn list_by_creator(&self, creator_id: &str) -> Result<Vec<Expression>>;
    async fn count(&self) -> Result<i64>;
    /// Expressions per medium key, expressions without content counted as `text`
    async fn media_distribution(&self) -> Result<BTreeMap<String, i64>>;
    /// `draft -> confirmed`
    async fn confirm(
        &self,
        id: &str,
        hash: Option<String>,
        on_chain_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<bool>;
}

#[async_trait]
pub trait AcknowledgementStore: Send + Sync {
    async fn insert(&self, acknowledgement: &Acknowledgement) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Acknowledgement>>;
    async fn list_for_expression(&self, expression_id: &str) -> Result<Vec<Acknowledgement>>;
    async fn count(&self) -> Result<i64>;
    async fn transition(
        &self,
        id: &str,
        from: AcknowledgementStatus,
        to: AcknowledgementStatus,
        now: DateTime<Utc>,
    ) -> Result<bool>;
}

#[async_trait]
pub trait ProofStore: Send + Sync {
    /// Fails with `Conflict` if a pending or accepted request exists for the
    /// same expression and peer
    async fn insert_request(&self, request: &ProofRequest) -> Result<()>;
    async fn get_request(&self, id: &str) -> Result<Option<ProofRequest>>;
    /// Requests where the user is initiator or peer, newest first
    async fn requests_for_user(&self, user_id: &str) -> Result<Vec<ProofRequest>>;
    async fn transition_request(
        &self,
        id: &str,
        from: ProofRequestStatus,
        to: ProofRequestStatus,
        now: DateTime<Utc>,
    ) -> Result<bool>;
    /// Fails with `Conflict` if a token already exists for the request
    async fn insert_token(&self, token: &ProofToken) -> Result<()>;
    async fn get_token(&self, id: &str) -> Result<Option<ProofToken>>;
    async fn token_for_request(&self, request_id: &str) -> Result<Option<ProofToken>>;
    /// Tokens where the user is creator or acknowledger, newest first
    async fn tokens_for_user(&self, user_id: &str) -> Result<Vec<ProofToken>>;
    /// `accepted -> minted`
    async fn mark_minted(
        &self,
        id: &str,
        token_id: i64,
        on_chain_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist the notification and an unread entry for its recipient
    async fn insert(&self, notification: &Notification) -> Result<()>;
    /// Newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<NotificationView>>;
    /// Idempotent; `NotFound` if the user has no such notification
    async fn mark_read(&self, user_id: &str, notification_id: &str, now: DateTime<Utc>)
        -> Result<()>;
    async fn mark_all_read(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64>;
    async fn unread_count(&self, user_id: &str) -> Result<i64>;
}

#[async_trait]
pub trait StatisticsStore: Send + Sync {
    async fn append(&self, snapshot: &StatisticsSnapshot) -> Result<()>;
    /// The snapshot with the greatest `created_at`
    async fn latest(&self) -> Result<Option<StatisticsSnapshot>>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn insert(&self, conversation: &Conversation) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Conversation>>;
    /// Ordered by start time
    async fn list(&self, status: Option<ConversationStatus>) -> Result<Vec<Conversation>>;
    async fn transition(
        &self,
        id: &str,
        from: ConversationStatus,
        to: ConversationStatus,
        now: DateTime<Utc>,
    ) -> Result<bool>;
    async fn add_subscriber(&self, id: &str, user_id: &str) -> Result<()>;
    async fn remove_subscriber(&self, id: &str, user_id: &str) -> Result<()>;
}

/// Every store the services need, behind trait objects
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub passkeys: Arc<dyn PasskeyStore>,
    pub expressions: Arc<dyn ExpressionStore>,
    pub acknowledgements: Arc<dyn AcknowledgementStore>,
    pub proofs: Arc<dyn ProofStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub statistics: Arc<dyn StatisticsStore>,
    pub conversations: Arc<dyn ConversationStore>,
    /// "mongodb" or "memory"
    pub backend: &'static str,
}

impl Stores {
    /// All stores backed by one in-process `MemoryStore`
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            sessions: store.clone(),
            passkeys: store.clone(),
            expressions: store.clone(),
            acknowledgements: store.clone(),
            proofs: store.clone(),
            notifications: store.clone(),
            statistics: store.clone(),
            conversations: store,
            backend: "memory",
        }
    }
}
