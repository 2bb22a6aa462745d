//! In-memory store
//!
//! Backs every store trait with process-local maps. Used in development mode
//! when MongoDB is unavailable and by the test suite. Each compare-and-set
//! runs under a single write lock, which gives the same linearizability the
//! conditional updates give in MongoDB.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{
    AcknowledgementStore, ConversationStore, ExpressionStore, NotificationStore, PasskeyStore,
    ProofStore, SessionStore, StatisticsStore, UserStore,
};
use crate::domain::{
    Acknowledgement, AcknowledgementStatus, Conversation, ConversationStatus, Expression,
    ExpressionStatus, Medium, Notification, NotificationView, PasskeyCredential, ProofRequest,
    ProofRequestStatus, ProofToken, ProofTokenStatus, Session, StatisticsSnapshot, User,
    UserNotification, UserPasskey, UNKNOWN_CITIZENSHIP,
};
use crate::types::{PeacemakingError, Result};

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    credentials: HashMap<Vec<u8>, PasskeyCredential>,
    bindings: HashMap<Vec<u8>, UserPasskey>,
    expressions: HashMap<String, Expression>,
    acknowledgements: HashMap<String, Acknowledgement>,
    proof_requests: HashMap<String, ProofRequest>,
    proof_tokens: HashMap<String, ProofToken>,
    notifications: HashMap<String, Notification>,
    user_notifications: Vec<UserNotification>,
    snapshots: Vec<StatisticsSnapshot>,
    conversations: HashMap<String, Conversation>,
}

/// Process-local implementation of every store trait
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    sessions: DashMap<String, Session>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_unique(users: &HashMap<String, User>, user: &User) -> Result<()> {
    for other in users.values().filter(|u| u.id != user.id) {
        let clash = |a: &Option<String>, b: &Option<String>| {
            matches!((a, b), (Some(a), Some(b)) if !a.is_empty() && a == b)
        };
        if clash(&other.address, &user.address) {
            return Err(PeacemakingError::Conflict("address already registered".into()));
        }
        if clash(&other.email, &user.email) {
            return Err(PeacemakingError::Conflict("email already registered".into()));
        }
        if clash(&other.username, &user.username) {
            return Err(PeacemakingError::Conflict("username already taken".into()));
        }
    }
    Ok(())
}

fn newest_first<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.id) {
            return Err(PeacemakingError::Conflict("user already exists".into()));
        }
        check_unique(&state.users, user)?;
        state.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Err(PeacemakingError::NotFound(format!("user {}", user.id)));
        }
        check_unique(&state.users, user)?;
        state.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn get_by_address(&self, address: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.address.as_deref() == Some(address))
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username.as_deref() == Some(username))
            .cloned())
    }

    async fn update_nonce(&self, user_id: &str, nonce: i64) -> Result<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| PeacemakingError::NotFound(format!("user {}", user_id)))?;
        user.nonce = nonce;
        Ok(())
    }

    async fn compare_and_set_nonce(&self, user_id: &str, expected: i64, nonce: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.users.get_mut(user_id) {
            Some(user) if user.nonce == expected => {
                user.nonce = nonce;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn connect_wallet(&self, user_id: &str, address: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.id != user_id && u.address.as_deref() == Some(address))
        {
            return Err(PeacemakingError::Conflict(
                "address is bound to another user".into(),
            ));
        }
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| PeacemakingError::NotFound(format!("user {}", user_id)))?;
        user.address = Some(address.to_string());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        self.state.write().await.users.remove(user_id);
        Ok(())
    }

    async fn total_count(&self) -> Result<i64> {
        Ok(self.state.read().await.users.len() as i64)
    }

    async fn citizenship_distribution(&self) -> Result<BTreeMap<String, i64>> {
        let state = self.state.read().await;
        let mut dist = BTreeMap::new();
        for user in state.users.values() {
            let key = user
                .citizenship
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| UNKNOWN_CITIZENSHIP.to_string());
            *dist.entry(key).or_insert(0) += 1;
        }
        Ok(dist)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: &Session) -> Result<()> {
        if self.sessions.contains_key(&session.token) {
            return Err(PeacemakingError::Conflict("session token collision".into()));
        }
        self.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(token).map(|s| s.value().clone()))
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.sessions.remove(token);
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.value().clone())
            .collect())
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - self.sessions.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - self.sessions.len()) as u64)
    }
}

#[async_trait]
impl PasskeyStore for MemoryStore {
    async fn insert(&self, credential: &PasskeyCredential, binding: &UserPasskey) -> Result<()> {
        let mut state = self.state.write().await;
        if state.credentials.contains_key(&credential.credential_id) {
            return Err(PeacemakingError::Conflict("credential already registered".into()));
        }
        state
            .credentials
            .insert(credential.credential_id.clone(), credential.clone());
        state
            .bindings
            .insert(binding.credential_id.clone(), binding.clone());
        Ok(())
    }

    async fn get_credential(&self, credential_id: &[u8]) -> Result<Option<PasskeyCredential>> {
        Ok(self.state.read().await.credentials.get(credential_id).cloned())
    }

    async fn get_binding(&self, credential_id: &[u8]) -> Result<Option<UserPasskey>> {
        Ok(self.state.read().await.bindings.get(credential_id).cloned())
    }

    async fn credentials_for_user(&self, user_id: &str) -> Result<Vec<PasskeyCredential>> {
        let state = self.state.read().await;
        Ok(state
            .bindings
            .values()
            .filter(|b| b.user_id == user_id && b.active)
            .filter_map(|b| state.credentials.get(&b.credential_id).cloned())
            .collect())
    }

    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        expected: u32,
        sign_count: u32,
        public_key: Option<Vec<u8>>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.credentials.get_mut(credential_id) {
            Some(cred) if cred.sign_count == expected => {
                cred.sign_count = sign_count;
                if let Some(key) = public_key {
                    cred.public_key = key;
                }
                cred.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch(&self, credential_id: &[u8], now: DateTime<Utc>) -> Result<()> {
        if let Some(binding) = self.state.write().await.bindings.get_mut(credential_id) {
            binding.last_used_at = Some(now);
        }
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let owned: Vec<Vec<u8>> = state
            .bindings
            .values()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.credential_id.clone())
            .collect();
        for id in owned {
            state.bindings.remove(&id);
            state.credentials.remove(&id);
        }
        Ok(())
    }
}

#[async_trait]
impl ExpressionStore for MemoryStore {
    async fn insert(&self, expression: &Expression) -> Result<()> {
        self.state
            .write()
            .await
            .expressions
            .insert(expression.id.clone(), expression.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Expression>> {
        Ok(self.state.read().await.expressions.get(id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Expression>> {
        let mut all: Vec<Expression> =
            self.state.read().await.expressions.values().cloned().collect();
        newest_first(&mut all, |e| e.created_at);
        all.truncate(limit);
        Ok(all)
    }

    async fn list_by_creator(&self, creator_id: &str) -> Result<Vec<Expression>> {
        let mut mine: Vec<Expression> = self
            .state
            .read()
            .await
            .expressions
            .values()
            .filter(|e| e.creator_id == creator_id)
            .cloned()
            .collect();
        newest_first(&mut mine, |e| e.created_at);
        Ok(mine)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.state.read().await.expressions.len() as i64)
    }

    async fn media_distribution(&self) -> Result<BTreeMap<String, i64>> {
        let state = self.state.read().await;
        let mut dist = BTreeMap::new();
        for expression in state.expressions.values() {
            if expression.content.is_empty() {
                *dist.entry(Medium::Text.as_str().to_string()).or_insert(0) += 1;
            }
            for key in expression.content.keys() {
                *dist.entry(key.clone()).or_insert(0) += 1;
            }
        }
        Ok(dist)
    }

    async fn confirm(
        &self,
        id: &str,
        hash: Option<String>,
        on_chain_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.expressions.get_mut(id) {
            Some(e) if e.status == ExpressionStatus::Draft => {
                e.status = ExpressionStatus::Confirmed;
                if hash.is_some() {
                    e.hash = hash;
                }
                if on_chain_id.is_some() {
                    e.on_chain_id = on_chain_id;
                }
                e.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl AcknowledgementStore for MemoryStore {
    async fn insert(&self, acknowledgement: &Acknowledgement) -> Result<()> {
        self.state
            .write()
            .await
            .acknowledgements
            .insert(acknowledgement.id.clone(), acknowledgement.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Acknowledgement>> {
        Ok(self.state.read().await.acknowledgements.get(id).cloned())
    }

    async fn list_for_expression(&self, expression_id: &str) -> Result<Vec<Acknowledgement>> {
        let mut acks: Vec<Acknowledgement> = self
            .state
            .read()
            .await
            .acknowledgements
            .values()
            .filter(|a| a.expression_id == expression_id)
            .cloned()
            .collect();
        acks.sort_by_key(|a| a.created_at);
        Ok(acks)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.state.read().await.acknowledgements.len() as i64)
    }

    async fn transition(
        &self,
        id: &str,
        from: AcknowledgementStatus,
        to: AcknowledgementStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.acknowledgements.get_mut(id) {
            Some(a) if a.status == from => {
                a.status = to;
                a.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ProofStore for MemoryStore {
    async fn insert_request(&self, request: &ProofRequest) -> Result<()> {
        let mut state = self.state.write().await;
        let open = state.proof_requests.values().find(|r| {
            r.status != ProofRequestStatus::Rejected
                && r.expression_id == request.expression_id
                && r.peer_id == request.peer_id
        });
        match open.map(|r| r.status) {
            Some(ProofRequestStatus::Accepted) => {
                return Err(PeacemakingError::Conflict(
                    "a proof has already been issued for this pair".into(),
                ));
            }
            Some(_) => {
                return Err(PeacemakingError::Conflict(
                    "a proof request is already pending for this pair".into(),
                ));
            }
            None => {}
        }
        state
            .proof_requests
            .insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn get_request(&self, id: &str) -> Result<Option<ProofRequest>> {
        Ok(self.state.read().await.proof_requests.get(id).cloned())
    }

    async fn requests_for_user(&self, user_id: &str) -> Result<Vec<ProofRequest>> {
        let mut requests: Vec<ProofRequest> = self
            .state
            .read()
            .await
            .proof_requests
            .values()
            .filter(|r| r.is_participant(user_id))
            .cloned()
            .collect();
        newest_first(&mut requests, |r| r.created_at);
        Ok(requests)
    }

    async fn transition_request(
        &self,
        id: &str,
        from: ProofRequestStatus,
        to: ProofRequestStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.proof_requests.get_mut(id) {
            Some(r) if r.status == from => {
                r.status = to;
                r.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_token(&self, token: &ProofToken) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .proof_tokens
            .values()
            .any(|t| t.request_id == token.request_id)
        {
            return Err(PeacemakingError::Conflict(
                "a proof token already exists for this request".into(),
            ));
        }
        state.proof_tokens.insert(token.id.clone(), token.clone());
        Ok(())
    }

    async fn get_token(&self, id: &str) -> Result<Option<ProofToken>> {
        Ok(self.state.read().await.proof_tokens.get(id).cloned())
    }

    async fn token_for_request(&self, request_id: &str) -> Result<Option<ProofToken>> {
        Ok(self
            .state
            .read()
            .await
            .proof_tokens
            .values()
            .find(|t| t.request_id == request_id)
            .cloned())
    }

    async fn tokens_for_user(&self, user_id: &str) -> Result<Vec<ProofToken>> {
        let mut tokens: Vec<ProofToken> = self
            .state
            .read()
            .await
            .proof_tokens
            .values()
            .filter(|t| t.creator_id == user_id || t.acknowledger_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut tokens, |t| t.created_at);
        Ok(tokens)
    }

    async fn mark_minted(
        &self,
        id: &str,
        token_id: i64,
        on_chain_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.proof_tokens.get_mut(id) {
            Some(t) if t.status == ProofTokenStatus::Accepted => {
                t.status = ProofTokenStatus::Minted;
                t.token_id = Some(token_id);
                t.on_chain_hash = Some(on_chain_hash.to_string());
                t.minted_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .notifications
            .insert(notification.id.clone(), notification.clone());
        state.user_notifications.push(UserNotification {
            user_id: notification.user_id.clone(),
            notification_id: notification.id.clone(),
            read: false,
            read_at: None,
        });
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<NotificationView>> {
        let state = self.state.read().await;
        let mut views: Vec<NotificationView> = state
            .user_notifications
            .iter()
            .filter(|un| un.user_id == user_id)
            .filter_map(|un| {
                state
                    .notifications
                    .get(&un.notification_id)
                    .map(|n| NotificationView {
                        notification: n.clone(),
                        read: un.read,
                        read_at: un.read_at,
                    })
            })
            .collect();
        newest_first(&mut views, |v| v.notification.created_at);
        Ok(views)
    }

    async fn mark_read(
        &self,
        user_id: &str,
        notification_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let entry = state
            .user_notifications
            .iter_mut()
            .find(|un| un.user_id == user_id && un.notification_id == notification_id)
            .ok_or_else(|| {
                PeacemakingError::NotFound(format!("notification {}", notification_id))
            })?;
        if !entry.read {
            entry.read = true;
            entry.read_at = Some(now);
        }
        Ok(())
    }

    async fn mark_all_read(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for entry in state
            .user_notifications
            .iter_mut()
            .filter(|un| un.user_id == user_id && !un.read)
        {
            entry.read = true;
            entry.read_at = Some(now);
            changed += 1;
        }
        Ok(changed)
    }

    async fn unread_count(&self, user_id: &str) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .user_notifications
            .iter()
            .filter(|un| un.user_id == user_id && !un.read)
            .count() as i64)
    }
}

#[async_trait]
impl StatisticsStore for MemoryStore {
    async fn append(&self, snapshot: &StatisticsSnapshot) -> Result<()> {
        self.state.write().await.snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn latest(&self) -> Result<Option<StatisticsSnapshot>> {
        Ok(self
            .state
            .read()
            .await
            .snapshots
            .iter()
            .max_by_key(|s| s.created_at)
            .cloned())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn insert(&self, conversation: &Conversation) -> Result<()> {
        self.state
            .write()
            .await
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.state.read().await.conversations.get(id).cloned())
    }

    async fn list(&self, status: Option<ConversationStatus>) -> Result<Vec<Conversation>> {
        let mut list: Vec<Conversation> = self
            .state
            .read()
            .await
            .conversations
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        list.sort_by_key(|c| c.start_time);
        Ok(list)
    }

    async fn transition(
        &self,
        id: &str,
        from: ConversationStatus,
        to: ConversationStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.conversations.get_mut(id) {
            Some(c) if c.status == from => {
                c.status = to;
                if to == ConversationStatus::Ended {
                    c.end_time = Some(now);
                }
                c.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn add_subscriber(&self, id: &str, user_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let conversation = state
            .conversations
            .get_mut(id)
            .ok_or_else(|| PeacemakingError::NotFound(format!("conversation {}", id)))?;
        conversation.subscribers.insert(user_id.to_string());
        Ok(())
    }

    async fn remove_subscriber(&self, id: &str, user_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let conversation = state
            .conversations
            .get_mut(id)
            .ok_or_else(|| PeacemakingError::NotFound(format!("conversation {}", id)))?;
        conversation.subscribers.remove(user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{new_id, ContentMap};
    use chrono::Duration;

    fn user(id: &str) -> User {
        User::new(id.to_string(), Utc::now())
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let store = MemoryStore::new();
        let mut a = user("a");
        a.email = Some("a@example.org".into());
        UserStore::create(&store, &a).await.unwrap();

        let mut b = user("b");
        b.email = Some("a@example.org".into());
        let err = UserStore::create(&store, &b).await.unwrap_err();
        assert!(matches!(err, PeacemakingError::Conflict(_)));

        b.email = None;
        b.address = Some("0xabc".into());
        UserStore::create(&store, &b).await.unwrap();
        let err = store.connect_wallet("a", "0xabc").await.unwrap_err();
        assert!(matches!(err, PeacemakingError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_nonce_compare_and_set() {
        let store = MemoryStore::new();
        let mut u = user("u");
        u.nonce = 7;
        UserStore::create(&store, &u).await.unwrap();

        assert!(store.compare_and_set_nonce("u", 7, 8).await.unwrap());
        assert!(!store.compare_and_set_nonce("u", 7, 9).await.unwrap());
        assert_eq!(store.get_by_id("u").await.unwrap().unwrap().nonce, 8);
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (token, ttl) in [("live", 60), ("dead", -1)] {
            SessionStore::insert(
                &store,
                &Session {
                    token: token.into(),
                    user_id: "u".into(),
                    purpose: crate::domain::SessionPurpose::Auth,
                    ceremony: None,
                    created_at: now,
                    updated_at: now,
                    expires_at: now + Duration::seconds(ttl),
                },
            )
            .await
            .unwrap();
        }
        assert_eq!(store.delete_expired(now).await.unwrap(), 1);
        assert!(SessionStore::get(&store, "live").await.unwrap().is_some());
        assert!(SessionStore::get(&store, "dead").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_request_unique_per_pair() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let request = ProofRequest {
            id: new_id(),
            expression_id: "e".into(),
            acknowledgement_id: "a".into(),
            initiator_id: "u1".into(),
            peer_id: "u2".into(),
            status: ProofRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        store.insert_request(&request).await.unwrap();

        let again = ProofRequest {
            id: new_id(),
            ..request.clone()
        };
        assert!(matches!(
            store.insert_request(&again).await,
            Err(PeacemakingError::Conflict(_))
        ));

        assert!(store
            .transition_request(&request.id, ProofRequestStatus::Pending, ProofRequestStatus::Rejected, now)
            .await
            .unwrap());
        store.insert_request(&again).await.unwrap();

        // An accepted request closes the pair for good
        assert!(store
            .transition_request(&again.id, ProofRequestStatus::Pending, ProofRequestStatus::Accepted, now)
            .await
            .unwrap());
        let third = ProofRequest {
            id: new_id(),
            ..request.clone()
        };
        assert!(matches!(
            store.insert_request(&third).await,
            Err(PeacemakingError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_media_distribution() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for keys in [vec!["text"], vec!["text", "image"], vec![]] {
            let content: ContentMap = keys
                .into_iter()
                .map(|k| (k.to_string(), "x".to_string()))
                .collect();
            ExpressionStore::insert(
                &store,
                &Expression {
                    id: new_id(),
                    creator_id: "u".into(),
                    content,
                    hash: None,
                    on_chain_id: None,
                    status: ExpressionStatus::Draft,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await
            .unwrap();
        }
        let dist = store.media_distribution().await.unwrap();
        assert_eq!(dist.get("text"), Some(&3));
        assert_eq!(dist.get("image"), Some(&1));
    }

    #[tokio::test]
    async fn test_mark_read_idempotent() {
        let store = MemoryStore::new();
        let n = Notification::new(
            "u",
            crate::domain::NotificationType::NftMinted,
            "t",
            "m",
            Utc::now(),
        );
        NotificationStore::insert(&store, &n).await.unwrap();
        store.mark_read("u", &n.id, Utc::now()).await.unwrap();
        store.mark_read("u", &n.id, Utc::now()).await.unwrap();
        assert_eq!(store.unread_count("u").await.unwrap(), 0);
        assert!(matches!(
            store.mark_read("someone-else", &n.id, Utc::now()).await,
            Err(PeacemakingError::NotFound(_))
        ));
    }
}
