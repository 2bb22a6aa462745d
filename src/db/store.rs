//! MongoDB implementations of the store traits
//!
//! Status transitions are single `update_one` calls filtered on the expected
//! status, so concurrent writers race inside MongoDB and exactly one sees
//! `modified_count == 1`.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use super::mongo::{MongoClient, MongoCollection};
use super::schemas::*;
use crate::domain::{
    Acknowledgement, AcknowledgementStatus, Conversation, ConversationStatus, Expression,
    ExpressionStatus, Medium, Notification, NotificationView, PasskeyCredential, ProofRequest,
    ProofRequestStatus, ProofToken, ProofTokenStatus, Session, StatisticsSnapshot, User,
    UserPasskey, UNKNOWN_CITIZENSHIP,
};
use crate::store::{
    AcknowledgementStore, ConversationStore, ExpressionStore, NotificationStore, PasskeyStore,
    ProofStore, SessionStore, StatisticsStore, UserStore,
};
use crate::types::{PeacemakingError, Result};

/// Every collection the stores use, opened once at startup
pub struct MongoStore {
    users: MongoCollection<UserDoc>,
    sessions: MongoCollection<SessionDoc>,
    credentials: MongoCollection<PasskeyCredentialDoc>,
    user_passkeys: MongoCollection<UserPasskeyDoc>,
    expressions: MongoCollection<ExpressionDoc>,
    acknowledgements: MongoCollection<AcknowledgementDoc>,
    proof_requests: MongoCollection<ProofRequestDoc>,
    proof_tokens: MongoCollection<ProofTokenDoc>,
    notifications: MongoCollection<NotificationDoc>,
    user_notifications: MongoCollection<UserNotificationDoc>,
    statistics: MongoCollection<StatisticsDoc>,
    conversations: MongoCollection<ConversationDoc>,
}

impl MongoStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
            sessions: client.collection(SESSION_COLLECTION).await?,
            credentials: client.collection(PASSKEY_CREDENTIAL_COLLECTION).await?,
            user_passkeys: client.collection(USER_PASSKEY_COLLECTION).await?,
            expressions: client.collection(EXPRESSION_COLLECTION).await?,
            acknowledgements: client.collection(ACKNOWLEDGEMENT_COLLECTION).await?,
            proof_requests: client.collection(PROOF_REQUEST_COLLECTION).await?,
            proof_tokens: client.collection(PROOF_TOKEN_COLLECTION).await?,
            notifications: client.collection(NOTIFICATION_COLLECTION).await?,
            user_notifications: client.collection(USER_NOTIFICATION_COLLECTION).await?,
            statistics: client.collection(STATISTICS_COLLECTION).await?,
            conversations: client.collection(CONVERSATION_COLLECTION).await?,
        })
    }
}

/// Read a `{_id, count}` group result
fn grouped_counts(rows: Vec<Document>) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for row in rows {
        let key = row.get_str("_id").unwrap_or_default().to_string();
        let n = match row.get("count") {
            Some(Bson::Int32(n)) => *n as i64,
            Some(Bson::Int64(n)) => *n,
            _ => 0,
        };
        *counts.entry(key).or_insert(0) += n;
    }
    counts
}

fn id_filter(id: &str) -> Result<Document> {
    Ok(doc! { "_id": oid(id)? })
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserStore for MongoStore {
    async fn create(&self, user: &User) -> Result<()> {
        self.users
            .insert_one(&UserDoc::from_domain(user)?)
            .await
            .map_err(|e| e.context("create user"))
    }

    async fn update(&self, user: &User) -> Result<()> {
        let doc = UserDoc::from_domain(user)?;
        let result = self
            .users
            .replace_one(doc! { "_id": doc.id }, &doc)
            .await
            .map_err(|e| e.context("update user"))?;
        if result.matched_count == 0 {
            return Err(PeacemakingError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one(id_filter(id)?)
            .await?
            .map(UserDoc::into_domain))
    }

    async fn get_by_address(&self, address: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one(doc! { "address": address })
            .await?
            .map(UserDoc::into_domain))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one(doc! { "email": email })
            .await?
            .map(UserDoc::into_domain))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one(doc! { "username": username })
            .await?
            .map(UserDoc::into_domain))
    }

    async fn update_nonce(&self, user_id: &str, nonce: i64) -> Result<()> {
        let result = self
            .users
            .update_one(
                id_filter(user_id)?,
                doc! { "$set": { "nonce": nonce, "updatedAt": bson::DateTime::now() } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(PeacemakingError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    async fn compare_and_set_nonce(&self, user_id: &str, expected: i64, nonce: i64) -> Result<bool> {
        let mut filter = id_filter(user_id)?;
        filter.insert("nonce", expected);
        let result = self
            .users
            .update_one(
                filter,
                doc! { "$set": { "nonce": nonce, "updatedAt": bson::DateTime::now() } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn connect_wallet(&self, user_id: &str, address: &str) -> Result<()> {
        let result = self
            .users
            .update_one(
                id_filter(user_id)?,
                doc! { "$set": { "address": address, "updatedAt": bson::DateTime::now() } },
            )
            .await
            .map_err(|e| match e {
                PeacemakingError::Conflict(_) => {
                    PeacemakingError::Conflict("address is bound to another user".into())
                }
                other => other.context("connect wallet"),
            })?;
        if result.matched_count == 0 {
            return Err(PeacemakingError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        self.users.delete_one(id_filter(user_id)?).await?;
        Ok(())
    }

    async fn total_count(&self) -> Result<i64> {
        self.users.count(doc! {}).await
    }

    async fn citizenship_distribution(&self) -> Result<BTreeMap<String, i64>> {
        let rows = self
            .users
            .aggregate(vec![doc! {
                "$group": {
                    "_id": {
                        "$cond": [
                            { "$eq": [{ "$ifNull": ["$citizenship", ""] }, ""] },
                            UNKNOWN_CITIZENSHIP,
                            "$citizenship",
                        ]
                    },
                    "count": { "$sum": 1 },
                }
            }])
            .await?;
        Ok(grouped_counts(rows))
    }
}

// =============================================================================
// Sessions
// =============================================================================

#[async_trait]
impl SessionStore for MongoStore {
    async fn insert(&self, session: &Session) -> Result<()> {
        self.sessions
            .insert_one(&SessionDoc::from_domain(session))
            .await
    }

    async fn get(&self, token: &str) -> Result<Option<Session>> {
        self.sessions
            .find_one(doc! { "token": token })
            .await?
            .map(SessionDoc::into_domain)
            .transpose()
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.sessions.delete_one(doc! { "token": token }).await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        self.sessions
            .find_many(doc! { "userId": user_id }, None, None)
            .await?
            .into_iter()
            .map(SessionDoc::into_domain)
            .collect()
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<u64> {
        self.sessions.delete_many(doc! { "userId": user_id }).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.sessions
            .delete_many(doc! { "expiresAt": { "$lte": bson_time(now) } })
            .await
    }
}

// =============================================================================
// Passkeys
// =============================================================================

#[async_trait]
impl PasskeyStore for MongoStore {
    async fn insert(&self, credential: &PasskeyCredential, binding: &UserPasskey) -> Result<()> {
        self.credentials
            .insert_one(&PasskeyCredentialDoc::from_domain(credential)?)
            .await
            .map_err(|e| e.context("store credential"))?;

        if let Err(e) = self
            .user_passkeys
            .insert_one(&UserPasskeyDoc::from_domain(binding))
            .await
        {
            // Leave no orphaned credential behind
            let id = encode_bytes(&credential.credential_id);
            if let Err(cleanup) = self.credentials.delete_one(doc! { "credentialId": &id }).await {
                tracing::error!(error = %cleanup, "Failed to remove orphaned passkey credential");
            }
            return Err(e.context("bind credential"));
        }
        Ok(())
    }

    async fn get_credential(&self, credential_id: &[u8]) -> Result<Option<PasskeyCredential>> {
        self.credentials
            .find_one(doc! { "credentialId": encode_bytes(credential_id) })
            .await?
            .map(PasskeyCredentialDoc::into_domain)
            .transpose()
    }

    async fn get_binding(&self, credential_id: &[u8]) -> Result<Option<UserPasskey>> {
        self.user_passkeys
            .find_one(doc! { "credentialId": encode_bytes(credential_id) })
            .await?
            .map(UserPasskeyDoc::into_domain)
            .transpose()
    }

    async fn credentials_for_user(&self, user_id: &str) -> Result<Vec<PasskeyCredential>> {
        let bindings = self
            .user_passkeys
            .find_many(doc! { "userId": user_id, "active": true }, None, None)
            .await?;
        if bindings.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = bindings.into_iter().map(|b| b.credential_id).collect();
        self.credentials
            .find_many(doc! { "credentialId": { "$in": ids } }, None, None)
            .await?
            .into_iter()
            .map(PasskeyCredentialDoc::into_domain)
            .collect()
    }

    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        expected: u32,
        sign_count: u32,
        public_key: Option<Vec<u8>>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut set = doc! { "signCount": sign_count as i64, "updatedAt": bson_time(now) };
        if let Some(key) = public_key {
            set.insert("publicKey", encode_bytes(&key));
        }
        let result = self
            .credentials
            .update_one(
                doc! { "credentialId": encode_bytes(credential_id), "signCount": expected as i64 },
                doc! { "$set": set },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn touch(&self, credential_id: &[u8], now: DateTime<Utc>) -> Result<()> {
        self.user_passkeys
            .update_one(
                doc! { "credentialId": encode_bytes(credential_id) },
                doc! { "$set": { "lastUsedAt": bson_time(now) } },
            )
            .await?;
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<()> {
        let bindings = self
            .user_passkeys
            .find_many(doc! { "userId": user_id }, None, None)
            .await?;
        let ids: Vec<String> = bindings.into_iter().map(|b| b.credential_id).collect();
        if !ids.is_empty() {
            self.credentials
                .delete_many(doc! { "credentialId": { "$in": ids } })
                .await?;
        }
        self.user_passkeys
            .delete_many(doc! { "userId": user_id })
            .await?;
        Ok(())
    }
}

// =============================================================================
// Expressions
// =============================================================================

#[async_trait]
impl ExpressionStore for MongoStore {
    async fn insert(&self, expression: &Expression) -> Result<()> {
        self.expressions
            .insert_one(&ExpressionDoc::from_domain(expression)?)
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<Expression>> {
        self.expressions
            .find_one(id_filter(id)?)
            .await?
            .map(ExpressionDoc::into_domain)
            .transpose()
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Expression>> {
        self.expressions
            .find_many(doc! {}, Some(doc! { "createdAt": -1 }), Some(limit as i64))
            .await?
            .into_iter()
            .map(ExpressionDoc::into_domain)
            .collect()
    }

    async fn list_by_creator(&self, creator_id: &str) -> Result<Vec<Expression>> {
        self.expressions
            .find_many(
                doc! { "creatorId": creator_id },
                Some(doc! { "createdAt": -1 }),
                None,
            )
            .await?
            .into_iter()
            .map(ExpressionDoc::into_domain)
            .collect()
    }

    async fn count(&self) -> Result<i64> {
        self.expressions.count(doc! {}).await
    }

    async fn media_distribution(&self) -> Result<BTreeMap<String, i64>> {
        let rows = self
            .expressions
            .aggregate(vec![
                doc! { "$project": {
                    "media": { "$map": {
                        "input": { "$objectToArray": { "$ifNull": ["$content", {}] } },
                        "as": "kv",
                        "in": "$$kv.k",
                    } }
                } },
                doc! { "$project": {
                    "media": { "$cond": [
                        { "$eq": [{ "$size": "$media" }, 0] },
                        [Medium::Text.as_str()],
                        "$media",
                    ] }
                } },
                doc! { "$unwind": "$media" },
                doc! { "$group": { "_id": "$media", "count": { "$sum": 1 } } },
            ])
            .await?;
        Ok(grouped_counts(rows))
    }

    async fn confirm(
        &self,
        id: &str,
        hash: Option<String>,
        on_chain_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut filter = id_filter(id)?;
        filter.insert("status", ExpressionStatus::Draft.as_str());

        let mut set = doc! {
            "status": ExpressionStatus::Confirmed.as_str(),
            "updatedAt": bson_time(now),
        };
        if let Some(hash) = hash {
            set.insert("hash", hash);
        }
        if let Some(on_chain_id) = on_chain_id {
            set.insert("onChainId", on_chain_id);
        }

        let result = self
            .expressions
            .update_one(filter, doc! { "$set": set })
            .await?;
        Ok(result.modified_count == 1)
    }
}

// =============================================================================
// Acknowledgements
// =============================================================================

#[async_trait]
impl AcknowledgementStore for MongoStore {
    async fn insert(&self, acknowledgement: &Acknowledgement) -> Result<()> {
        self.acknowledgements
            .insert_one(&AcknowledgementDoc::from_domain(acknowledgement)?)
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<Acknowledgement>> {
        self.acknowledgements
            .find_one(id_filter(id)?)
            .await?
            .map(AcknowledgementDoc::into_domain)
            .transpose()
    }

    async fn list_for_expression(&self, expression_id: &str) -> Result<Vec<Acknowledgement>> {
        self.acknowledgements
            .find_many(
                doc! { "expressionId": expression_id },
                Some(doc! { "createdAt": 1 }),
                None,
            )
            .await?
            .into_iter()
            .map(AcknowledgementDoc::into_domain)
            .collect()
    }

    async fn count(&self) -> Result<i64> {
        self.acknowledgements.count(doc! {}).await
    }

    async fn transition(
        &self,
        id: &str,
        from: AcknowledgementStatus,
        to: AcknowledgementStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut filter = id_filter(id)?;
        filter.insert("status", from.as_str());
        let result = self
            .acknowledgements
            .update_one(
                filter,
                doc! { "$set": { "status": to.as_str(), "updatedAt": bson_time(now) } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }
}

// =============================================================================
// Proofs
// =============================================================================

#[async_trait]
impl ProofStore for MongoStore {
    async fn insert_request(&self, request: &ProofRequest) -> Result<()> {
        self.proof_requests
            .insert_one(&ProofRequestDoc::from_domain(request)?)
            .await
            .map_err(|e| match e {
                PeacemakingError::Conflict(_) => PeacemakingError::Conflict(
                    "a proof request is already open or accepted for this pair".into(),
                ),
                other => other.context("create proof request"),
            })
    }

    async fn get_request(&self, id: &str) -> Result<Option<ProofRequest>> {
        self.proof_requests
            .find_one(id_filter(id)?)
            .await?
            .map(ProofRequestDoc::into_domain)
            .transpose()
    }

    async fn requests_for_user(&self, user_id: &str) -> Result<Vec<ProofRequest>> {
        self.proof_requests
            .find_many(
                doc! { "$or": [{ "initiatorId": user_id }, { "peerId": user_id }] },
                Some(doc! { "createdAt": -1 }),
                None,
            )
            .await?
            .into_iter()
            .map(ProofRequestDoc::into_domain)
            .collect()
    }

    async fn transition_request(
        &self,
        id: &str,
        from: ProofRequestStatus,
        to: ProofRequestStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut filter = id_filter(id)?;
        filter.insert("status", from.as_str());
        let mut update = doc! { "$set": { "status": to.as_str(), "updatedAt": bson_time(now) } };
        if to == ProofRequestStatus::Rejected {
            // Frees the pair for a new request
            update.insert("$unset", doc! { "openPair": "" });
        }
        let result = self.proof_requests.update_one(filter, update).await?;
        Ok(result.modified_count == 1)
    }

    async fn insert_token(&self, token: &ProofToken) -> Result<()> {
        self.proof_tokens
            .insert_one(&ProofTokenDoc::from_domain(token)?)
            .await
            .map_err(|e| e.context("create proof token"))
    }

    async fn get_token(&self, id: &str) -> Result<Option<ProofToken>> {
        self.proof_tokens
            .find_one(id_filter(id)?)
            .await?
            .map(ProofTokenDoc::into_domain)
            .transpose()
    }

    async fn token_for_request(&self, request_id: &str) -> Result<Option<ProofToken>> {
        self.proof_tokens
            .find_one(doc! { "requestId": request_id })
            .await?
            .map(ProofTokenDoc::into_domain)
            .transpose()
    }

    async fn tokens_for_user(&self, user_id: &str) -> Result<Vec<ProofToken>> {
        self.proof_tokens
            .find_many(
                doc! { "$or": [{ "creatorId": user_id }, { "acknowledgerId": user_id }] },
                Some(doc! { "createdAt": -1 }),
                None,
            )
            .await?
            .into_iter()
            .map(ProofTokenDoc::into_domain)
            .collect()
    }

    async fn mark_minted(
        &self,
        id: &str,
        token_id: i64,
        on_chain_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut filter = id_filter(id)?;
        filter.insert("status", ProofTokenStatus::Accepted.as_str());
        let result = self
            .proof_tokens
            .update_one(
                filter,
                doc! { "$set": {
                    "status": ProofTokenStatus::Minted.as_str(),
                    "tokenId": token_id,
                    "onChainHash": on_chain_hash,
                    "mintedAt": bson_time(now),
                } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[async_trait]
impl NotificationStore for MongoStore {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        self.notifications
            .insert_one(&NotificationDoc::from_domain(notification)?)
            .await
            .map_err(|e| e.context("store notification"))?;
        self.user_notifications
            .insert_one(&UserNotificationDoc::unread(notification))
            .await
            .map_err(|e| e.context("store notification state"))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<NotificationView>> {
        let states = self
            .user_notifications
            .find_many(
                doc! { "userId": user_id },
                Some(doc! { "createdAt": -1 }),
                None,
            )
            .await?;
        if states.is_empty() {
            return Ok(Vec::new());
        }

        let ids = states
            .iter()
            .map(|s| oid(&s.notification_id))
            .collect::<Result<Vec<_>>>()?;
        let mut bodies: HashMap<String, Notification> = self
            .notifications
            .find_many(doc! { "_id": { "$in": ids } }, None, None)
            .await?
            .into_iter()
            .map(|d| {
                let n = d.into_domain();
                (n.id.clone(), n)
            })
            .collect();

        Ok(states
            .into_iter()
            .filter_map(|s| {
                let body = bodies.remove(&s.notification_id)?;
                Some(s.view(body))
            })
            .collect())
    }

    async fn mark_read(
        &self,
        user_id: &str,
        notification_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let filter = doc! { "userId": user_id, "notificationId": notification_id };
        let result = self
            .user_notifications
            .update_one(
                doc! { "userId": user_id, "notificationId": notification_id, "read": false },
                doc! { "$set": { "read": true, "readAt": bson_time(now) } },
            )
            .await?;
        if result.matched_count == 0 && self.user_notifications.find_one(filter).await?.is_none() {
            return Err(PeacemakingError::NotFound(format!(
                "notification {}",
                notification_id
            )));
        }
        Ok(())
    }

    async fn mark_all_read(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64> {
        let result = self
            .user_notifications
            .update_many(
                doc! { "userId": user_id, "read": false },
                doc! { "$set": { "read": true, "readAt": bson_time(now) } },
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn unread_count(&self, user_id: &str) -> Result<i64> {
        self.user_notifications
            .count(doc! { "userId": user_id, "read": false })
            .await
    }
}

// =============================================================================
// Statistics
// =============================================================================

#[async_trait]
impl StatisticsStore for MongoStore {
    async fn append(&self, snapshot: &StatisticsSnapshot) -> Result<()> {
        self.statistics
            .insert_one(&StatisticsDoc::from_domain(snapshot)?)
            .await
    }

    async fn latest(&self) -> Result<Option<StatisticsSnapshot>> {
        Ok(self
            .statistics
            .find_many(doc! {}, Some(doc! { "createdAt": -1 }), Some(1))
            .await?
            .into_iter()
            .next()
            .map(StatisticsDoc::into_domain))
    }
}

// =============================================================================
// Conversations
// =============================================================================

#[async_trait]
impl ConversationStore for MongoStore {
    async fn insert(&self, conversation: &Conversation) -> Result<()> {
        self.conversations
            .insert_one(&ConversationDoc::from_domain(conversation)?)
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        self.conversations
            .find_one(id_filter(id)?)
            .await?
            .map(ConversationDoc::into_domain)
            .transpose()
    }

    async fn list(&self, status: Option<ConversationStatus>) -> Result<Vec<Conversation>> {
        let filter = match status {
            Some(s) => doc! { "status": s.as_str() },
            None => doc! {},
        };
        self.conversations
            .find_many(filter, Some(doc! { "startTime": 1 }), None)
            .await?
            .into_iter()
            .map(ConversationDoc::into_domain)
            .collect()
    }

    async fn transition(
        &self,
        id: &str,
        from: ConversationStatus,
        to: ConversationStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut filter = id_filter(id)?;
        filter.insert("status", from.as_str());
        let mut set = doc! { "status": to.as_str(), "updatedAt": bson_time(now) };
        if to == ConversationStatus::Ended {
            set.insert("endTime", bson_time(now));
        }
        let result = self
            .conversations
            .update_one(filter, doc! { "$set": set })
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn add_subscriber(&self, id: &str, user_id: &str) -> Result<()> {
        let result = self
            .conversations
            .update_one(id_filter(id)?, doc! { "$addToSet": { "subscribers": user_id } })
            .await?;
        if result.matched_count == 0 {
            return Err(PeacemakingError::NotFound(format!("conversation {}", id)));
        }
        Ok(())
    }

    async fn remove_subscriber(&self, id: &str, user_id: &str) -> Result<()> {
        let result = self
            .conversations
            .update_one(id_filter(id)?, doc! { "$pull": { "subscribers": user_id } })
            .await?;
        if result.matched_count == 0 {
            return Err(PeacemakingError::NotFound(format!("conversation {}", id)));
        }
        Ok(())
    }
}
