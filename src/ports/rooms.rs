//! Conferencing rooms
//!
//! LiveKit speaks Twirp over HTTP for room management and accepts HS256
//! access tokens carrying a `video` grant for both the API and clients.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{PeacemakingError, Result};

/// Join tokens are valid for six hours
const JOIN_TOKEN_TTL_SECS: i64 = 6 * 3600;

/// API tokens only need to outlive one request
const API_TOKEN_TTL_SECS: i64 = 600;

#[async_trait]
pub trait RoomService: Send + Sync {
    async fn create_room(
        &self,
        name: &str,
        empty_timeout_secs: u32,
        max_participants: u32,
    ) -> Result<()>;

    fn issue_join_token(&self, identity: &str, room_name: &str, can_publish: bool)
        -> Result<String>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default)]
    pub room_join: bool,
    #[serde(default)]
    pub room_create: bool,
    #[serde(default)]
    pub can_publish: bool,
    #[serde(default)]
    pub can_subscribe: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

/// LiveKit server adapter
pub struct LiveKitRoomService {
    host: String,
    api_key: String,
    api_secret: String,
    client: reqwest::Client,
}

impl LiveKitRoomService {
    pub fn new(host: &str, api_key: &str, api_secret: &str) -> Self {
        Self {
            host: http_base(host),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn sign(&self, identity: &str, video: VideoGrant, ttl_secs: i64) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            nbf: now,
            exp: now + ttl_secs,
            video,
        };
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )?)
    }
}

/// LiveKit hosts are often configured with their websocket scheme
fn http_base(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if let Some(rest) = host.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if let Some(rest) = host.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else {
        host.to_string()
    }
}

#[async_trait]
impl RoomService for LiveKitRoomService {
    async fn create_room(
        &self,
        name: &str,
        empty_timeout_secs: u32,
        max_participants: u32,
    ) -> Result<()> {
        let token = self.sign(
            "",
            VideoGrant {
                room_create: true,
                ..VideoGrant::default()
            },
            API_TOKEN_TTL_SECS,
        )?;

        let url = format!("{}/twirp/livekit.RoomService/CreateRoom", self.host);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "name": name,
                "empty_timeout": empty_timeout_secs,
                "max_participants": max_participants,
            }))
            .send()
            .await
            .map_err(|e| PeacemakingError::Internal(format!("Room service unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(PeacemakingError::Internal(format!(
                "Room service refused CreateRoom: {}",
                response.status()
            )));
        }

        info!(room = %name, "Conference room created");
        Ok(())
    }

    fn issue_join_token(
        &self,
        identity: &str,
        room_name: &str,
        can_publish: bool,
    ) -> Result<String> {
        self.sign(
            identity,
            VideoGrant {
                room: Some(room_name.to_string()),
                room_join: true,
                can_publish,
                can_subscribe: true,
                ..VideoGrant::default()
            },
            JOIN_TOKEN_TTL_SECS,
        )
    }
}

/// Stand-in used when no conferencing server is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredRoomService;

#[async_trait]
impl RoomService for UnconfiguredRoomService {
    async fn create_room(&self, name: &str, _: u32, _: u32) -> Result<()> {
        debug!(room = %name, "Conferencing not configured, skipping room creation");
        Ok(())
    }

    fn issue_join_token(&self, _: &str, _: &str, _: bool) -> Result<String> {
        Err(PeacemakingError::Internal(
            "Conferencing is not configured".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    #[test]
    fn test_http_base() {
        assert_eq!(http_base("wss://rtc.example.org/"), "https://rtc.example.org");
        assert_eq!(http_base("ws://localhost:7880"), "http://localhost:7880");
        assert_eq!(http_base("https://rtc.example.org"), "https://rtc.example.org");
    }

    #[test]
    fn test_join_token_grants() {
        let service = LiveKitRoomService::new("wss://rtc.example.org", "key", "secret");
        let token = service
            .issue_join_token("user-1", "conversation-abc", false)
            .unwrap();

        let data = decode::<AccessClaims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.iss, "key");
        assert_eq!(data.claims.sub, "user-1");
        assert_eq!(data.claims.video.room.as_deref(), Some("conversation-abc"));
        assert!(data.claims.video.room_join);
        assert!(!data.claims.video.can_publish);
        assert!(data.claims.video.can_subscribe);
    }

    #[tokio::test]
    async fn test_unconfigured_service() {
        let service = UnconfiguredRoomService;
        assert!(service.create_room("r", 300, 100).await.is_ok());
        assert!(service.issue_join_token("u", "r", true).is_err());
    }
}
