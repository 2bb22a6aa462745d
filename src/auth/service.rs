//! Wallet and email/password authentication
//!
//! Wallet login is a nonce challenge: the client asks for a nonce, signs
//! `Sign this nonce: <nonce>` with its wallet, and posts the signature back.
//! A successful verification rotates the nonce with a compare-and-set so the
//! same signature can never open a second session.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use super::sessions::SessionManager;
use crate::domain::{new_id, Session, SessionPurpose, User};
use crate::ports::{challenge_for, draw_nonce, Clock, RandomSource, SignatureVerifier};
use crate::store::UserStore;
use crate::types::{PeacemakingError, Result};

/// Result of a wallet signature check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyOutcome {
    pub valid: bool,
    pub token: String,
}

impl VerifyOutcome {
    fn rejected() -> Self {
        Self {
            valid: false,
            token: String::new(),
        }
    }
}

/// A user together with a freshly issued auth session
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: User,
    pub session: Session,
}

/// Lowercase a `0x`-prefixed 20-byte hex address, rejecting anything else
pub fn normalize_address(address: &str) -> Result<String> {
    let address = address.trim();
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| PeacemakingError::BadRequest("address must start with 0x".into()))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PeacemakingError::BadRequest(format!(
            "invalid wallet address: {}",
            address
        )));
    }

    Ok(format!("0x{}", hex_part.to_ascii_lowercase()))
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_ascii_lowercase();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(PeacemakingError::BadRequest("invalid email address".into()));
    }
    Ok(email)
}

fn validate_username(username: &str) -> Result<String> {
    let username = username.trim();
    let len = username.chars().count();
    if !(3..=30).contains(&len) {
        return Err(PeacemakingError::BadRequest(
            "username must be between 3 and 30 characters".into(),
        ));
    }
    Ok(username.to_string())
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<SessionManager>,
    signatures: Arc<dyn SignatureVerifier>,
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<SessionManager>,
        signatures: Arc<dyn SignatureVerifier>,
        random: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            sessions,
            signatures,
            random,
            clock,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    // =========================================================================
    // Wallet login
    // =========================================================================

    /// Issue a fresh nonce for `address`, creating the user on first contact.
    ///
    /// The returned nonce is the one stored.
    pub async fn generate_nonce(&self, address: &str) -> Result<i64> {
        let address = normalize_address(address)?;
        let user = self.user_for_address(&address).await?;

        let nonce = draw_nonce(self.random.as_ref(), Some(user.nonce));
        self.users.update_nonce(&user.id, nonce).await?;

        debug!(user_id = %user.id, "Nonce issued");
        Ok(nonce)
    }

    async fn user_for_address(&self, address: &str) -> Result<User> {
        if let Some(user) = self.users.get_by_address(address).await? {
            return Ok(user);
        }

        let mut user = User::new(new_id(), self.clock.now());
        user.address = Some(address.to_string());
        user.nonce = draw_nonce(self.random.as_ref(), None);

        match self.users.create(&user).await {
            Ok(()) => {
                info!(user_id = %user.id, "Wallet user created");
                Ok(user)
            }
            // Lost a creation race for the same address
            Err(PeacemakingError::Conflict(_)) => self
                .users
                .get_by_address(address)
                .await?
                .ok_or_else(|| PeacemakingError::Internal("wallet user vanished".into())),
            Err(e) => Err(e),
        }
    }

    /// Check `signature` over the stored nonce's challenge.
    ///
    /// On success the nonce is rotated and an auth session is issued. Any
    /// failure, including an unknown address or a nonce consumed by a
    /// concurrent verification, yields `valid = false` and changes nothing.
    pub async fn verify_signature(&self, address: &str, signature: &str) -> Result<VerifyOutcome> {
        let Ok(address) = normalize_address(address) else {
            return Ok(VerifyOutcome::rejected());
        };
        let Some(user) = self.users.get_by_address(&address).await? else {
            debug!("Signature for unknown address rejected");
            return Ok(VerifyOutcome::rejected());
        };

        let challenge = challenge_for(user.nonce);
        if !self.signatures.verify(&address, &challenge, signature) {
            debug!(user_id = %user.id, "Signature rejected");
            return Ok(VerifyOutcome::rejected());
        }

        let next = draw_nonce(self.random.as_ref(), Some(user.nonce));
        if !self
            .users
            .compare_and_set_nonce(&user.id, user.nonce, next)
            .await?
        {
            warn!(user_id = %user.id, "Nonce already consumed by a concurrent login");
            return Ok(VerifyOutcome::rejected());
        }

        let session = self
            .sessions
            .create(&user.id, SessionPurpose::Auth, None)
            .await?;
        info!(user_id = %user.id, "Wallet login");

        Ok(VerifyOutcome {
            valid: true,
            token: session.token,
        })
    }

    /// Bind an address and an email, merging into whichever user already
    /// holds one of them.
    pub async fn register(&self, address: &str, email: &str) -> Result<AuthOutcome> {
        let address = normalize_address(address)?;
        let email = normalize_email(email)?;

        let by_address = self.users.get_by_address(&address).await?;
        let by_email = self.users.get_by_email(&email).await?;

        let user = match (by_address, by_email) {
            (Some(a), Some(b)) if a.id != b.id => {
                return Err(PeacemakingError::Conflict(
                    "address and email belong to different users".into(),
                ));
            }
            (Some(mut user), _) | (None, Some(mut user)) => {
                let mut changed = false;
                if user.address.is_none() {
                    user.address = Some(address.clone());
                    changed = true;
                }
                if user.email.is_none() {
                    user.email = Some(email.clone());
                    changed = true;
                }
                if changed {
                    user.updated_at = self.clock.now();
                    self.users.update(&user).await?;
                }
                user
            }
            (None, None) => {
                let mut user = User::new(new_id(), self.clock.now());
                user.address = Some(address.clone());
                user.email = Some(email.clone());
                user.nonce = draw_nonce(self.random.as_ref(), None);
                self.users.create(&user).await?;
                info!(user_id = %user.id, "User registered");
                user
            }
        };

        let session = self
            .sessions
            .create(&user.id, SessionPurpose::Auth, None)
            .await?;
        Ok(AuthOutcome { user, session })
    }

    // =========================================================================
    // Email / password
    // =========================================================================

    pub async fn register_with_email(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<AuthOutcome> {
        let email = normalize_email(email)?;
        let username = validate_username(username)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PeacemakingError::BadRequest(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(PeacemakingError::Conflict("email is already registered".into()));
        }
        if self.users.get_by_username(&username).await?.is_some() {
            return Err(PeacemakingError::Conflict("username is taken".into()));
        }

        let mut user = User::new(new_id(), self.clock.now());
        user.email = Some(email);
        user.username = Some(username);
        user.password_hash = Some(hash_password(password)?);
        self.users.create(&user).await?;
        info!(user_id = %user.id, "Email account registered");

        let session = self
            .sessions
            .create(&user.id, SessionPurpose::Auth, None)
            .await?;
        Ok(AuthOutcome { user, session })
    }

    pub async fn login_with_email(&self, email: &str, password: &str) -> Result<AuthOutcome> {
        let invalid = || PeacemakingError::Unauthorized("invalid email or password".into());

        let email = normalize_email(email).map_err(|_| invalid())?;
        let user = self.users.get_by_email(&email).await?.ok_or_else(invalid)?;
        let hash = user.password_hash.as_deref().ok_or_else(invalid)?;

        if !verify_password(password, hash)? {
            debug!(user_id = %user.id, "Password rejected");
            return Err(invalid());
        }

        let session = self
            .sessions
            .create(&user.id, SessionPurpose::Auth, None)
            .await?;
        info!(user_id = %user.id, "Email login");
        Ok(AuthOutcome { user, session })
    }

    // =========================================================================
    // Sessions and accounts
    // =========================================================================

    /// Resolve an auth session token to its user
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let unauthorized = || PeacemakingError::Unauthorized("invalid or expired session".into());

        let session = self.sessions.get(token).await?.ok_or_else(unauthorized)?;
        if session.purpose != SessionPurpose::Auth {
            return Err(unauthorized());
        }

        self.users
            .get_by_id(&session.user_id)
            .await?
            .ok_or_else(unauthorized)
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.delete(token).await
    }

    /// Revoke every session of the user
    pub async fn logout_all(&self, user_id: &str) -> Result<u64> {
        let removed = self.sessions.delete_for_user(user_id).await?;
        info!(user_id = %user_id, "Logged out of {} sessions", removed);
        Ok(removed)
    }

    pub async fn me(&self, user_id: &str) -> Result<User> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| PeacemakingError::NotFound(format!("user {}", user_id)))
    }

    pub async fn connect_wallet(&self, user_id: &str, address: &str) -> Result<User> {
        let address = normalize_address(address)?;
        if let Some(owner) = self.users.get_by_address(&address).await? {
            if owner.id != user_id {
                return Err(PeacemakingError::Conflict(
                    "address is bound to another user".into(),
                ));
            }
            return Ok(owner);
        }

        self.users.connect_wallet(user_id, &address).await?;
        info!(user_id = %user_id, "Wallet connected");
        self.me(user_id).await
    }

    /// Update the declared citizenship; the caller schedules the statistics
    /// refresh.
    pub async fn update_citizenship(
        &self,
        user_id: &str,
        citizenship: &str,
        city: Option<String>,
    ) -> Result<User> {
        let citizenship = citizenship.trim().to_ascii_uppercase();
        if citizenship.is_empty() {
            return Err(PeacemakingError::BadRequest("citizenship is required".into()));
        }

        let mut user = self.me(user_id).await?;
        user.citizenship = Some(citizenship);
        user.city = city.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        user.updated_at = self.clock.now();
        self.users.update(&user).await?;
        Ok(user)
    }
}
