//! Passkey registration and login
//!
//! Each ceremony spans two HTTP round-trips. `begin_*` stores the verifier's
//! state in a short-lived ceremony session; `finish_*` loads it back, checks
//! the session's purpose and hands the browser's response to the verifier.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::sessions::SessionManager;
use crate::domain::{new_id, PasskeyCredential, Session, SessionPurpose, User, UserPasskey};
use crate::ports::{Clock, WebauthnUser, WebauthnVerifier};
use crate::store::{PasskeyStore, UserStore};
use crate::types::{PeacemakingError, Result};

pub struct PasskeyService {
    users: Arc<dyn UserStore>,
    passkeys: Arc<dyn PasskeyStore>,
    sessions: Arc<SessionManager>,
    verifier: Arc<dyn WebauthnVerifier>,
    clock: Arc<dyn Clock>,
}

fn webauthn_user(user: &User) -> WebauthnUser {
    WebauthnUser {
        user_id: user.id.clone(),
        email: user.email.clone().unwrap_or_default(),
        username: user
            .username
            .clone()
            .or_else(|| user.email.clone())
            .unwrap_or_else(|| user.id.clone()),
    }
}

/// Sign counters must advance; authenticators without a counter report zero
/// forever and are let through.
fn sign_count_advanced(stored: u32, presented: u32) -> bool {
    presented > stored || (stored == 0 && presented == 0)
}

impl PasskeyService {
    pub fn new(
        users: Arc<dyn UserStore>,
        passkeys: Arc<dyn PasskeyStore>,
        sessions: Arc<SessionManager>,
        verifier: Arc<dyn WebauthnVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            passkeys,
            sessions,
            verifier,
            clock,
        }
    }

    /// Load a ceremony session and check it is of the expected kind
    async fn ceremony(&self, token: &str, expected: SessionPurpose) -> Result<(Session, Vec<u8>)> {
        let session = self
            .sessions
            .get(token)
            .await?
            .ok_or_else(|| PeacemakingError::Unauthorized("invalid or expired session".into()))?;

        if session.purpose != expected {
            return Err(PeacemakingError::BadRequest("invalid session type".into()));
        }

        let blob = session
            .ceremony
            .clone()
            .ok_or_else(|| PeacemakingError::BadRequest("missing ceremony data".into()))?;

        Ok((session, blob))
    }

    async fn ceremony_user(&self, session: &Session) -> Result<User> {
        self.users
            .get_by_id(&session.user_id)
            .await?
            .ok_or_else(|| PeacemakingError::Unauthorized("ceremony user no longer exists".into()))
    }

    /// Remove a user created for a registration that did not complete
    async fn compensate(&self, user_id: &str, ceremony_token: Option<&str>) {
        if let Err(e) = self.passkeys.delete_for_user(user_id).await {
            error!(user_id = %user_id, error = %e, "Failed to remove passkeys of abandoned registration");
        }
        if let Err(e) = self.users.delete(user_id).await {
            error!(user_id = %user_id, error = %e, "Failed to remove user of abandoned registration");
        }
        if let Some(token) = ceremony_token {
            if let Err(e) = self.sessions.delete(token).await {
                warn!(user_id = %user_id, error = %e, "Failed to remove registration session");
            }
        }
        info!(user_id = %user_id, "Abandoned registration rolled back");
    }

    /// Delete `user` if it is what an expired registration ceremony left
    /// behind: no passkey, password or wallet, and no registration in flight.
    /// Returns whether the user was removed.
    async fn reclaim_abandoned(&self, user: &User) -> Result<bool> {
        if user.password_hash.is_some() || user.address.is_some() {
            return Ok(false);
        }
        if !self.passkeys.credentials_for_user(&user.id).await?.is_empty() {
            return Ok(false);
        }
        if self
            .sessions
            .has_live(&user.id, SessionPurpose::RegistrationCeremony)
            .await?
        {
            return Ok(false);
        }

        self.sessions.delete_for_user(&user.id).await?;
        self.passkeys.delete_for_user(&user.id).await?;
        self.users.delete(&user.id).await?;
        info!(user_id = %user.id, "Reclaimed identifiers of an abandoned registration");
        Ok(true)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Create a tentative user and return creation options with the
    /// registration ceremony session
    pub async fn begin_registration(
        &self,
        email: &str,
        username: &str,
    ) -> Result<(serde_json::Value, Session)> {
        let email = email.trim().to_ascii_lowercase();
        let username = username.trim().to_string();
        if !email.contains('@') {
            return Err(PeacemakingError::BadRequest("invalid email address".into()));
        }
        if username.is_empty() {
            return Err(PeacemakingError::BadRequest("username is required".into()));
        }

        if let Some(existing) = self.users.get_by_email(&email).await? {
            if !self.reclaim_abandoned(&existing).await? {
                return Err(PeacemakingError::Conflict("email is already registered".into()));
            }
        }
        if let Some(existing) = self.users.get_by_username(&username).await? {
            if !self.reclaim_abandoned(&existing).await? {
                return Err(PeacemakingError::Conflict("username is taken".into()));
            }
        }

        let mut user = User::new(new_id(), self.clock.now());
        user.email = Some(email);
        user.username = Some(username);
        self.users.create(&user).await?;

        let started = async {
            let start = self.verifier.begin_registration(&webauthn_user(&user), &[])?;
            let session = self
                .sessions
                .create(
                    &user.id,
                    SessionPurpose::RegistrationCeremony,
                    Some(start.ceremony),
                )
                .await?;
            Ok::<_, PeacemakingError>((start.options, session))
        }
        .await;

        if started.is_err() {
            self.compensate(&user.id, None).await;
        } else {
            debug!(user_id = %user.id, "Passkey registration started");
        }
        started
    }

    /// Complete registration and return the new auth session
    pub async fn finish_registration(&self, token: &str, response: &[u8]) -> Result<Session> {
        let (ceremony, blob) = self
            .ceremony(token, SessionPurpose::RegistrationCeremony)
            .await?;
        let user = self.ceremony_user(&ceremony).await?;

        let finished = async {
            let verified =
                self.verifier
                    .finish_registration(&webauthn_user(&user), &blob, response)?;

            let now = self.clock.now();
            let credential = PasskeyCredential {
                id: new_id(),
                credential_id: verified.credential_id.clone(),
                public_key: verified.public_key,
                aaguid: verified.aaguid,
                sign_count: verified.sign_count,
                created_at: now,
                updated_at: now,
            };
            let binding = UserPasskey {
                user_id: user.id.clone(),
                credential_id: verified.credential_id,
                name: "Passkey".into(),
                device_info: String::new(),
                active: true,
                last_used_at: None,
                created_at: now,
            };
            self.passkeys.insert(&credential, &binding).await?;

            self.sessions.delete(token).await?;
            self.sessions
                .create(&user.id, SessionPurpose::Auth, None)
                .await
        }
        .await;

        match finished {
            Ok(session) => {
                info!(user_id = %user.id, "Passkey registered");
                Ok(session)
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Passkey registration failed");
                self.compensate(&user.id, Some(token)).await;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Return assertion options with the authentication ceremony session
    pub async fn begin_authentication(&self, email: &str) -> Result<(serde_json::Value, Session)> {
        let email = email.trim().to_ascii_lowercase();
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or_else(|| PeacemakingError::NotFound("no account for this email".into()))?;

        let credentials = self.passkeys.credentials_for_user(&user.id).await?;
        if credentials.is_empty() {
            return Err(PeacemakingError::BadRequest(
                "no passkey registered for this account".into(),
            ));
        }

        let start = self
            .verifier
            .begin_authentication(&webauthn_user(&user), &credentials)?;
        let session = self
            .sessions
            .create(
                &user.id,
                SessionPurpose::AuthenticationCeremony,
                Some(start.ceremony),
            )
            .await?;

        debug!(user_id = %user.id, "Passkey login started");
        Ok((start.options, session))
    }

    /// Verify the assertion, advance the sign count and return an auth session
    pub async fn finish_authentication(&self, token: &str, response: &[u8]) -> Result<Session> {
        let (ceremony, blob) = self
            .ceremony(token, SessionPurpose::AuthenticationCeremony)
            .await?;
        let user = self.ceremony_user(&ceremony).await?;
        let credentials = self.passkeys.credentials_for_user(&user.id).await?;

        let assertion = self.verifier.finish_authentication(
            &webauthn_user(&user),
            &blob,
            response,
            &credentials,
        )?;

        let stored = credentials
            .iter()
            .find(|c| c.credential_id == assertion.credential_id)
            .ok_or_else(|| PeacemakingError::Unauthorized("unknown credential".into()))?;

        if !sign_count_advanced(stored.sign_count, assertion.sign_count) {
            warn!(
                user_id = %user.id,
                stored = stored.sign_count,
                presented = assertion.sign_count,
                "Sign count did not advance, possible cloned authenticator"
            );
            return Err(PeacemakingError::Unauthorized(
                "sign count did not advance".into(),
            ));
        }

        let now = self.clock.now();
        if !self
            .passkeys
            .update_sign_count(
                &stored.credential_id,
                stored.sign_count,
                assertion.sign_count,
                assertion.public_key,
                now,
            )
            .await?
        {
            return Err(PeacemakingError::Unauthorized(
                "credential was used concurrently".into(),
            ));
        }
        self.passkeys.touch(&stored.credential_id, now).await?;

        self.sessions.delete(token).await?;
        let session = self
            .sessions
            .create(&user.id, SessionPurpose::Auth, None)
            .await?;
        info!(user_id = %user.id, "Passkey login");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_count_rule() {
        assert!(sign_count_advanced(0, 0));
        assert!(sign_count_advanced(0, 1));
        assert!(sign_count_advanced(4, 5));
        assert!(!sign_count_advanced(5, 5));
        assert!(!sign_count_advanced(5, 4));
        assert!(!sign_count_advanced(3, 0));
    }
}
