use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime of an authenticated session
pub const AUTH_SESSION_TTL_SECS: i64 = 86_400;

/// Lifetime of a WebAuthn ceremony session
pub const CEREMONY_SESSION_TTL_SECS: i64 = 300;

/// What a session token proves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPurpose {
    /// Long-lived proof of login
    Auth,
    /// Between `/webauthn/register/begin` and `/finish`
    RegistrationCeremony,
    /// Between `/webauthn/login/begin` and `/finish`
    AuthenticationCeremony,
}

impl SessionPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::RegistrationCeremony => "registration-ceremony",
            Self::AuthenticationCeremony => "authentication-ceremony",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auth" => Some(Self::Auth),
            "registration-ceremony" => Some(Self::RegistrationCeremony),
            "authentication-ceremony" => Some(Self::AuthenticationCeremony),
            _ => None,
        }
    }

    /// Default lifetime for sessions of this purpose
    pub fn ttl(&self) -> Duration {
        match self {
            Self::Auth => Duration::seconds(AUTH_SESSION_TTL_SECS),
            _ => Duration::seconds(CEREMONY_SESSION_TTL_SECS),
        }
    }

    /// Cookie that carries a token of this purpose
    pub fn cookie_name(&self) -> &'static str {
        match self {
            Self::Auth => "session",
            Self::RegistrationCeremony => "registration_session",
            Self::AuthenticationCeremony => "auth_session",
        }
    }
}

/// A bearer token bound to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub purpose: SessionPurpose,
    /// Serialized WebAuthn ceremony state (ceremony sessions only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceremony: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_ttls() {
        assert_eq!(SessionPurpose::Auth.ttl().num_seconds(), 86_400);
        assert_eq!(SessionPurpose::RegistrationCeremony.ttl().num_seconds(), 300);
        assert_eq!(SessionPurpose::AuthenticationCeremony.ttl().num_seconds(), 300);
    }

    #[test]
    fn test_purpose_names() {
        for purpose in [
            SessionPurpose::Auth,
            SessionPurpose::RegistrationCeremony,
            SessionPurpose::AuthenticationCeremony,
        ] {
            assert_eq!(SessionPurpose::parse(purpose.as_str()), Some(purpose));
        }
        assert_eq!(SessionPurpose::AuthenticationCeremony.cookie_name(), "auth_session");
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let session = Session {
            token: "t".into(),
            user_id: "u".into(),
            purpose: SessionPurpose::Auth,
            ceremony: None,
            created_at: now,
            updated_at: now,
            expires_at: now,
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - Duration::seconds(1)));
    }
}
