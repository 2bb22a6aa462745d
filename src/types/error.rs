//! Error types for Proof of Peacemaking
//!
//! Every failure surfaced by the core maps onto one of these kinds and from
//! there onto an HTTP status.

use hyper::StatusCode;
use mongodb::error::{ErrorKind, WriteFailure};

/// Mongo server code for a unique index violation
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Main error type for Proof of Peacemaking operations
#[derive(Debug, thiserror::Error)]
pub enum PeacemakingError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PeacemakingError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short kind label used in JSON error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BadRequest",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFound(_) => "NotFound",
            Self::Conflict(_) => "Conflict",
            Self::Database(_) => "Database",
            Self::Internal(_) => "Internal",
            Self::Config(_) => "Config",
        }
    }

    /// The message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Database(m)
            | Self::Internal(m)
            | Self::Config(m) => m,
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.message(),
        });
        (status, body.to_string())
    }

    /// Wrap a store failure with context, keeping conflicts and absences intact
    pub fn context(self, what: &str) -> Self {
        match self {
            Self::Database(m) => Self::Database(format!("{}: {}", what, m)),
            Self::Internal(m) => Self::Internal(format!("{}: {}", what, m)),
            other => other,
        }
    }
}

impl From<std::io::Error> for PeacemakingError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for PeacemakingError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for PeacemakingError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for PeacemakingError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            Self::Conflict(format!("duplicate key: {}", err))
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<bson::ser::Error> for PeacemakingError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON encode error: {}", err))
    }
}

impl From<bson::de::Error> for PeacemakingError {
    fn from(err: bson::de::Error) -> Self {
        Self::Internal(format!("BSON decode error: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for PeacemakingError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Internal(format!("JWT error: {}", err))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(ce) => ce.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

/// Result type alias for Proof of Peacemaking operations
pub type Result<T> = std::result::Result<T, PeacemakingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PeacemakingError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PeacemakingError::Database("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            PeacemakingError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_body_is_json() {
        let (status, body) =
            PeacemakingError::BadRequest("invalid session type".into()).into_status_code_and_body();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["error"], "BadRequest");
        assert_eq!(parsed["message"], "invalid session type");
    }

    #[test]
    fn test_context_keeps_conflict() {
        let err = PeacemakingError::Conflict("taken".into()).context("create user");
        assert!(matches!(err, PeacemakingError::Conflict(m) if m == "taken"));
        let err = PeacemakingError::Database("down".into()).context("create user");
        assert_eq!(err.message(), "create user: down");
    }
}
