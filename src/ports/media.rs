use reqwest::Url;

use crate::domain::Medium;
use crate::types::{PeacemakingError, Result};

/// Validates the value stored under each medium of a content map
pub trait MediaUrlValidator: Send + Sync {
    fn validate(&self, medium: Medium, value: &str) -> Result<()>;
}

/// Text must be non-blank; media must be an http(s) URL or an object storage key
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictMediaValidator;

impl MediaUrlValidator for StrictMediaValidator {
    fn validate(&self, medium: Medium, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(PeacemakingError::BadRequest(format!(
                "{} content must not be empty",
                medium.as_str()
            )));
        }

        if medium == Medium::Text {
            return Ok(());
        }

        if let Ok(url) = Url::parse(value) {
            return match url.scheme() {
                "http" | "https" if url.host_str().is_some() => Ok(()),
                scheme => Err(PeacemakingError::BadRequest(format!(
                    "unsupported {} URL scheme: {}",
                    medium.as_str(),
                    scheme
                ))),
            };
        }

        if is_storage_key(value) {
            Ok(())
        } else {
            Err(PeacemakingError::BadRequest(format!(
                "invalid {} reference",
                medium.as_str()
            )))
        }
    }
}

fn is_storage_key(value: &str) -> bool {
    !value.starts_with('/')
        && !value.contains("..")
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_urls() {
        let v = StrictMediaValidator;
        assert!(v.validate(Medium::Text, "peace").is_ok());
        assert!(v.validate(Medium::Text, "   ").is_err());
        assert!(v.validate(Medium::Image, "https://cdn.example.org/a.png").is_ok());
        assert!(v.validate(Medium::Audio, "uploads/audio/abc-123.webm").is_ok());
        assert!(v.validate(Medium::Video, "javascript:alert(1)").is_err());
        assert!(v.validate(Medium::Video, "../etc/passwd").is_err());
        assert!(v.validate(Medium::Image, "file:///etc/passwd").is_err());
    }
}
