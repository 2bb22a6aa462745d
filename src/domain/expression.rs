use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{PeacemakingError, Result};

/// Content keyed by medium name, value is text or a media URL
pub type ContentMap = BTreeMap<String, String>;

/// Media an expression or acknowledgement can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    Text,
    Image,
    Audio,
    Video,
}

impl Medium {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Check that a content map is non-empty and only uses known media keys
pub fn validate_content(content: &ContentMap) -> Result<Vec<Medium>> {
    if content.is_empty() {
        return Err(PeacemakingError::BadRequest("content must not be empty".into()));
    }

    content
        .keys()
        .map(|key| {
            Medium::parse(key).ok_or_else(|| {
                PeacemakingError::BadRequest(format!("unrecognized medium: {}", key))
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionStatus {
    Draft,
    Confirmed,
}

impl ExpressionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
        }
    }
}

/// A multimodal utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expression {
    pub id: String,
    pub creator_id: String,
    pub content: ContentMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain_id: Option<i64>,
    pub status: ExpressionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content() {
        let mut content = ContentMap::new();
        assert!(matches!(
            validate_content(&content),
            Err(PeacemakingError::BadRequest(_))
        ));

        content.insert("text".into(), "peace be with you".into());
        content.insert("image".into(), "https://cdn.example.org/a.png".into());
        let media = validate_content(&content).unwrap();
        assert_eq!(media, vec![Medium::Image, Medium::Text]);

        content.insert("smell".into(), "roses".into());
        assert!(validate_content(&content).is_err());
    }
}
