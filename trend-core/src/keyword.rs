//! Keyword data structures shared by extraction, persistence and ranking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delimiter joining the two constituents of a composite keyword
pub const COMPOSITE_DELIMITER: char = ':';

/// Kind of a stored keyword row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeywordType {
    /// A standalone extracted keyword
    Single,
    /// Two keywords joined as one issue (e.g., "반도체:삼성전자")
    Composite,
}

impl KeywordType {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordType::Single => "SINGLE",
            KeywordType::Composite => "COMPOSITE",
        }
    }

    /// Parse the database representation, `None` for unknown or legacy values
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "SINGLE" => Some(KeywordType::Single),
            "COMPOSITE" => Some(KeywordType::Composite),
            _ => None,
        }
    }

    /// Classify raw keyword text by the presence of the composite delimiter
    pub fn classify(text: &str) -> Self {
        if text.contains(COMPOSITE_DELIMITER) {
            KeywordType::Composite
        } else {
            KeywordType::Single
        }
    }
}

/// A keyword with the weight it carries for one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordScore {
    pub keyword: String,
    pub score: f64,
}

impl KeywordScore {
    pub fn new(keyword: impl Into<String>, score: f64) -> Self {
        Self {
            keyword: keyword.into(),
            score,
        }
    }
}

/// Per-article extraction result waiting in the save buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingKeywordSave {
    pub article_id: i64,
    pub keywords: Vec<KeywordScore>,
}

/// A persisted keyword row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    pub id: i64,
    /// Unique canonical form
    pub normalized_text: String,
    pub display_text: String,
    #[serde(rename = "type")]
    pub keyword_type: Option<KeywordType>,
}

/// Link between an article and one of its keywords
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleKeywordLink {
    pub article_id: i64,
    pub keyword_id: i64,
    pub weight: f64,
    pub extracted_at: DateTime<Utc>,
}

/// Pre-aggregated counts for one keyword in one time bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesBucket {
    pub keyword_id: i64,
    pub bucket_time: DateTime<Utc>,
    pub freq: i64,
    pub score_sum: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_type_round_trip_through_db_text() {
        assert_eq!(KeywordType::from_db("SINGLE"), Some(KeywordType::Single));
        assert_eq!(KeywordType::from_db("COMPOSITE"), Some(KeywordType::Composite));
        assert_eq!(KeywordType::from_db("ALIAS"), None);
        assert_eq!(KeywordType::Composite.as_str(), "COMPOSITE");
    }

    #[test]
    fn test_classify_by_delimiter() {
        assert_eq!(KeywordType::classify("반도체:삼성전자"), KeywordType::Composite);
        assert_eq!(KeywordType::classify("반도체"), KeywordType::Single);
    }

    #[test]
    fn test_keyword_type_serializes_uppercase() {
        let json = serde_json::to_string(&KeywordType::Composite).unwrap();
        assert_eq!(json, "\"COMPOSITE\"");
    }
}
