//! Ranking data structures

use serde::{Deserialize, Serialize};

use crate::keyword::KeywordType;

/// A ranking candidate as returned by the windowed score query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedKeyword {
    pub id: i64,
    pub display_text: String,
    #[serde(rename = "type")]
    pub keyword_type: Option<KeywordType>,
    /// Score accumulated over the full trailing window
    pub score_24h: f64,
    /// Score in the most recent hour
    pub score_recent: f64,
    /// Score in the hour before the most recent one
    pub score_prev: f64,
    /// `score_recent - score_prev`
    pub diff_score: f64,
    /// Ordering score
    pub final_score: f64,
}

/// Movement of an entry relative to the previous ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankStatus {
    New,
    Same,
    Up,
    Down,
}

/// One row of the published top-trends list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendEntry {
    #[serde(flatten)]
    pub keyword: RankedKeyword,
    /// 1-based position in this ranking
    pub rank: usize,
    /// Absolute number of positions moved since the previous ranking
    pub rank_change: usize,
    pub status: RankStatus,
}

impl TrendEntry {
    pub fn id(&self) -> i64 {
        self.keyword.id
    }
}
