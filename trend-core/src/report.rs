//! Report rows served by the data report endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Keyword totals over the most recent buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopKeyword {
    pub id: i64,
    pub display_text: String,
    pub freq_sum: i64,
    pub score_sum: f64,
}

/// One bucket of a keyword's timeseries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeKeyword {
    pub bucket_time: DateTime<Utc>,
    pub freq: i64,
    pub score_sum: f64,
}

/// A keyword co-occurring with another one in the same articles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedKeyword {
    pub id: i64,
    pub display_text: String,
    /// Number of shared articles
    pub co_count: i64,
    /// Sum of the related keyword's weights in those articles
    pub weight_sum: f64,
    /// `weight_sum * ln(co_count + 1)`
    pub association_score: f64,
}
