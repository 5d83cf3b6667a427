//! Article job structures consumed from the scrape queue

use serde::{Deserialize, Serialize};

/// A scraped news article delivered through the work queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleJob {
    /// Article headline
    pub title: String,
    /// Scraped article body text
    #[serde(default)]
    pub content_body: String,
    /// Canonical article URL
    pub link: String,
    /// Publishing outlet (e.g., "연합뉴스")
    #[serde(default)]
    pub press: String,
    /// Identifier of the stored article row, when the collector has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_id: Option<i64>,
}

/// Queue envelope around an article job
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    /// Queue-assigned job id (stable per link)
    pub id: String,
    /// Number of delivery attempts so far, starting at 1
    pub attempt: u32,
    pub article: ArticleJob,
}
