//! Data Report Service
//!
//! Read-only reports over persisted keywords and their timeseries.

use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use trend_core::{
    ArticleKeywordLink, Keyword, RelatedKeyword, TimeKeyword, TopKeyword, TrendError, TrendResult,
};

use crate::keyword_storage::KeywordStorage;

const RECENT_BUCKETS_RANGE: RangeInclusive<usize> = 1..=200;
const LIMIT_RANGE: RangeInclusive<usize> = 1..=100;

/// Parameters of the bucket ranking report
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingQuery {
    /// Number of most recent buckets summed
    pub recent_buckets: usize,
    pub limit: usize,
}

impl Default for RankingQuery {
    fn default() -> Self {
        Self {
            recent_buckets: 12,
            limit: 5,
        }
    }
}

/// Parameters of the keyword timeseries report
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesQuery {
    pub keyword_id: i64,
    #[serde(default = "default_timeseries_limit")]
    pub limit: usize,
}

/// Parameters of the related keywords report
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedQuery {
    pub keyword_id: i64,
    #[serde(default = "default_related_limit")]
    pub limit: usize,
}

/// Parameters of the keyword lookup
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordQuery {
    pub text: String,
}

/// Parameters of the per-article keyword report
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleKeywordsQuery {
    pub article_id: i64,
}

fn default_timeseries_limit() -> usize {
    5
}

fn default_related_limit() -> usize {
    10
}

fn check_range(field: &str, value: usize, range: RangeInclusive<usize>) -> TrendResult<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(TrendError::invalid_request(format!(
            "{} must be between {} and {}, got {}",
            field,
            range.start(),
            range.end(),
            value
        )))
    }
}

/// Service for the data report endpoints
pub struct ReportService {
    storage: Arc<KeywordStorage>,
}

impl ReportService {
    pub fn new(storage: Arc<KeywordStorage>) -> Self {
        Self { storage }
    }

    /// Keywords ranked by score over the most recent buckets
    pub fn ranking(&self, query: &RankingQuery) -> TrendResult<Vec<TopKeyword>> {
        check_range("recentBuckets", query.recent_buckets, RECENT_BUCKETS_RANGE)?;
        check_range("limit", query.limit, LIMIT_RANGE)?;

        debug!(
            "Bucket ranking: {} buckets, limit {}",
            query.recent_buckets, query.limit
        );
        Ok(self.storage.top_keywords(query.recent_buckets, query.limit)?)
    }

    /// Latest buckets of one keyword
    pub fn timeseries(&self, query: &TimeseriesQuery) -> TrendResult<Vec<TimeKeyword>> {
        check_range("limit", query.limit, LIMIT_RANGE)?;
        Ok(self.storage.keyword_timeseries(query.keyword_id, query.limit)?)
    }

    /// Total number of stored keywords
    pub fn count_keywords(&self) -> TrendResult<usize> {
        Ok(self.storage.count_keywords()?)
    }

    /// Number of articles that produced stored keywords
    pub fn count_articles(&self) -> TrendResult<usize> {
        Ok(self.storage.count_articles()?)
    }

    /// Stored keyword matching `text` after normalization
    pub fn keyword(&self, query: &KeywordQuery) -> TrendResult<Keyword> {
        self.storage
            .get_keyword(&query.text)?
            .ok_or_else(|| TrendError::not_found(format!("Keyword not found: {}", query.text)))
    }

    /// Keyword links stored for one article
    pub fn article_keywords(&self, query: &ArticleKeywordsQuery) -> TrendResult<Vec<ArticleKeywordLink>> {
        Ok(self.storage.article_links(query.article_id)?)
    }

    /// Keywords co-occurring with one keyword
    pub fn related_keywords(&self, query: &RelatedQuery) -> TrendResult<Vec<RelatedKeyword>> {
        check_range("limit", query.limit, LIMIT_RANGE)?;
        Ok(self.storage.related_keywords(query.keyword_id, query.limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trend_core::{KeywordScore, PendingKeywordSave};

    fn seeded() -> ReportService {
        let storage = Arc::new(KeywordStorage::new_in_memory().unwrap());
        storage
            .save_batch(
                &[PendingKeywordSave {
                    article_id: 1,
                    keywords: vec![KeywordScore::new("금리", 12.0), KeywordScore::new("환율", 11.0)],
                }],
                KeywordStorage::bucket_time(Utc::now(), 5),
            )
            .unwrap();
        ReportService::new(storage)
    }

    #[test]
    fn test_ranking_defaults_and_bounds() {
        let service = seeded();

        let rows = service.ranking(&RankingQuery::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].display_text, "금리");

        let too_many = RankingQuery {
            recent_buckets: 201,
            ..RankingQuery::default()
        };
        assert!(matches!(
            service.ranking(&too_many),
            Err(TrendError::InvalidRequest(_))
        ));

        let zero = RankingQuery {
            limit: 0,
            ..RankingQuery::default()
        };
        assert!(service.ranking(&zero).is_err());
    }

    #[test]
    fn test_query_deserialization_defaults() {
        let q: RankingQuery = serde_json::from_str("{}").unwrap();
        assert_eq!((q.recent_buckets, q.limit), (12, 5));

        let t: TimeseriesQuery = serde_json::from_str(r#"{"keywordId": 3}"#).unwrap();
        assert_eq!((t.keyword_id, t.limit), (3, 5));
    }

    #[test]
    fn test_count_timeseries_related() {
        let service = seeded();
        assert_eq!(service.count_keywords().unwrap(), 2);

        let id = service.storage.get_keyword("금리").unwrap().unwrap().id;
        let series = service
            .timeseries(&TimeseriesQuery { keyword_id: id, limit: 5 })
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].freq, 1);

        let related = service
            .related_keywords(&RelatedQuery { keyword_id: id, limit: 10 })
            .unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].display_text, "환율");
    }

    #[test]
    fn test_keyword_lookup_and_article_reports() {
        let service = seeded();
        assert_eq!(service.count_articles().unwrap(), 1);

        let keyword = service
            .keyword(&KeywordQuery {
                text: " 「금리」 ".to_string(),
            })
            .unwrap();
        assert_eq!(keyword.display_text, "금리");

        let missing = service.keyword(&KeywordQuery {
            text: "물가".to_string(),
        });
        assert!(matches!(missing, Err(TrendError::NotFound(_))));

        let links = service
            .article_keywords(&ArticleKeywordsQuery { article_id: 1 })
            .unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().any(|l| l.keyword_id == keyword.id && l.weight == 12.0));
        assert!(service
            .article_keywords(&ArticleKeywordsQuery { article_id: 2 })
            .unwrap()
            .is_empty());
    }
}
