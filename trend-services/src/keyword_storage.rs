//! Keyword Storage Service
//!
//! SQLite-based storage for extracted keywords, article links and the
//! bucketed keyword timeseries that feeds the trend ranking.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, DurationRound, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, instrument};
use trend_core::{
    ArticleKeywordLink, Keyword, KeywordType, PendingKeywordSave, RankedKeyword, RelatedKeyword,
    TimeKeyword, TopKeyword, TrendError,
};

/// Normalized keywords outside this char-length range are discarded
const MIN_KEYWORD_CHARS: usize = 2;
const MAX_KEYWORD_CHARS: usize = 40;

/// Company markers removed before bracket stripping would mangle them
const CORPORATE_PREFIXES: &[&str] = &["(주)", "주)"];

/// Byline and corporate prefixes dropped from the start of a keyword
const NOISE_PREFIXES: &[&str] = &["주식회사", "기자", "사진", "제공", "속보"];

/// Byline suffixes dropped from the end of a keyword
const NOISE_SUFFIXES: &[&str] = &["기자", "사진", "제공", "속보"];

/// Bracket and quote marks removed during normalization
const NORMALIZE_STRIP_CHARS: &[char] = &[
    '(', ')', '「', '」', '『', '』', '《', '》', '〈', '〉', '【', '】', '〔', '〕', '"', '\'',
    '“', '”', '‘', '’', '.',
];

/// Window used for the related-keyword report
const RELATED_WINDOW_HOURS: i64 = 10;

/// Outcome of one batch write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Articles in the batch
    pub articles: usize,
    /// Distinct normalized keywords upserted
    pub keywords: usize,
    /// Newly inserted article links (conflicts excluded)
    pub links_inserted: usize,
    /// Timeseries buckets inserted or incremented
    pub buckets_upserted: usize,
}

/// A keyword occurrence that survived normalization
struct ValidKeyword<'a> {
    article_id: i64,
    display_text: &'a str,
    normalized_text: String,
    score: f64,
}

/// Keyword storage service using SQLite
pub struct KeywordStorage {
    conn: Mutex<Connection>,
}

impl KeywordStorage {
    /// Create a new KeywordStorage instance
    ///
    /// Creates the database file and tables if they don't exist.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, KeywordStorageError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                KeywordStorageError::Io(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path.as_ref()).map_err(KeywordStorageError::Database)?;

        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;

        info!("Initialized keyword storage at: {:?}", db_path.as_ref());
        Ok(storage)
    }

    /// Create an in-memory KeywordStorage (useful for testing)
    pub fn new_in_memory() -> Result<Self, KeywordStorageError> {
        let conn = Connection::open_in_memory().map_err(KeywordStorageError::Database)?;

        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;

        Ok(storage)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<(), KeywordStorageError> {
        let conn = self.conn.lock().map_err(|_| KeywordStorageError::LockError)?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS keywords (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                normalized_text TEXT NOT NULL UNIQUE,
                display_text TEXT NOT NULL,
                type TEXT,
                created_at INTEGER DEFAULT (strftime('%s', 'now'))
            );

            CREATE TABLE IF NOT EXISTS article_keywords (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL,
                keyword_id INTEGER NOT NULL REFERENCES keywords(id) ON DELETE CASCADE,
                weight REAL NOT NULL DEFAULT 1.0,
                extracted_at INTEGER NOT NULL,
                UNIQUE (article_id, keyword_id)
            );

            CREATE INDEX IF NOT EXISTS idx_article_keywords_keyword_article
            ON article_keywords(keyword_id, article_id);

            CREATE TABLE IF NOT EXISTS keyword_timeseries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                keyword_id INTEGER NOT NULL REFERENCES keywords(id) ON DELETE CASCADE,
                bucket_time INTEGER NOT NULL,
                freq INTEGER NOT NULL DEFAULT 0,
                score_sum REAL NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL,
                UNIQUE (keyword_id, bucket_time)
            );

            CREATE INDEX IF NOT EXISTS idx_keyword_timeseries_bucket_score
            ON keyword_timeseries(bucket_time, score_sum);
            "#,
        )
        .map_err(KeywordStorageError::Database)?;

        Ok(())
    }

    /// Floor a timestamp to its `bucket_minutes` boundary (UTC)
    pub fn bucket_time(date: DateTime<Utc>, bucket_minutes: u32) -> DateTime<Utc> {
        let width = Duration::minutes(i64::from(bucket_minutes.max(1)));
        date.duration_trunc(width).unwrap_or(date)
    }

    /// Persist a flushed batch of per-article keywords in one transaction
    ///
    /// Keywords are normalized and deduplicated, links are inserted with
    /// conflicts ignored, and timeseries rows are summed per
    /// `(keyword, bucket)` before an accumulating upsert. Any failure rolls
    /// the whole batch back.
    #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
    pub fn save_batch(
        &self,
        batch: &[PendingKeywordSave],
        bucket_time: DateTime<Utc>,
    ) -> Result<BatchSummary, KeywordStorageError> {
        let mut summary = BatchSummary {
            articles: batch.len(),
            ..BatchSummary::default()
        };
        if batch.is_empty() {
            return Ok(summary);
        }

        let mut conn = self.conn.lock().map_err(|_| KeywordStorageError::LockError)?;
        let tx = conn.transaction()?;

        let valid: Vec<ValidKeyword<'_>> = batch
            .iter()
            .flat_map(|article| {
                article.keywords.iter().filter_map(move |kw| {
                    normalize_keyword(&kw.keyword).map(|normalized_text| ValidKeyword {
                        article_id: article.article_id,
                        display_text: &kw.keyword,
                        normalized_text,
                        score: kw.score,
                    })
                })
            })
            .collect();

        if valid.is_empty() {
            tx.commit()?;
            return Ok(summary);
        }

        // First occurrence decides the display text
        let mut unique: Vec<(&str, &str)> = Vec::new();
        for kw in &valid {
            if !unique.iter().any(|(normalized, _)| *normalized == kw.normalized_text) {
                unique.push((kw.normalized_text.as_str(), kw.display_text));
            }
        }

        let mut keyword_ids: HashMap<&str, i64> = HashMap::with_capacity(unique.len());
        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO keywords (normalized_text, display_text, type)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(normalized_text) DO UPDATE SET
                    display_text = excluded.display_text,
                    type = COALESCE(keywords.type, excluded.type)
                RETURNING id
                "#,
            )?;
            for (normalized, display) in &unique {
                let id: i64 = stmt.query_row(
                    params![normalized, display, KeywordType::classify(display).as_str()],
                    |row| row.get(0),
                )?;
                keyword_ids.insert(*normalized, id);
            }
        }
        summary.keywords = keyword_ids.len();

        let extracted_at = Utc::now().timestamp();
        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO article_keywords (article_id, keyword_id, weight, extracted_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(article_id, keyword_id) DO NOTHING
                "#,
            )?;
            for kw in &valid {
                if let Some(keyword_id) = keyword_ids.get(kw.normalized_text.as_str()) {
                    summary.links_inserted +=
                        stmt.execute(params![kw.article_id, keyword_id, kw.score, extracted_at])?;
                }
            }
        }

        // One upsert resolves each row's conflict once, so sum locally first
        let mut buckets: BTreeMap<i64, (i64, f64)> = BTreeMap::new();
        for kw in &valid {
            if let Some(keyword_id) = keyword_ids.get(kw.normalized_text.as_str()) {
                let entry = buckets.entry(*keyword_id).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += kw.score;
            }
        }

        {
            let bucket_ts = bucket_time.timestamp();
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO keyword_timeseries (keyword_id, bucket_time, freq, score_sum, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(keyword_id, bucket_time) DO UPDATE SET
                    freq = keyword_timeseries.freq + excluded.freq,
                    score_sum = keyword_timeseries.score_sum + excluded.score_sum,
                    updated_at = excluded.updated_at
                "#,
            )?;
            for (keyword_id, (freq, score_sum)) in &buckets {
                stmt.execute(params![keyword_id, bucket_ts, freq, score_sum, extracted_at])?;
            }
        }
        summary.buckets_upserted = buckets.len();

        tx.commit()?;

        debug!(
            "Saved keyword batch: {} articles, {} keywords, {} new links, {} buckets",
            summary.articles, summary.keywords, summary.links_inserted, summary.buckets_upserted
        );
        Ok(summary)
    }

    /// Ranking candidates over the trailing window, best first
    ///
    /// `score_recent` covers the last hour and `score_prev` the hour before;
    /// `final_score = score_24h + max(score_recent - score_prev, 0)`.
    pub fn ranked_candidates_at(
        &self,
        now: DateTime<Utc>,
        window: Duration,
        limit: usize,
    ) -> Result<Vec<RankedKeyword>, KeywordStorageError> {
        let conn = self.conn.lock().map_err(|_| KeywordStorageError::LockError)?;

        let window_start = (now - window).timestamp();
        let recent_start = (now - Duration::hours(1)).timestamp();
        let prev_start = (now - Duration::hours(2)).timestamp();

        let mut stmt = conn.prepare(
            r#"
            SELECT id, display_text, type, score_24h, score_recent, score_prev,
                   score_recent - score_prev AS diff_score,
                   score_24h + MAX(score_recent - score_prev, 0) AS final_score
            FROM (
                SELECT k.id AS id,
                       k.display_text AS display_text,
                       k.type AS type,
                       SUM(ts.score_sum) AS score_24h,
                       SUM(CASE WHEN ts.bucket_time >= ?2 THEN ts.score_sum ELSE 0 END) AS score_recent,
                       SUM(CASE WHEN ts.bucket_time >= ?3 AND ts.bucket_time < ?2
                                THEN ts.score_sum ELSE 0 END) AS score_prev
                FROM keyword_timeseries ts
                JOIN keywords k ON k.id = ts.keyword_id
                WHERE ts.bucket_time >= ?1
                GROUP BY k.id, k.display_text, k.type
            )
            ORDER BY final_score DESC, id ASC
            LIMIT ?4
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![window_start, recent_start, prev_start, sql_limit(limit)],
                |row| {
                    let keyword_type: Option<String> = row.get(2)?;
                    Ok(RankedKeyword {
                        id: row.get(0)?,
                        display_text: row.get(1)?,
                        keyword_type: keyword_type.as_deref().and_then(KeywordType::from_db),
                        score_24h: row.get(3)?,
                        score_recent: row.get(4)?,
                        score_prev: row.get(5)?,
                        diff_score: row.get(6)?,
                        final_score: row.get(7)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Keyword totals over the `recent_buckets` most recent bucket times
    pub fn top_keywords(
        &self,
        recent_buckets: usize,
        limit: usize,
    ) -> Result<Vec<TopKeyword>, KeywordStorageError> {
        let conn = self.conn.lock().map_err(|_| KeywordStorageError::LockError)?;

        let mut stmt = conn.prepare(
            r#"
            SELECT k.id, k.display_text, SUM(ts.freq) AS freq_sum, SUM(ts.score_sum) AS score_sum
            FROM keyword_timeseries ts
            JOIN keywords k ON k.id = ts.keyword_id
            WHERE ts.bucket_time IN (
                SELECT DISTINCT bucket_time FROM keyword_timeseries
                ORDER BY bucket_time DESC
                LIMIT ?1
            )
            GROUP BY k.id, k.display_text
            ORDER BY score_sum DESC, k.id ASC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt
            .query_map(params![sql_limit(recent_buckets), sql_limit(limit)], |row| {
                Ok(TopKeyword {
                    id: row.get(0)?,
                    display_text: row.get(1)?,
                    freq_sum: row.get(2)?,
                    score_sum: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Most recent buckets of one keyword, newest first
    pub fn keyword_timeseries(
        &self,
        keyword_id: i64,
        limit: usize,
    ) -> Result<Vec<TimeKeyword>, KeywordStorageError> {
        let conn = self.conn.lock().map_err(|_| KeywordStorageError::LockError)?;

        let mut stmt = conn.prepare(
            r#"
            SELECT bucket_time, freq, score_sum
            FROM keyword_timeseries
            WHERE keyword_id = ?1
            ORDER BY bucket_time DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt
            .query_map(params![keyword_id, sql_limit(limit)], |row| {
                let bucket_time: i64 = row.get(0)?;
                Ok(TimeKeyword {
                    bucket_time: DateTime::from_timestamp(bucket_time, 0).unwrap_or_else(Utc::now),
                    freq: row.get(1)?,
                    score_sum: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Keywords sharing recent articles with `keyword_id`, strongest first
    pub fn related_keywords(
        &self,
        keyword_id: i64,
        limit: usize,
    ) -> Result<Vec<RelatedKeyword>, KeywordStorageError> {
        let conn = self.conn.lock().map_err(|_| KeywordStorageError::LockError)?;
        let cutoff = (Utc::now() - Duration::hours(RELATED_WINDOW_HOURS)).timestamp();

        let mut stmt = conn.prepare(
            r#"
            WITH target_articles AS (
                SELECT article_id
                FROM article_keywords
                WHERE keyword_id = ?1 AND extracted_at >= ?2
            )
            SELECT k2.id, k2.display_text, COUNT(*) AS co_count, SUM(ak2.weight) AS weight_sum
            FROM target_articles ta
            JOIN article_keywords ak2 ON ak2.article_id = ta.article_id
            JOIN keywords k2 ON k2.id = ak2.keyword_id
            WHERE ak2.keyword_id <> ?1
            GROUP BY k2.id, k2.display_text
            "#,
        )?;

        let mut rows = stmt
            .query_map(params![keyword_id, cutoff], |row| {
                let co_count: i64 = row.get(2)?;
                let weight_sum: f64 = row.get(3)?;
                Ok(RelatedKeyword {
                    id: row.get(0)?,
                    display_text: row.get(1)?,
                    co_count,
                    weight_sum,
                    association_score: weight_sum * ((co_count + 1) as f64).ln(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.sort_by(|a, b| {
            b.association_score
                .total_cmp(&a.association_score)
                .then(a.id.cmp(&b.id))
        });
        rows.truncate(limit);

        Ok(rows)
    }

    /// Total number of stored keywords
    pub fn count_keywords(&self) -> Result<usize, KeywordStorageError> {
        let conn = self.conn.lock().map_err(|_| KeywordStorageError::LockError)?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM keywords", [], |row| row.get(0))?;

        Ok(count as usize)
    }

    /// Number of distinct articles with at least one stored keyword
    pub fn count_articles(&self) -> Result<usize, KeywordStorageError> {
        let conn = self.conn.lock().map_err(|_| KeywordStorageError::LockError)?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT article_id) FROM article_keywords",
            [],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    /// Look up a keyword by raw text (normalized before lookup)
    pub fn get_keyword(&self, text: &str) -> Result<Option<Keyword>, KeywordStorageError> {
        let Some(normalized) = normalize_keyword(text) else {
            return Ok(None);
        };
        let conn = self.conn.lock().map_err(|_| KeywordStorageError::LockError)?;

        let keyword = conn
            .query_row(
                "SELECT id, normalized_text, display_text, type FROM keywords WHERE normalized_text = ?1",
                params![normalized],
                |row| {
                    let keyword_type: Option<String> = row.get(3)?;
                    Ok(Keyword {
                        id: row.get(0)?,
                        normalized_text: row.get(1)?,
                        display_text: row.get(2)?,
                        keyword_type: keyword_type.as_deref().and_then(KeywordType::from_db),
                    })
                },
            )
            .optional()?;

        Ok(keyword)
    }

    /// All keyword links of one article
    pub fn article_links(&self, article_id: i64) -> Result<Vec<ArticleKeywordLink>, KeywordStorageError> {
        let conn = self.conn.lock().map_err(|_| KeywordStorageError::LockError)?;

        let mut stmt = conn.prepare(
            r#"
            SELECT article_id, keyword_id, weight, extracted_at
            FROM article_keywords
            WHERE article_id = ?1
            ORDER BY keyword_id ASC
            "#,
        )?;

        let rows = stmt
            .query_map(params![article_id], |row| {
                let extracted_at: i64 = row.get(3)?;
                Ok(ArticleKeywordLink {
                    article_id: row.get(0)?,
                    keyword_id: row.get(1)?,
                    weight: row.get(2)?,
                    extracted_at: DateTime::from_timestamp(extracted_at, 0)
                        .unwrap_or_else(Utc::now),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    #[cfg(test)]
    fn get_bucket(
        &self,
        keyword_id: i64,
        bucket_time: DateTime<Utc>,
    ) -> Result<Option<trend_core::TimeseriesBucket>, KeywordStorageError> {
        let conn = self.conn.lock().map_err(|_| KeywordStorageError::LockError)?;

        let bucket = conn
            .query_row(
                r#"
                SELECT keyword_id, bucket_time, freq, score_sum
                FROM keyword_timeseries
                WHERE keyword_id = ?1 AND bucket_time = ?2
                "#,
                params![keyword_id, bucket_time.timestamp()],
                |row| {
                    let ts: i64 = row.get(1)?;
                    Ok(trend_core::TimeseriesBucket {
                        keyword_id: row.get(0)?,
                        bucket_time: DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now),
                        freq: row.get(2)?,
                        score_sum: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(bucket)
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Canonical form of a raw keyword, `None` when it normalizes to noise
///
/// Trims and collapses whitespace, strips bracket/quote marks and periods,
/// lowercases, and removes byline/corporate prefixes and suffixes.
pub fn normalize_keyword(keyword: &str) -> Option<String> {
    let mut normalized = keyword.split_whitespace().collect::<Vec<_>>().join(" ");

    for prefix in CORPORATE_PREFIXES {
        if let Some(rest) = normalized.strip_prefix(prefix) {
            normalized = rest.trim_start().to_string();
            break;
        }
    }

    normalized = normalized
        .chars()
        .filter(|c| !NORMALIZE_STRIP_CHARS.contains(c))
        .collect::<String>()
        .to_lowercase();

    for prefix in NOISE_PREFIXES {
        if let Some(rest) = normalized.strip_prefix(prefix) {
            normalized = rest.trim_start().to_string();
            break;
        }
    }

    for suffix in NOISE_SUFFIXES {
        if let Some(rest) = normalized.strip_suffix(suffix) {
            normalized = rest.trim_end().to_string();
            break;
        }
    }

    let normalized = normalized.trim();
    let len = normalized.chars().count();
    if !(MIN_KEYWORD_CHARS..=MAX_KEYWORD_CHARS).contains(&len) {
        return None;
    }

    Some(normalized.to_string())
}

/// Errors that can occur during keyword storage operations
#[derive(Debug, thiserror::Error)]
pub enum KeywordStorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Failed to acquire lock")]
    LockError,
}

impl From<KeywordStorageError> for TrendError {
    fn from(err: KeywordStorageError) -> Self {
        TrendError::storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use trend_core::KeywordScore;

    fn pending(article_id: i64, keywords: &[(&str, f64)]) -> PendingKeywordSave {
        PendingKeywordSave {
            article_id,
            keywords: keywords
                .iter()
                .map(|(kw, score)| KeywordScore::new(*kw, *score))
                .collect(),
        }
    }

    fn bucket() -> DateTime<Utc> {
        KeywordStorage::bucket_time(Utc::now(), 5)
    }

    #[test]
    fn test_normalize_keyword() {
        assert_eq!(normalize_keyword("  반도체  "), Some("반도체".to_string()));
        assert_eq!(normalize_keyword("「Samsung」 Electronics."), Some("samsung electronics".to_string()));
        assert_eq!(normalize_keyword("(주)삼성전자"), Some("삼성전자".to_string()));
        assert_eq!(normalize_keyword("홍길동 기자"), Some("홍길동".to_string()));
        assert_eq!(normalize_keyword("속보 환율"), Some("환율".to_string()));
        assert_eq!(normalize_keyword("a"), None);
        assert_eq!(normalize_keyword(&"가".repeat(41)), None);
        assert_eq!(normalize_keyword("반도체:삼성전자"), Some("반도체:삼성전자".to_string()));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let raw = " 『Hello   World』 ";
        assert_eq!(normalize_keyword(raw), normalize_keyword(raw));
    }

    #[test]
    fn test_bucket_time_floors_to_boundary() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 7, 31).unwrap();
        assert_eq!(
            KeywordStorage::bucket_time(t, 5),
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 5, 0).unwrap()
        );
        assert_eq!(
            KeywordStorage::bucket_time(t, 60),
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_save_batch_creates_keywords_links_and_buckets() {
        let storage = KeywordStorage::new_in_memory().unwrap();
        let bucket = bucket();

        let summary = storage
            .save_batch(
                &[pending(1, &[("반도체", 14.0), ("삼성전자", 13.0), ("반도체:삼성전자", 19.0)])],
                bucket,
            )
            .unwrap();

        assert_eq!(summary.articles, 1);
        assert_eq!(summary.keywords, 3);
        assert_eq!(summary.links_inserted, 3);
        assert_eq!(summary.buckets_upserted, 3);

        let composite = storage.get_keyword("반도체:삼성전자").unwrap().unwrap();
        assert_eq!(composite.keyword_type, Some(KeywordType::Composite));
        let single = storage.get_keyword("반도체").unwrap().unwrap();
        assert_eq!(single.keyword_type, Some(KeywordType::Single));

        let b = storage.get_bucket(composite.id, bucket).unwrap().unwrap();
        assert_eq!(b.freq, 1);
        assert_eq!(b.score_sum, 19.0);
        assert_eq!(storage.count_keywords().unwrap(), 3);
    }

    #[test]
    fn test_relinking_same_pair_is_noop() {
        let storage = KeywordStorage::new_in_memory().unwrap();
        let bucket = bucket();
        let batch = [pending(7, &[("금리", 12.0), ("환율", 11.0)])];

        storage.save_batch(&batch, bucket).unwrap();
        let second = storage.save_batch(&batch, bucket).unwrap();

        assert_eq!(second.links_inserted, 0);
        assert_eq!(storage.article_links(7).unwrap().len(), 2);
    }

    #[test]
    fn test_bucket_only_accumulates() {
        let storage = KeywordStorage::new_in_memory().unwrap();
        let bucket = bucket();

        storage.save_batch(&[pending(1, &[("금리", 12.0)])], bucket).unwrap();
        storage.save_batch(&[pending(1, &[("금리", 12.0)])], bucket).unwrap();
        storage.save_batch(&[pending(2, &[("금리", 11.0)])], bucket).unwrap();

        let id = storage.get_keyword("금리").unwrap().unwrap().id;
        let b = storage.get_bucket(id, bucket).unwrap().unwrap();
        assert_eq!(b.freq, 3);
        assert_eq!(b.score_sum, 35.0);
    }

    #[test]
    fn test_duplicates_within_batch_are_aggregated() {
        let storage = KeywordStorage::new_in_memory().unwrap();
        let bucket = bucket();

        let summary = storage
            .save_batch(
                &[
                    pending(1, &[("Fed", 12.0)]),
                    pending(2, &[("fed", 11.0)]),
                    pending(3, &[("FED.", 10.0)]),
                ],
                bucket,
            )
            .unwrap();

        assert_eq!(summary.keywords, 1);
        assert_eq!(summary.buckets_upserted, 1);

        let keyword = storage.get_keyword("fed").unwrap().unwrap();
        // First occurrence in the batch sets the display text
        assert_eq!(keyword.display_text, "Fed");
        let b = storage.get_bucket(keyword.id, bucket).unwrap().unwrap();
        assert_eq!(b.freq, 3);
        assert_eq!(b.score_sum, 33.0);
    }

    #[test]
    fn test_failed_batch_rolls_back_everything() {
        let storage = KeywordStorage::new_in_memory().unwrap();
        let bucket = bucket();

        // NaN binds as NULL and trips the NOT NULL weight after the keyword upserts ran
        let result = storage.save_batch(&[pending(1, &[("금리", 12.0), ("환율", f64::NAN)])], bucket);
        assert!(matches!(result, Err(KeywordStorageError::Database(_))));

        assert_eq!(storage.count_keywords().unwrap(), 0);
        assert_eq!(storage.count_articles().unwrap(), 0);
        assert!(storage.article_links(1).unwrap().is_empty());
        assert!(storage.top_keywords(200, 100).unwrap().is_empty());

        // The connection stays usable after the rollback
        storage.save_batch(&[pending(1, &[("금리", 12.0)])], bucket).unwrap();
        let id = storage.get_keyword("금리").unwrap().unwrap().id;
        assert_eq!(storage.get_bucket(id, bucket).unwrap().unwrap().freq, 1);
    }

    #[test]
    fn test_count_articles_is_distinct() {
        let storage = KeywordStorage::new_in_memory().unwrap();
        storage
            .save_batch(
                &[
                    pending(1, &[("금리", 12.0), ("환율", 11.0)]),
                    pending(2, &[("금리", 11.0)]),
                ],
                bucket(),
            )
            .unwrap();

        assert_eq!(storage.count_articles().unwrap(), 2);
    }

    #[test]
    fn test_noise_only_batch_writes_nothing() {
        let storage = KeywordStorage::new_in_memory().unwrap();
        let summary = storage
            .save_batch(&[pending(1, &[("a", 10.0), ("기자", 9.0)])], bucket())
            .unwrap();

        assert_eq!(summary.keywords, 0);
        assert_eq!(storage.count_keywords().unwrap(), 0);
    }

    #[test]
    fn test_ranked_candidates_order_and_window() {
        let storage = KeywordStorage::new_in_memory().unwrap();
        let now = Utc::now();

        storage
            .save_batch(&[pending(1, &[("금리", 10.0)])], KeywordStorage::bucket_time(now, 5))
            .unwrap();
        storage
            .save_batch(&[pending(2, &[("환율", 30.0)])], KeywordStorage::bucket_time(now, 5))
            .unwrap();
        // Outside the 24h window
        storage
            .save_batch(&[pending(3, &[("물가", 99.0)])], now - Duration::hours(30))
            .unwrap();

        let rows = storage
            .ranked_candidates_at(now, Duration::hours(24), 10)
            .unwrap();

        let names: Vec<&str> = rows.iter().map(|r| r.display_text.as_str()).collect();
        assert_eq!(names, vec!["환율", "금리"]);
        assert_eq!(rows[0].score_24h, 30.0);
        assert_eq!(rows[0].score_recent, 30.0);
        assert_eq!(rows[0].final_score, 60.0);
    }

    #[test]
    fn test_top_keywords_and_timeseries_reports() {
        let storage = KeywordStorage::new_in_memory().unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 5, 0).unwrap();

        storage.save_batch(&[pending(1, &[("금리", 10.0)])], t0).unwrap();
        storage.save_batch(&[pending(2, &[("환율", 30.0)])], t0).unwrap();
        storage.save_batch(&[pending(3, &[("금리", 12.0)])], t1).unwrap();

        let latest_only = storage.top_keywords(1, 5).unwrap();
        assert_eq!(latest_only.len(), 1);
        assert_eq!(latest_only[0].display_text, "금리");

        let both = storage.top_keywords(2, 5).unwrap();
        assert_eq!(both[0].display_text, "환율");
        assert_eq!(both[1].freq_sum, 2);
        assert_eq!(both[1].score_sum, 22.0);

        let id = storage.get_keyword("금리").unwrap().unwrap().id;
        let series = storage.keyword_timeseries(id, 5).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].bucket_time, t1);
    }

    #[test]
    fn test_related_keywords_by_shared_articles() {
        let storage = KeywordStorage::new_in_memory().unwrap();
        let bucket = bucket();

        storage
            .save_batch(
                &[
                    pending(1, &[("반도체", 14.0), ("삼성전자", 13.0)]),
                    pending(2, &[("반도체", 12.0), ("삼성전자", 11.0)]),
                    pending(3, &[("반도체", 12.0), ("수출", 11.0)]),
                ],
                bucket,
            )
            .unwrap();

        let id = storage.get_keyword("반도체").unwrap().unwrap().id;
        let related = storage.related_keywords(id, 10).unwrap();

        assert_eq!(related.len(), 2);
        assert_eq!(related[0].display_text, "삼성전자");
        assert_eq!(related[0].co_count, 2);
        assert_eq!(related[1].display_text, "수출");
    }
}
