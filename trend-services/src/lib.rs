//! Business logic services for the News Trend engine
//!
//! This crate provides keyword extraction, batched persistence into SQLite,
//! the article queue and worker pool, and the ranking and report services
//! built on top of the stored keyword timeseries.

pub mod config;
pub mod extractor;
pub mod keyword_storage;
pub mod queue;
pub mod ranking;
pub mod report_service;
pub mod save_buffer;
pub mod trend_cache;
pub mod worker;

pub use config::{ConfigError, TrendConfig};
pub use extractor::ArticleAnalysis;
pub use keyword_storage::{normalize_keyword, BatchSummary, KeywordStorage, KeywordStorageError};
pub use queue::{ArticleQueue, ChannelQueue};
pub use ranking::{CandidateSource, RankingConfig, TrendRankingService};
pub use report_service::{
    ArticleKeywordsQuery, KeywordQuery, RankingQuery, RelatedQuery, ReportService, TimeseriesQuery,
};
pub use save_buffer::{FlushOutcome, KeywordBatchWriter, KeywordSaveBuffer, SaveBufferConfig};
pub use trend_cache::{CacheError, SnapshotStore};
pub use worker::{JobOutcome, WorkerPool, WorkerPoolConfig};
