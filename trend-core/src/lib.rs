//! Core types for the News Trend engine
//!
//! This crate defines the shared data structures used across the engine,
//! including article jobs, keyword rows, ranking entries and report rows.

pub mod article;
pub mod error;
pub mod keyword;
pub mod report;
pub mod trend;

pub use article::{ArticleJob, QueuedJob};
pub use error::{TrendError, TrendResult};
pub use keyword::{
    ArticleKeywordLink, Keyword, KeywordScore, KeywordType, PendingKeywordSave, TimeseriesBucket,
    COMPOSITE_DELIMITER,
};
pub use report::{RelatedKeyword, TimeKeyword, TopKeyword};
pub use trend::{RankStatus, RankedKeyword, TrendEntry};
