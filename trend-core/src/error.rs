//! Error types for the trend engine

use thiserror::Error;

/// Trend-wide error type
#[derive(Error, Debug)]
pub enum TrendError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrendError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        TrendError::InvalidRequest(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        TrendError::Parse(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        TrendError::NotFound(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        TrendError::Storage(msg.into())
    }

    pub fn queue(msg: impl Into<String>) -> Self {
        TrendError::Queue(msg.into())
    }

    pub fn cache(msg: impl Into<String>) -> Self {
        TrendError::Cache(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        TrendError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        TrendError::Internal(msg.into())
    }
}

/// Result type alias for trend operations
pub type TrendResult<T> = Result<T, TrendError>;
