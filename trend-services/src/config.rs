//! Engine configuration loaded from environment variables

use std::env;
use std::str::FromStr;

use crate::ranking::RankingConfig;
use crate::save_buffer::SaveBufferConfig;
use crate::worker::WorkerPoolConfig;

/// Top-level configuration for the trend engine
#[derive(Debug, Clone)]
pub struct TrendConfig {
    /// SQLite database path
    pub db_path: String,
    /// HTTP listen port
    pub server_port: u16,
    /// Maximum number of jobs waiting in the in-process queue
    pub queue_capacity: usize,
    pub save_buffer: SaveBufferConfig,
    pub worker_pool: WorkerPoolConfig,
    pub ranking: RankingConfig,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            db_path: "data/trend.db".to_string(),
            server_port: 3002,
            queue_capacity: 1000,
            save_buffer: SaveBufferConfig::default(),
            worker_pool: WorkerPoolConfig::default(),
            ranking: RankingConfig::default(),
        }
    }
}

impl TrendConfig {
    /// Load configuration from environment variables
    ///
    /// Every variable is optional:
    /// - TREND_DB_PATH, SERVER_PORT, QUEUE_CAPACITY
    /// - WORKER_CONCURRENCY
    /// - SAVE_BATCH_SIZE, SAVE_FLUSH_INTERVAL_SECS, BUCKET_MINUTES (1-60)
    /// - RANKING_CACHE_TTL_SECS, TREND_WINDOW_HOURS
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bucket_minutes = parse_var(&lookup, "BUCKET_MINUTES", defaults.save_buffer.bucket_minutes)?;
        if !(1..=60).contains(&bucket_minutes) {
            return Err(ConfigError::OutOfRange {
                field: "BUCKET_MINUTES".to_string(),
                value: bucket_minutes.to_string(),
                min: 1,
                max: 60,
            });
        }

        let batch_size = parse_var(&lookup, "SAVE_BATCH_SIZE", defaults.save_buffer.batch_size)?;
        let concurrency = parse_var(&lookup, "WORKER_CONCURRENCY", defaults.worker_pool.concurrency)?;
        let queue_capacity = parse_var(&lookup, "QUEUE_CAPACITY", defaults.queue_capacity)?;
        for (field, value) in [
            ("SAVE_BATCH_SIZE", batch_size),
            ("WORKER_CONCURRENCY", concurrency),
            ("QUEUE_CAPACITY", queue_capacity),
        ] {
            if value == 0 {
                return Err(ConfigError::OutOfRange {
                    field: field.to_string(),
                    value: value.to_string(),
                    min: 1,
                    max: usize::MAX as u64,
                });
            }
        }

        Ok(Self {
            db_path: lookup("TREND_DB_PATH").unwrap_or(defaults.db_path),
            server_port: parse_var(&lookup, "SERVER_PORT", defaults.server_port)?,
            queue_capacity,
            save_buffer: SaveBufferConfig {
                batch_size,
                flush_interval_secs: parse_var(
                    &lookup,
                    "SAVE_FLUSH_INTERVAL_SECS",
                    defaults.save_buffer.flush_interval_secs,
                )?,
                bucket_minutes,
            },
            worker_pool: WorkerPoolConfig { concurrency },
            ranking: RankingConfig {
                cache_ttl_secs: parse_var(
                    &lookup,
                    "RANKING_CACHE_TTL_SECS",
                    defaults.ranking.cache_ttl_secs,
                )?,
                window_hours: parse_var(&lookup, "TREND_WINDOW_HOURS", defaults.ranking.window_hours)?,
                ..defaults.ranking
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, field: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(field) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            field: field.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid number in {field}: {value:?}")]
    InvalidNumber { field: String, value: String },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: String,
        min: u64,
        max: u64,
    },
}

impl From<ConfigError> for trend_core::TrendError {
    fn from(err: ConfigError) -> Self {
        trend_core::TrendError::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = TrendConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.db_path, "data/trend.db");
        assert_eq!(config.server_port, 3002);
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.worker_pool.concurrency, 5);
        assert_eq!(config.save_buffer.batch_size, 50);
        assert_eq!(config.save_buffer.flush_interval_secs, 30);
        assert_eq!(config.save_buffer.bucket_minutes, 5);
        assert_eq!(config.ranking.cache_ttl_secs, 60);
        assert_eq!(config.ranking.window_hours, 24);
    }

    #[test]
    fn test_overrides() {
        let config = TrendConfig::from_lookup(lookup_from(&[
            ("TREND_DB_PATH", "/tmp/t.db"),
            ("WORKER_CONCURRENCY", "8"),
            ("BUCKET_MINUTES", " 10 "),
        ]))
        .unwrap();

        assert_eq!(config.db_path, "/tmp/t.db");
        assert_eq!(config.worker_pool.concurrency, 8);
        assert_eq!(config.save_buffer.bucket_minutes, 10);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = TrendConfig::from_lookup(lookup_from(&[("SAVE_BATCH_SIZE", "fifty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));

        let err = TrendConfig::from_lookup(lookup_from(&[("BUCKET_MINUTES", "90")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));

        let err = TrendConfig::from_lookup(lookup_from(&[("WORKER_CONCURRENCY", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }
}
