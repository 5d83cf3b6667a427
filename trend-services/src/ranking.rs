//! Trend Ranking Service
//!
//! Builds the published top-trends list from windowed keyword scores.
//! Composite issues take priority over their constituents, and every entry
//! carries its movement relative to the previous ranking.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use trend_core::{
    KeywordType, RankStatus, RankedKeyword, TrendEntry, TrendResult, COMPOSITE_DELIMITER,
};

use crate::keyword_storage::KeywordStorage;
use crate::trend_cache::SnapshotStore;

/// Key of the short-lived ranking cache
pub const TOP_TRENDS_CACHE_KEY: &str = "trend:top:cache";

/// Key of the last published ranking (no expiry)
pub const TOP_TRENDS_SNAPSHOT_KEY: &str = "trend:top:snapshot";

/// Configuration for the ranking service
#[derive(Debug, Clone)]
pub struct RankingConfig {
    /// How long a computed ranking is served from cache (in seconds)
    pub cache_ttl_secs: u64,
    /// Trailing window of the windowed score (in hours)
    pub window_hours: i64,
    /// Candidate rows fetched per requested entry
    pub candidate_multiplier: usize,
    /// Lower bound on fetched candidate rows
    pub min_candidates: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            window_hours: 24,
            candidate_multiplier: 5,
            min_candidates: 50,
        }
    }
}

/// Provider of ranking candidates ordered by windowed score, best first
pub trait CandidateSource: Send + Sync {
    fn ranked_candidates(
        &self,
        window: chrono::Duration,
        limit: usize,
    ) -> TrendResult<Vec<RankedKeyword>>;
}

impl CandidateSource for KeywordStorage {
    fn ranked_candidates(
        &self,
        window: chrono::Duration,
        limit: usize,
    ) -> TrendResult<Vec<RankedKeyword>> {
        Ok(self.ranked_candidates_at(Utc::now(), window, limit)?)
    }
}

#[derive(Serialize, Deserialize)]
struct CachedTrends {
    limit: usize,
    entries: Vec<TrendEntry>,
}

/// Service computing the top-trends list
pub struct TrendRankingService {
    source: Arc<dyn CandidateSource>,
    store: Arc<SnapshotStore>,
    config: RankingConfig,
}

impl TrendRankingService {
    /// Create a new TrendRankingService
    pub fn new(
        source: Arc<dyn CandidateSource>,
        store: Arc<SnapshotStore>,
        config: RankingConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Top `limit` trends, served from cache while it is fresh
    #[instrument(skip(self))]
    pub fn get_top_trends(&self, limit: usize) -> TrendResult<Vec<TrendEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        if let Some(mut entries) = self.cached(limit) {
            debug!("Serving top trends from cache");
            entries.truncate(limit);
            return Ok(entries);
        }

        let previous_ranks = self.previous_ranks();

        let fetch = limit
            .saturating_mul(self.config.candidate_multiplier)
            .max(self.config.min_candidates);
        let candidates = self
            .source
            .ranked_candidates(chrono::Duration::hours(self.config.window_hours), fetch)?;

        let selected = select_with_composite_priority(candidates, limit);
        let entries = assign_ranks(selected, &previous_ranks);

        self.store.set_json(
            TOP_TRENDS_CACHE_KEY,
            &CachedTrends {
                limit,
                entries: entries.clone(),
            },
            Some(Duration::from_secs(self.config.cache_ttl_secs)),
        )?;
        self.store.set_json(TOP_TRENDS_SNAPSHOT_KEY, &entries, None)?;

        info!("Computed top trends: {} entries", entries.len());
        Ok(entries)
    }

    fn cached(&self, limit: usize) -> Option<Vec<TrendEntry>> {
        match self.store.get_json::<CachedTrends>(TOP_TRENDS_CACHE_KEY) {
            Ok(Some(cached)) if cached.limit >= limit => Some(cached.entries),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring unreadable ranking cache: {}", e);
                None
            }
        }
    }

    fn previous_ranks(&self) -> HashMap<i64, usize> {
        match self.store.get_json::<Vec<TrendEntry>>(TOP_TRENDS_SNAPSHOT_KEY) {
            Ok(Some(entries)) => entries.iter().map(|e| (e.id(), e.rank)).collect(),
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!("Ignoring unreadable ranking snapshot: {}", e);
                HashMap::new()
            }
        }
    }
}

fn effective_type(candidate: &RankedKeyword) -> KeywordType {
    candidate
        .keyword_type
        .unwrap_or_else(|| KeywordType::classify(&candidate.display_text))
}

fn constituents(text: &str) -> Vec<String> {
    text.split(COMPOSITE_DELIMITER)
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Pick up to `limit` candidates, preferring composite issues
///
/// A composite is accepted only when none of its constituents is already
/// covered, and then covers both. Singles fill the remaining slots when
/// they are not covered. The candidate order is kept.
pub fn select_with_composite_priority(
    candidates: Vec<RankedKeyword>,
    limit: usize,
) -> Vec<RankedKeyword> {
    let mut covered: HashSet<String> = HashSet::new();
    let mut accepted = vec![false; candidates.len()];
    let mut count = 0;

    for (idx, candidate) in candidates.iter().enumerate() {
        if count >= limit {
            break;
        }
        if effective_type(candidate) != KeywordType::Composite {
            continue;
        }

        let parts = constituents(&candidate.display_text);
        if parts.iter().any(|part| covered.contains(part)) {
            continue;
        }

        covered.extend(parts);
        accepted[idx] = true;
        count += 1;
    }

    if count < limit {
        for (idx, candidate) in candidates.iter().enumerate() {
            if count >= limit {
                break;
            }
            if effective_type(candidate) != KeywordType::Single {
                continue;
            }

            let text = candidate.display_text.trim().to_lowercase();
            if covered.contains(&text) {
                continue;
            }

            covered.insert(text);
            accepted[idx] = true;
            count += 1;
        }
    }

    candidates
        .into_iter()
        .zip(accepted)
        .filter_map(|(candidate, keep)| keep.then_some(candidate))
        .collect()
}

/// Number entries from 1 and compare against the previous ranks
pub fn assign_ranks(
    selected: Vec<RankedKeyword>,
    previous_ranks: &HashMap<i64, usize>,
) -> Vec<TrendEntry> {
    selected
        .into_iter()
        .enumerate()
        .map(|(idx, keyword)| {
            let rank = idx + 1;
            let (status, rank_change) = match previous_ranks.get(&keyword.id) {
                None => (RankStatus::New, 0),
                Some(&prev) if prev == rank => (RankStatus::Same, 0),
                Some(&prev) if prev > rank => (RankStatus::Up, prev - rank),
                Some(&prev) => (RankStatus::Down, rank - prev),
            };
            TrendEntry {
                keyword,
                rank,
                rank_change,
                status,
            }
        })
        .collect()
}
