//! Keyword Save Buffer
//!
//! Accumulates per-article keyword results in memory and writes them to
//! storage in batches. A flush is triggered by the batch size threshold, by
//! a periodic timer, or by shutdown. Only one flush runs at a time; a
//! trigger that arrives while a flush is in progress is a no-op.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

use trend_core::{PendingKeywordSave, TrendResult};

use crate::keyword_storage::{BatchSummary, KeywordStorage};

/// Configuration for the save buffer
#[derive(Debug, Clone)]
pub struct SaveBufferConfig {
    /// Pending article count that triggers an immediate flush
    pub batch_size: usize,
    /// Interval of the periodic flush (in seconds)
    pub flush_interval_secs: u64,
    /// Width of a timeseries bucket (in minutes)
    pub bucket_minutes: u32,
}

impl Default for SaveBufferConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            flush_interval_secs: 30,
            bucket_minutes: 5,
        }
    }
}

/// Destination of flushed batches
pub trait KeywordBatchWriter: Send + Sync {
    /// Persist a whole batch atomically under one bucket time
    fn save_batch(
        &self,
        batch: &[PendingKeywordSave],
        bucket_time: DateTime<Utc>,
    ) -> TrendResult<BatchSummary>;
}

impl KeywordBatchWriter for KeywordStorage {
    fn save_batch(
        &self,
        batch: &[PendingKeywordSave],
        bucket_time: DateTime<Utc>,
    ) -> TrendResult<BatchSummary> {
        Ok(KeywordStorage::save_batch(self, batch, bucket_time)?)
    }
}

/// Result of a flush attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// Another flush was already running
    Busy,
    /// Nothing was pending
    Empty,
    /// The batch was written
    Saved(BatchSummary),
    /// The write failed and the batch went back to the front of the buffer
    Requeued { batch_size: usize },
}

/// Batching accumulator in front of the keyword storage
pub struct KeywordSaveBuffer {
    writer: Arc<dyn KeywordBatchWriter>,
    config: SaveBufferConfig,
    pending: Mutex<VecDeque<PendingKeywordSave>>,
    flushing: AtomicBool,
    flush_done: Notify,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl KeywordSaveBuffer {
    /// Create a new KeywordSaveBuffer
    pub fn new(writer: Arc<dyn KeywordBatchWriter>, config: SaveBufferConfig) -> Self {
        Self {
            writer,
            config,
            pending: Mutex::new(VecDeque::new()),
            flushing: AtomicBool::new(false),
            flush_done: Notify::new(),
            timer: Mutex::new(None),
        }
    }

    /// Append one article result, flushing when the threshold is reached
    pub fn enqueue(&self, item: PendingKeywordSave) -> Option<FlushOutcome> {
        let len = {
            let mut pending = self.pending.lock();
            pending.push_back(item);
            pending.len()
        };

        if len >= self.config.batch_size {
            Some(self.flush())
        } else {
            None
        }
    }

    /// Number of article results waiting to be written
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Write everything pending as one batch
    #[instrument(skip(self))]
    pub fn flush(&self) -> FlushOutcome {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Flush already in progress, skipping");
            return FlushOutcome::Busy;
        }

        let outcome = self.flush_pending();
        self.finish_flush();
        outcome
    }

    fn finish_flush(&self) {
        self.flushing.store(false, Ordering::Release);
        self.flush_done.notify_waiters();
    }

    fn flush_pending(&self) -> FlushOutcome {
        let batch: Vec<PendingKeywordSave> = self.pending.lock().drain(..).collect();
        if batch.is_empty() {
            return FlushOutcome::Empty;
        }

        let bucket_time = KeywordStorage::bucket_time(Utc::now(), self.config.bucket_minutes);

        match self.writer.save_batch(&batch, bucket_time) {
            Ok(summary) => {
                debug!(
                    "Flushed {} articles into bucket {}",
                    batch.len(),
                    bucket_time
                );
                FlushOutcome::Saved(summary)
            }
            Err(e) => {
                let batch_size = batch.len();
                error!("Failed to save keyword batch of {} articles: {}", batch_size, e);

                let mut pending = self.pending.lock();
                for item in batch.into_iter().rev() {
                    pending.push_front(item);
                }
                warn!(
                    "Requeued {} articles, {} now pending",
                    batch_size,
                    pending.len()
                );
                FlushOutcome::Requeued { batch_size }
            }
        }
    }

    /// Start the periodic flush timer
    ///
    /// Calling this again replaces the running timer.
    pub fn start_timer(self: &Arc<Self>) {
        let buffer = Arc::clone(self);
        let period = Duration::from_secs(self.config.flush_interval_secs.max(1));

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                buffer.flush();
            }
        });

        if let Some(previous) = self.timer.lock().replace(handle) {
            previous.abort();
        }

        info!(
            "Started keyword save buffer timer with {}s interval",
            period.as_secs()
        );
    }

    /// Stop the periodic flush timer
    pub fn stop_timer(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
            debug!("Stopped keyword save buffer timer");
        }
    }

    /// Stop the timer and write whatever is still pending
    pub async fn shutdown(&self) -> FlushOutcome {
        self.stop_timer();

        // A flush already in progress must finish before the final one runs
        let outcome = loop {
            let finished = self.flush_done.notified();
            tokio::pin!(finished);
            finished.as_mut().enable();

            match self.flush() {
                FlushOutcome::Busy => finished.await,
                outcome => break outcome,
            }
        };
        info!(
            "Keyword save buffer shut down ({} articles left pending)",
            self.pending_len()
        );
        outcome
    }
}
