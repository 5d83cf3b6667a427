//! Article work queue
//!
//! Jobs are identified by the md5 hex digest of the article link, so the
//! same article is only ever queued once. The queue owns retry: workers
//! report failures and the queue decides whether a job runs again.

use async_trait::async_trait;
use dashmap::DashSet;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use trend_core::{ArticleJob, QueuedJob, TrendError, TrendResult};

/// Default number of attempts before a job is dropped
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Job id derived from the article link
pub fn job_id(link: &str) -> String {
    format!("{:x}", md5::compute(link.as_bytes()))
}

/// A source of article jobs for the worker pool
#[async_trait]
pub trait ArticleQueue: Send + Sync {
    /// Add articles, skipping any link that was already queued
    ///
    /// Returns the number of newly queued jobs.
    async fn publish(&self, articles: Vec<ArticleJob>) -> TrendResult<usize>;

    /// Wait for the next job, `None` once the queue is closed and drained
    async fn next_job(&self) -> Option<QueuedJob>;

    /// Acknowledge a successfully processed job
    async fn complete(&self, job: &QueuedJob);

    /// Report a failed job
    async fn fail(&self, job: QueuedJob, error: &TrendError);

    /// Stop accepting new jobs
    fn close(&self);
}

/// In-process bounded queue backed by a tokio mpsc channel
pub struct ChannelQueue {
    sender: Mutex<Option<mpsc::Sender<QueuedJob>>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>,
    seen: DashSet<String>,
    max_attempts: u32,
}

impl ChannelQueue {
    /// Create a new ChannelQueue holding at most `capacity` waiting jobs
    pub fn new(capacity: usize) -> Self {
        Self::with_max_attempts(capacity, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(capacity: usize, max_attempts: u32) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: tokio::sync::Mutex::new(rx),
            seen: DashSet::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<QueuedJob>> {
        self.sender.lock().clone()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }
}

#[async_trait]
impl ArticleQueue for ChannelQueue {
    async fn publish(&self, articles: Vec<ArticleJob>) -> TrendResult<usize> {
        if articles.is_empty() {
            return Ok(0);
        }

        let sender = self
            .sender()
            .ok_or_else(|| TrendError::queue("queue is closed"))?;

        let total = articles.len();
        let mut queued = 0;

        for article in articles {
            if article.link.trim().is_empty() {
                warn!("Skipping article without link: {}", article.title);
                continue;
            }

            let id = job_id(&article.link);
            if !self.seen.insert(id.clone()) {
                continue;
            }

            let job = QueuedJob {
                id: id.clone(),
                attempt: 1,
                article,
            };
            if sender.send(job).await.is_err() {
                self.seen.remove(&id);
                return Err(TrendError::queue("queue is closed"));
            }
            queued += 1;
        }

        if queued == 0 {
            debug!("All {} articles were duplicates", total);
        } else {
            info!(
                "Queued {} new articles ({} duplicates skipped)",
                queued,
                total - queued
            );
        }

        Ok(queued)
    }

    async fn next_job(&self) -> Option<QueuedJob> {
        self.receiver.lock().await.recv().await
    }

    async fn complete(&self, job: &QueuedJob) {
        debug!("Job completed: {}", job.id);
    }

    async fn fail(&self, mut job: QueuedJob, error: &TrendError) {
        if job.attempt >= self.max_attempts {
            error!(
                "Job {} failed after {} attempts: {}",
                job.id, job.attempt, error
            );
            return;
        }

        let Some(sender) = self.sender() else {
            warn!("Job {} failed while queue is closing, dropping: {}", job.id, error);
            return;
        };

        warn!(
            "Job {} failed (attempt {}/{}), retrying: {}",
            job.id, job.attempt, self.max_attempts, error
        );
        job.attempt += 1;

        // Sending from a worker could wait on its own full channel
        tokio::spawn(async move {
            if let Err(e) = sender.send(job).await {
                warn!("Failed to requeue job {}: queue closed", e.0.id);
            }
        });
    }

    fn close(&self) {
        if self.sender.lock().take().is_some() {
            info!("Article queue closed");
        }
    }
}
