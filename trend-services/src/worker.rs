//! Article Worker Pool
//!
//! Fixed-size pool of tasks pulling article jobs from the queue, extracting
//! keywords and handing results to the save buffer.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use trend_core::{ArticleJob, PendingKeywordSave, QueuedJob, TrendError};

use crate::extractor::{self, ArticleAnalysis};
use crate::queue::ArticleQueue;
use crate::save_buffer::KeywordSaveBuffer;

/// Minimum keyword count for a result to be persisted
const MIN_KEYWORDS: usize = 2;

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of jobs processed in parallel
    pub concurrency: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { concurrency: 5 }
    }
}

/// What happened to a processed job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Keywords were handed to the save buffer
    Buffered(ArticleAnalysis),
    /// Fewer than two keywords were extracted
    TooFewKeywords(ArticleAnalysis),
    /// The article carries no id to link keywords to
    MissingArticleId(ArticleAnalysis),
}

impl JobOutcome {
    pub fn analysis(&self) -> &ArticleAnalysis {
        match self {
            JobOutcome::Buffered(a) | JobOutcome::TooFewKeywords(a) | JobOutcome::MissingArticleId(a) => a,
        }
    }
}

/// Pool of article workers
pub struct WorkerPool {
    queue: Arc<dyn ArticleQueue>,
    buffer: Arc<KeywordSaveBuffer>,
    config: WorkerPoolConfig,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a new WorkerPool
    pub fn new(
        queue: Arc<dyn ArticleQueue>,
        buffer: Arc<KeywordSaveBuffer>,
        config: WorkerPoolConfig,
    ) -> Self {
        Self {
            queue,
            buffer,
            config,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the worker tasks
    ///
    /// Workers exit once the queue is closed and drained.
    pub fn start(self: &Arc<Self>) {
        let concurrency = self.config.concurrency.max(1);
        let mut handles = self.handles.lock();

        for worker_id in 0..concurrency {
            let pool = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                pool.run_worker(worker_id).await;
            }));
        }

        info!("Started article worker pool with concurrency {}", concurrency);
    }

    async fn run_worker(self: Arc<Self>, worker_id: usize) {
        while let Some(job) = self.queue.next_job().await {
            // Extraction is CPU-bound, keep it off the async workers
            let pool = Arc::clone(&self);
            let task_job = job.clone();
            let result = tokio::task::spawn_blocking(move || pool.process_job(&task_job)).await;
            self.settle(worker_id, job, result).await;
        }
        debug!("Worker {} stopped", worker_id);
    }

    /// Report a processed job back to the queue
    ///
    /// A job whose processing task panicked is failed as a whole, and the
    /// queue decides whether it runs again.
    async fn settle(&self, worker_id: usize, job: QueuedJob, result: Result<JobOutcome, JoinError>) {
        match result {
            Ok(outcome) => {
                debug!(
                    "Worker {} processed job {}: {:?}",
                    worker_id,
                    job.id,
                    outcome.analysis().keywords
                );
                self.queue.complete(&job).await;
            }
            Err(e) => {
                let error = TrendError::internal(format!("article processing aborted: {}", e));
                warn!("Worker {} failed job {}: {}", worker_id, job.id, error);
                self.queue.fail(job, &error).await;
            }
        }
    }

    /// Analyze one job and buffer its keywords when they qualify
    pub fn process_job(&self, job: &QueuedJob) -> JobOutcome {
        let article = &job.article;
        let analysis = analyze_article(article);

        if analysis.keywords.len() < MIN_KEYWORDS {
            debug!("Skipping {}: too few keywords", article.link);
            return JobOutcome::TooFewKeywords(analysis);
        }

        let Some(article_id) = article.article_id else {
            debug!("Skipping {}: no article id", article.link);
            return JobOutcome::MissingArticleId(analysis);
        };

        self.buffer.enqueue(PendingKeywordSave {
            article_id,
            keywords: analysis.keyword_scores(),
        });

        JobOutcome::Buffered(analysis)
    }

    /// Wait for every worker to finish
    pub async fn join(&self) {
        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        let count = handles.len();

        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!("Worker task ended abnormally: {}", e);
            }
        }

        info!("Article worker pool stopped ({} workers)", count);
    }
}

/// Extract keywords, composite key and score for one article
pub fn analyze_article(article: &ArticleJob) -> ArticleAnalysis {
    extractor::analyze(&article.title, &article.content_body)
}
