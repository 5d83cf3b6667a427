//! News Trend API Server
//!
//! Runs the keyword extraction pipeline and serves trend rankings and
//! keyword reports over HTTP.

mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trend_services::{
    ArticleQueue, ChannelQueue, KeywordSaveBuffer, KeywordStorage, ReportService, SnapshotStore,
    TrendConfig, TrendRankingService, WorkerPool,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<KeywordStorage>,
    pub queue: Arc<dyn ArticleQueue>,
    pub save_buffer: Arc<KeywordSaveBuffer>,
    pub ranking: Arc<TrendRankingService>,
    pub reports: Arc<ReportService>,
}

/// Build the HTTP application
pub fn app(state: AppState) -> Router {
    // Configure CORS for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,trend_api=debug,trend_services=debug")),
        )
        .init();

    info!("Starting News Trend API");

    let config = TrendConfig::from_env()?;

    // Initialize keyword storage (SQLite database)
    info!("Initializing keyword storage at: {}", config.db_path);
    let storage = Arc::new(KeywordStorage::new(&config.db_path)?);

    // Batched writes into storage, flushed by size and on a timer
    let save_buffer = Arc::new(KeywordSaveBuffer::new(
        storage.clone(),
        config.save_buffer.clone(),
    ));
    save_buffer.start_timer();

    // Article queue and the workers consuming it
    let queue = Arc::new(ChannelQueue::new(config.queue_capacity));
    let worker_pool = Arc::new(WorkerPool::new(
        queue.clone(),
        save_buffer.clone(),
        config.worker_pool.clone(),
    ));
    worker_pool.start();

    let ranking = Arc::new(TrendRankingService::new(
        storage.clone(),
        Arc::new(SnapshotStore::new()),
        config.ranking.clone(),
    ));
    let reports = Arc::new(ReportService::new(storage.clone()));

    let state = AppState {
        storage: storage.clone(),
        queue: queue.clone(),
        save_buffer: save_buffer.clone(),
        ranking,
        reports,
    };

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop accepting jobs, let workers drain, then write what is left
    info!("Shutting down");
    queue.close();
    worker_pool.join().await;
    save_buffer.shutdown().await;
    drop(storage);

    info!("News Trend API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
