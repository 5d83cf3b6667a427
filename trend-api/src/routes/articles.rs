//! Article ingestion endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::Serialize;
use tracing::info;
use trend_core::ArticleJob;
use trend_services::ArticleQueue;

use super::error_response;
use crate::AppState;

/// Result of publishing a batch of articles
#[derive(Debug, Serialize)]
struct PublishResponse {
    received: usize,
    queued: usize,
}

/// Create article routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/articles", post(publish_articles))
}

/// POST /api/articles - Queue scraped articles for keyword extraction
async fn publish_articles(
    State(state): State<AppState>,
    Json(articles): Json<Vec<ArticleJob>>,
) -> impl IntoResponse {
    let received = articles.len();

    match state.queue.publish(articles).await {
        Ok(queued) => {
            info!("Accepted {} of {} articles", queued, received);
            (StatusCode::ACCEPTED, Json(PublishResponse { received, queued })).into_response()
        }
        Err(e) => error_response(e),
    }
}
