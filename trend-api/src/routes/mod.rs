//! API route definitions

mod articles;
mod health;
mod report;
mod trend;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use tracing::error;
use trend_core::TrendError;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(trend::routes())
        .merge(articles::routes())
        .merge(report::routes())
        .merge(health::routes())
}

/// Map a service error onto an HTTP error response
pub(crate) fn error_response(err: TrendError) -> Response {
    let status = match &err {
        TrendError::InvalidRequest(_) | TrendError::Parse(_) => StatusCode::BAD_REQUEST,
        TrendError::NotFound(_) => StatusCode::NOT_FOUND,
        TrendError::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
        TrendError::Storage(_)
        | TrendError::Cache(_)
        | TrendError::Config(_)
        | TrendError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Request failed: {}", err);
    }

    (
        status,
        Json(serde_json::json!({
            "error": err.to_string()
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use std::sync::Arc;
    use tower::ServiceExt;
    use trend_core::{KeywordScore, PendingKeywordSave};
    use trend_services::{
        ChannelQueue, KeywordSaveBuffer, KeywordStorage, RankingConfig, ReportService,
        SaveBufferConfig, SnapshotStore, TrendRankingService,
    };

    fn state() -> AppState {
        let storage = Arc::new(KeywordStorage::new_in_memory().unwrap());
        storage
            .save_batch(
                &[PendingKeywordSave {
                    article_id: 1,
                    keywords: vec![
                        KeywordScore::new("금리", 12.0),
                        KeywordScore::new("환율", 11.0),
                        KeywordScore::new("금리:환율", 17.0),
                    ],
                }],
                KeywordStorage::bucket_time(Utc::now(), 5),
            )
            .unwrap();

        AppState {
            storage: storage.clone(),
            queue: Arc::new(ChannelQueue::new(8)),
            save_buffer: Arc::new(KeywordSaveBuffer::new(
                storage.clone(),
                SaveBufferConfig::default(),
            )),
            ranking: Arc::new(TrendRankingService::new(
                storage.clone(),
                Arc::new(SnapshotStore::new()),
                RankingConfig::default(),
            )),
            reports: Arc::new(ReportService::new(storage)),
        }
    }

    async fn get(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = crate::app(state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_top_trends() {
        let (status, body) = get("/api/trend/top?limit=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["displayText"], "금리:환율");
        assert_eq!(body[0]["type"], "COMPOSITE");
        assert_eq!(body[0]["status"], "new");
        assert_eq!(body[0]["rank"], 1);
    }

    #[tokio::test]
    async fn test_out_of_range_limits_rejected() {
        assert_eq!(get("/api/trend/top?limit=0").await.0, StatusCode::BAD_REQUEST);
        assert_eq!(get("/api/trend/top?limit=101").await.0, StatusCode::BAD_REQUEST);
        assert_eq!(
            get("/api/report/ranking?recentBuckets=201").await.0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get("/api/report/timeseries?keywordId=1&limit=0").await.0,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_reports() {
        let (status, body) = get("/api/report/ranking").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(3));

        let (status, body) = get("/api/report/count").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
    }

    #[tokio::test]
    async fn test_keyword_and_article_reports() {
        let (status, body) = get("/api/report/count/articles").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, body) = get("/api/report/keyword?text=%EA%B8%88%EB%A6%AC").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["displayText"], "금리");
        assert_eq!(body["type"], "SINGLE");

        let (status, _) = get("/api/report/keyword?text=%EB%AC%BC%EA%B0%80").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get("/api/report/article-keywords?articleId=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_publish_articles() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/articles")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"[{"title":"금리 환율","contentBody":"금리","link":"https://a/1","articleId":1},
                    {"title":"금리 환율","link":"https://a/1"}]"#,
            ))
            .unwrap();

        let response = crate::app(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["received"], 2);
        assert_eq!(body["queued"], 1);
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(get("/api/health/live").await.0, StatusCode::OK);

        let (status, body) = get("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }
}
