//! Data report endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use trend_services::{
    ArticleKeywordsQuery, KeywordQuery, RankingQuery, RelatedQuery, TimeseriesQuery,
};

use super::error_response;
use crate::AppState;

/// Create report routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/report/ranking", get(get_ranking))
        .route("/report/timeseries", get(get_timeseries))
        .route("/report/count", get(get_count))
        .route("/report/count/articles", get(get_article_count))
        .route("/report/related", get(get_related))
        .route("/report/keyword", get(get_keyword))
        .route("/report/article-keywords", get(get_article_keywords))
}

/// GET /api/report/ranking - Keyword totals over the most recent buckets
async fn get_ranking(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> impl IntoResponse {
    match state.reports.ranking(&query) {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/report/timeseries - Latest buckets of one keyword
async fn get_timeseries(
    State(state): State<AppState>,
    Query(query): Query<TimeseriesQuery>,
) -> impl IntoResponse {
    match state.reports.timeseries(&query) {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/report/count - Number of stored keywords
async fn get_count(State(state): State<AppState>) -> impl IntoResponse {
    match state.reports.count_keywords() {
        Ok(count) => (StatusCode::OK, Json(serde_json::json!({ "count": count }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/report/count/articles - Number of articles with stored keywords
async fn get_article_count(State(state): State<AppState>) -> impl IntoResponse {
    match state.reports.count_articles() {
        Ok(count) => (StatusCode::OK, Json(serde_json::json!({ "count": count }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/report/keyword - Look up a stored keyword by text
async fn get_keyword(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> impl IntoResponse {
    match state.reports.keyword(&query) {
        Ok(keyword) => (StatusCode::OK, Json(keyword)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/report/article-keywords - Keyword links of one article
async fn get_article_keywords(
    State(state): State<AppState>,
    Query(query): Query<ArticleKeywordsQuery>,
) -> impl IntoResponse {
    match state.reports.article_keywords(&query) {
        Ok(links) => (StatusCode::OK, Json(links)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/report/related - Keywords sharing recent articles with one keyword
async fn get_related(
    State(state): State<AppState>,
    Query(query): Query<RelatedQuery>,
) -> impl IntoResponse {
    match state.reports.related_keywords(&query) {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => error_response(e),
    }
}
