//! Trend ranking endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use trend_core::TrendError;

use super::error_response;
use crate::AppState;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

/// Query parameters for the top trends list
#[derive(Debug, Deserialize)]
pub struct TopTrendsQuery {
    /// Number of entries (1-100, default 10)
    pub limit: Option<usize>,
}

/// Create trend routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/trend/top", get(get_top_trends))
}

/// GET /api/trend/top - Current top trends with rank movement
async fn get_top_trends(
    State(state): State<AppState>,
    Query(params): Query<TopTrendsQuery>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return error_response(TrendError::invalid_request(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    match state.ranking.get_top_trends(limit) {
        Ok(trends) => (StatusCode::OK, Json(trends)).into_response(),
        Err(e) => error_response(e),
    }
}
