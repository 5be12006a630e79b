//! Aggregated tool, CVE and forum feeds

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    error::{ApiError, ApiResult},
    models::feed::{CveQuery, ForumQuery},
    state::AppState,
};

pub async fn tools(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.feeds.tools().await)
}

pub async fn cves(
    State(state): State<AppState>,
    Query(query): Query<CveQuery>,
) -> ApiResult<impl IntoResponse> {
    let (days, limit, severity) = query.validated().map_err(ApiError::BadRequest)?;
    Ok(Json(state.feeds.cves(days, limit, severity.as_deref()).await))
}

pub async fn forums(
    State(state): State<AppState>,
    Query(query): Query<ForumQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = query.validated().map_err(ApiError::BadRequest)?;
    Ok(Json(state.feeds.forums(limit).await))
}
