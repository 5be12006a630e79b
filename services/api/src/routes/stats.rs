//! HackTheBox / TryHackMe statistics

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use tracing::{error, warn};

use super::audit;
use crate::{
    error::{ApiError, ApiResult},
    middleware::ClientIp,
    models::{
        admin::AdminIdentity,
        stats::{Platform, PlatformStats, StatsResponse, UpdateStatsRequest},
    },
    state::AppState,
};

fn parse_platform(raw: &str) -> ApiResult<Platform> {
    raw.parse().map_err(ApiError::BadRequest)
}

/// Public stats; serves the in-memory copy when the database is down
pub async fn public_get(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let platform = parse_platform(&platform)?;

    let response = match state.stats_repository.get(platform).await {
        Ok(stats) => {
            state.stats_fallback.remember(&stats).await;
            StatsResponse {
                stats,
                fallback: false,
            }
        }
        Err(e) => {
            warn!("Serving fallback {} stats: {}", platform, e);
            StatsResponse {
                stats: state.stats_fallback.get(platform).await,
                fallback: true,
            }
        }
    };

    Ok(Json(response))
}

pub async fn admin_get(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let platform = parse_platform(&platform)?;

    let stats = state.stats_repository.get(platform).await.map_err(|e| {
        error!("Failed to load {} stats: {}", platform, e);
        ApiError::InternalServerError
    })?;
    state.stats_fallback.remember(&stats).await;

    Ok(Json(stats))
}

/// Partial counter update
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    ClientIp(ip): ClientIp,
    Path(platform): Path<String>,
    Json(payload): Json<UpdateStatsRequest>,
) -> ApiResult<impl IntoResponse> {
    let platform = parse_platform(&platform)?;

    let current = state.stats_repository.get(platform).await.map_err(|e| {
        error!("Failed to load {} stats: {}", platform, e);
        ApiError::InternalServerError
    })?;
    let next = payload.apply(current).map_err(ApiError::BadRequest)?;

    let stats = save(&state, &next).await?;
    audit(
        &state,
        &identity,
        &ip,
        "update_stats",
        Some(platform.to_string()),
        json!(&stats),
    )
    .await;

    Ok(Json(stats))
}

/// Reset counters to the documented defaults
pub async fn reset(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    ClientIp(ip): ClientIp,
    Path(platform): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let platform = parse_platform(&platform)?;

    let stats = save(&state, &PlatformStats::defaults(platform)).await?;
    audit(
        &state,
        &identity,
        &ip,
        "reset_stats",
        Some(platform.to_string()),
        json!({}),
    )
    .await;

    Ok(Json(stats))
}

async fn save(state: &AppState, stats: &PlatformStats) -> ApiResult<PlatformStats> {
    let saved = state.stats_repository.upsert(stats).await.map_err(|e| {
        error!("Failed to save {} stats: {}", stats.platform, e);
        ApiError::InternalServerError
    })?;
    state.stats_fallback.remember(&saved).await;
    Ok(saved)
}
