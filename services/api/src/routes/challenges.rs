//! Machine and room records
//!
//! Both kinds share one set of handlers; the nested router for each path
//! carries its [`ChallengeKind`] as a request extension.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use super::audit;
use crate::{
    error::{ApiError, ApiResult, is_unique_violation},
    middleware::ClientIp,
    models::{
        admin::AdminIdentity,
        challenge::{
            Challenge, ChallengeFilter, ChallengeKind, ChallengeSummary, CreateChallengeRequest,
            UpdateChallengeRequest, WriteupResponse,
        },
    },
    state::AppState,
};

pub fn public_router(kind: ChallengeKind) -> Router<AppState> {
    Router::new()
        .route("/", get(list_public))
        .route("/:id", get(get_public))
        .route("/:id/writeup", get(get_writeup))
        .layer(Extension(kind))
}

pub fn admin_router(kind: ChallengeKind) -> Router<AppState> {
    Router::new()
        .route("/", get(list_admin).post(create))
        .route("/:id", get(get_admin).put(update).delete(remove))
        .layer(Extension(kind))
}

fn label(kind: ChallengeKind) -> &'static str {
    match kind {
        ChallengeKind::Machine => "Machine",
        ChallengeKind::Room => "Room",
    }
}

fn not_found(kind: ChallengeKind) -> ApiError {
    ApiError::NotFound(format!("{} not found", label(kind)))
}

async fn load(state: &AppState, kind: ChallengeKind, id: Uuid) -> ApiResult<Challenge> {
    state
        .challenge_repository
        .find(kind, id)
        .await
        .map_err(|e| {
            error!("Failed to load {} {}: {}", kind, id, e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| not_found(kind))
}

async fn list(state: &AppState, kind: ChallengeKind, filter: &ChallengeFilter) -> ApiResult<Vec<Challenge>> {
    state
        .challenge_repository
        .list(kind, filter)
        .await
        .map_err(|e| {
            error!("Failed to list {} records: {}", kind, e);
            ApiError::InternalServerError
        })
}

pub async fn list_public(
    State(state): State<AppState>,
    Extension(kind): Extension<ChallengeKind>,
    Query(filter): Query<ChallengeFilter>,
) -> ApiResult<impl IntoResponse> {
    let summaries: Vec<ChallengeSummary> = list(&state, kind, &filter)
        .await?
        .iter()
        .map(Challenge::summary)
        .collect();

    Ok(Json(summaries))
}

pub async fn get_public(
    State(state): State<AppState>,
    Extension(kind): Extension<ChallengeKind>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let challenge = load(&state, kind, id).await?;
    Ok(Json(challenge.summary()))
}

/// Writeup of a record that is not password protected
pub async fn get_writeup(
    State(state): State<AppState>,
    Extension(kind): Extension<ChallengeKind>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let challenge = load(&state, kind, id).await?;

    if challenge.password.is_some() {
        return Err(ApiError::Forbidden(
            "Writeup is password protected; request an access code".to_string(),
        ));
    }
    let writeup = challenge
        .writeup
        .ok_or_else(|| ApiError::NotFound("No writeup published".to_string()))?;

    Ok(Json(WriteupResponse {
        machine_id: challenge.id,
        name: challenge.name,
        writeup,
    }))
}

pub async fn list_admin(
    State(state): State<AppState>,
    Extension(kind): Extension<ChallengeKind>,
    Query(filter): Query<ChallengeFilter>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(list(&state, kind, &filter).await?))
}

pub async fn get_admin(
    State(state): State<AppState>,
    Extension(kind): Extension<ChallengeKind>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(load(&state, kind, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<ChallengeKind>,
    Extension(identity): Extension<AdminIdentity>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<CreateChallengeRequest>,
) -> ApiResult<impl IntoResponse> {
    let new = payload.into_new(kind).map_err(ApiError::BadRequest)?;

    let challenge = state
        .challenge_repository
        .create(&new)
        .await
        .map_err(|e| {
            error!("Failed to create {}: {}", kind, e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| {
            ApiError::Conflict(format!("A {} named '{}' already exists", kind, new.name))
        })?;

    audit(
        &state,
        &identity,
        &ip,
        &format!("create_{}", kind),
        Some(challenge.id.to_string()),
        json!({ "name": challenge.name }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(challenge)))
}

/// Partial update; `password` and `writeup` may be cleared with `null`
pub async fn update(
    State(state): State<AppState>,
    Extension(kind): Extension<ChallengeKind>,
    Extension(identity): Extension<AdminIdentity>,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateChallengeRequest>,
) -> ApiResult<impl IntoResponse> {
    let current = load(&state, kind, id).await?;
    let next = payload.apply(current).map_err(ApiError::BadRequest)?;

    let challenge = state
        .challenge_repository
        .update(&next)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return ApiError::Conflict(format!(
                    "A {} named '{}' already exists",
                    kind, next.name
                ));
            }
            error!("Failed to update {} {}: {}", kind, id, e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| not_found(kind))?;

    audit(
        &state,
        &identity,
        &ip,
        &format!("update_{}", kind),
        Some(id.to_string()),
        json!({
            "name": challenge.name,
            "protected": challenge.password.is_some(),
            "has_writeup": challenge.writeup.is_some(),
        }),
    )
    .await;

    Ok(Json(challenge))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(kind): Extension<ChallengeKind>,
    Extension(identity): Extension<AdminIdentity>,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state
        .challenge_repository
        .delete(kind, id)
        .await
        .map_err(|e| {
            error!("Failed to delete {} {}: {}", kind, id, e);
            ApiError::InternalServerError
        })?;

    if !deleted {
        return Err(not_found(kind));
    }

    audit(
        &state,
        &identity,
        &ip,
        &format!("delete_{}", kind),
        Some(id.to_string()),
        json!({}),
    )
    .await;

    Ok(Json(json!({ "message": format!("{} deleted", label(kind)) })))
}
