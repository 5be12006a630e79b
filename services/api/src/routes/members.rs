//! Supporter member administration

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
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
        member::{CreateMemberRequest, UpdateMemberRequest},
    },
    state::AppState,
};

pub async fn list(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let members = state.member_repository.list().await.map_err(|e| {
        error!("Failed to list members: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(members))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<CreateMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    let new = payload.into_new().map_err(ApiError::BadRequest)?;

    let member = state
        .member_repository
        .create(&new)
        .await
        .map_err(|e| {
            error!("Failed to create member: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::Conflict("A member with this email already exists".to_string()))?;

    audit(
        &state,
        &identity,
        &ip,
        "create_member",
        Some(member.id.to_string()),
        json!({ "tier": member.tier.as_str() }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    let current = state
        .member_repository
        .find(id)
        .await
        .map_err(|e| {
            error!("Failed to load member {}: {}", id, e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    let next = payload.apply(current).map_err(ApiError::BadRequest)?;

    let member = state
        .member_repository
        .update(&next)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return ApiError::Conflict("A member with this email already exists".to_string());
            }
            error!("Failed to update member {}: {}", id, e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    audit(
        &state,
        &identity,
        &ip,
        "update_member",
        Some(id.to_string()),
        json!({ "tier": member.tier.as_str(), "active": member.active }),
    )
    .await;

    Ok(Json(member))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state.member_repository.delete(id).await.map_err(|e| {
        error!("Failed to delete member {}: {}", id, e);
        ApiError::InternalServerError
    })?;

    if !deleted {
        return Err(ApiError::NotFound("Member not found".to_string()));
    }

    audit(&state, &identity, &ip, "delete_member", Some(id.to_string()), json!({})).await;

    Ok(Json(json!({ "message": "Member deleted" })))
}
