//! Admin login, session management and audit logs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, header::USER_AGENT},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use common::{
    security::{generate_session_token, sha256_hex, verify_password},
    validation::validate_username,
};
use serde_json::json;
use tracing::{error, info};

use super::audit;
use crate::{
    error::{ApiError, ApiResult},
    middleware::{ClientIp, record_unauthorized},
    models::{
        LimitQuery,
        admin::{AdminIdentity, LoginRequest, LoginResponse},
        audit::NewUnauthorizedAccess,
    },
    state::AppState,
};

const MAX_LOGIN_PASSWORD_LEN: usize = 128;

/// Exchange admin credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_username(&payload.username).map_err(ApiError::BadRequest)?;
    if payload.password.is_empty() || payload.password.len() > MAX_LOGIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest("Invalid password".to_string()));
    }

    if !state.login_limiter.is_allowed(&ip).await {
        return Err(ApiError::TooManyRequests);
    }

    let admin = state
        .admin_repository
        .find_by_username(&payload.username)
        .await
        .map_err(|e| {
            error!("Failed to load admin user: {}", e);
            ApiError::InternalServerError
        })?;

    let admin = match admin {
        Some(admin) if admin.active => {
            let valid = verify_password(&payload.password, &admin.password_hash).map_err(|e| {
                error!("Failed to verify admin password: {}", e);
                ApiError::InternalServerError
            })?;
            valid.then_some(admin)
        }
        _ => None,
    };

    let Some(admin) = admin else {
        record_unauthorized(
            &state,
            NewUnauthorizedAccess {
                ip,
                method: "POST".to_string(),
                path: "/admin/login".to_string(),
                reason: "invalid_credentials".to_string(),
                user_agent: headers
                    .get(USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.chars().take(256).collect()),
            },
        );
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    state.login_limiter.clear(&ip).await;

    let token = generate_session_token();
    let expires_at = Utc::now() + Duration::hours(state.config.session_ttl_hours);
    let session = state
        .admin_repository
        .create_session(admin.id, &sha256_hex(&token), expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create admin session: {}", e);
            ApiError::InternalServerError
        })?;

    if let Err(e) = state.admin_repository.record_login(admin.id).await {
        error!("Failed to record admin login time: {}", e);
    }

    let identity = AdminIdentity {
        admin_id: admin.id,
        username: admin.username,
        session_id: session.id,
        expires_at: session.expires_at,
    };
    audit(&state, &identity, &ip, "login", None, json!({})).await;
    info!("Admin {} logged in", identity.username);

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_at: session.expires_at,
    }))
}

/// Deactivate the current session
pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    ClientIp(ip): ClientIp,
) -> ApiResult<impl IntoResponse> {
    state
        .admin_repository
        .deactivate_session(identity.session_id)
        .await
        .map_err(|e| {
            error!("Failed to deactivate session: {}", e);
            ApiError::InternalServerError
        })?;

    audit(&state, &identity, &ip, "logout", None, json!({})).await;

    Ok(Json(json!({"message": "Logged out"})))
}

/// Current admin and session expiry
pub async fn current_session(Extension(identity): Extension<AdminIdentity>) -> impl IntoResponse {
    Json(identity)
}

/// Delete expired and inactive sessions
pub async fn cleanup_sessions(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    ClientIp(ip): ClientIp,
) -> ApiResult<impl IntoResponse> {
    let removed = state.admin_repository.cleanup_sessions().await.map_err(|e| {
        error!("Failed to clean up sessions: {}", e);
        ApiError::InternalServerError
    })?;

    audit(
        &state,
        &identity,
        &ip,
        "cleanup_sessions",
        None,
        json!({ "removed": removed }),
    )
    .await;

    Ok(Json(json!({ "removed": removed })))
}

pub async fn admin_logs(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<impl IntoResponse> {
    let logs = state
        .audit_repository
        .list_admin_logs(query.clamped(100, 500))
        .await
        .map_err(|e| {
            error!("Failed to list admin logs: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(logs))
}

pub async fn unauthorized_logs(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<impl IntoResponse> {
    let logs = state
        .audit_repository
        .list_unauthorized(query.clamped(100, 500))
        .await
        .map_err(|e| {
            error!("Failed to list unauthorized access logs: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(logs))
}
