//! Passcode-gated access to protected writeups
//!
//! A member proves knowledge of the writeup password, receives a six digit
//! code by mail and trades it, once, for the writeup text.

use axum::{Json, extract::State, response::IntoResponse};
use chrono::{Duration, Utc};
use common::{
    security::{generate_otp, secrets_match, sha256_hex},
    validation::{validate_email, validate_otp},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    clients::{MailError, mailer::otp_message},
    error::{ApiError, ApiResult},
    middleware::{ClientIp, record_unauthorized},
    models::{
        audit::NewUnauthorizedAccess,
        challenge::{Challenge, WriteupResponse},
        member::normalize_email,
        otp::{OtpRejection, RequestOtpRequest, RequestOtpResponse, VerifyOtpRequest},
    },
    state::AppState,
};

/// Validate and rate limit the email of a passcode request
async fn checked_email(state: &AppState, raw: &str) -> ApiResult<String> {
    let email = normalize_email(raw);
    validate_email(&email).map_err(ApiError::BadRequest)?;

    if !state.otp_limiter.is_allowed(&email).await {
        return Err(ApiError::TooManyRequests);
    }
    Ok(email)
}

/// Unknown members are rejected with 401, inactive ones with 403
async fn ensure_member(state: &AppState, email: &str) -> ApiResult<()> {
    let member = state
        .member_repository
        .find_by_email(email)
        .await
        .map_err(|e| {
            error!("Failed to look up member: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::Unauthorized("Unknown member".to_string()))?;

    if !member.active {
        return Err(ApiError::Forbidden("Membership is inactive".to_string()));
    }
    Ok(())
}

async fn load_challenge(state: &AppState, id: Uuid) -> ApiResult<Challenge> {
    state
        .challenge_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to load challenge {}: {}", id, e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound("Machine not found".to_string()))
}

/// Check the writeup password and mail a passcode
pub async fn request_otp(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<RequestOtpRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = checked_email(&state, &payload.email).await?;
    ensure_member(&state, &email).await?;

    let challenge = load_challenge(&state, payload.machine_id).await?;
    let Some(stored) = challenge.password.as_deref() else {
        return Err(ApiError::BadRequest(
            "Writeup is not password protected".to_string(),
        ));
    };
    if challenge.writeup.is_none() {
        return Err(ApiError::NotFound("No writeup published".to_string()));
    }

    if !secrets_match(&payload.password, stored) {
        record_unauthorized(
            &state,
            NewUnauthorizedAccess {
                ip,
                method: "POST".to_string(),
                path: "/writeups/request-otp".to_string(),
                reason: "invalid_writeup_password".to_string(),
                user_agent: None,
            },
        );
        return Err(ApiError::Unauthorized("Invalid password".to_string()));
    }

    let otp = generate_otp();
    let expires_at = Utc::now() + Duration::minutes(state.config.otp_ttl_minutes);
    state
        .otp_repository
        .create(&email, challenge.id, &sha256_hex(&otp), expires_at)
        .await
        .map_err(|e| {
            error!("Failed to store verification code: {}", e);
            ApiError::InternalServerError
        })?;

    let (subject, text) = otp_message(&otp, &challenge.name, state.config.otp_ttl_minutes);
    state
        .mailer
        .send(&email, &subject, &text)
        .await
        .map_err(|e| match e {
            MailError::Disabled => {
                ApiError::ServiceUnavailable("Mail delivery is not configured".to_string())
            }
            e => {
                warn!("Failed to mail verification code: {}", e);
                ApiError::ServiceUnavailable("Could not send the access code".to_string())
            }
        })?;

    info!("Issued verification code for {}", challenge.id);

    Ok(Json(RequestOtpResponse {
        message: "Access code sent".to_string(),
        expires_at,
    }))
}

/// Trade a passcode for the writeup text
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_otp(&payload.otp).map_err(ApiError::BadRequest)?;
    let email = checked_email(&state, &payload.email).await?;
    ensure_member(&state, &email).await?;

    let record = state
        .otp_repository
        .latest(&email, payload.machine_id)
        .await
        .map_err(|e| {
            error!("Failed to load verification code: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::Unauthorized("No access code was requested".to_string()))?;

    record
        .check(&sha256_hex(&payload.otp), Utc::now())
        .map_err(|rejection| ApiError::Unauthorized(rejection.to_string()))?;

    let claimed = state
        .otp_repository
        .mark_verified(record.id)
        .await
        .map_err(|e| {
            error!("Failed to mark verification code as used: {}", e);
            ApiError::InternalServerError
        })?;
    if !claimed {
        return Err(ApiError::Unauthorized(OtpRejection::AlreadyUsed.to_string()));
    }

    state.otp_limiter.clear(&email).await;

    let challenge = load_challenge(&state, payload.machine_id).await?;
    let writeup = challenge
        .writeup
        .ok_or_else(|| ApiError::NotFound("No writeup published".to_string()))?;

    Ok(Json(WriteupResponse {
        machine_id: challenge.id,
        name: challenge.name,
        writeup,
    }))
}
