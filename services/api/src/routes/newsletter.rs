//! Newsletter signup and administration

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::audit;
use crate::{
    clients::mailer::welcome_message,
    error::{ApiError, ApiResult},
    middleware::{ClientIp, ForwardedIp},
    models::{
        admin::AdminIdentity,
        member::normalize_email,
        newsletter::{SubscribeRequest, SubscribeResponse, UNKNOWN_COUNTRY, UnsubscribeRequest},
    },
    state::AppState,
};

/// Subscribe to the newsletter
pub async fn subscribe(
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
    ForwardedIp(ip): ForwardedIp,
    Json(payload): Json<SubscribeRequest>,
) -> ApiResult<impl IntoResponse> {
    if !state.newsletter_limiter.is_allowed(&client).await {
        return Err(ApiError::TooManyRequests);
    }

    let signup = payload.validated().map_err(ApiError::BadRequest)?;

    let country = match signup.country.clone() {
        Some(country) => country,
        None => state
            .geo
            .country_for(&ip)
            .await
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
    };

    let subscriber = state
        .newsletter_repository
        .create(&signup.into_new(country, ip))
        .await
        .map_err(|e| {
            error!("Failed to store subscriber: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::Conflict("Email is already subscribed".to_string()))?;

    info!("New newsletter subscriber from {}", subscriber.country);

    if state.mailer.is_enabled() {
        let mailer = state.mailer.clone();
        let (to, name) = (subscriber.email.clone(), subscriber.name.clone());
        tokio::spawn(async move {
            let (subject, text) = welcome_message(&name);
            if let Err(e) = mailer.send(&to, &subject, &text).await {
                warn!("Failed to send welcome mail: {}", e);
            }
        });
    } else {
        debug!("Mailer disabled, skipping welcome mail");
    }

    Ok((StatusCode::CREATED, Json(SubscribeResponse::from(subscriber))))
}

/// Remove a subscription by email
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(payload): Json<UnsubscribeRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email);
    common::validation::validate_email(&email).map_err(ApiError::BadRequest)?;

    let deleted = state
        .newsletter_repository
        .delete_by_email(&email)
        .await
        .map_err(|e| {
            error!("Failed to unsubscribe: {}", e);
            ApiError::InternalServerError
        })?;

    if !deleted {
        return Err(ApiError::NotFound("Email is not subscribed".to_string()));
    }

    Ok(Json(json!({ "message": "Unsubscribed" })))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let subscribers = state.newsletter_repository.list().await.map_err(|e| {
        error!("Failed to list subscribers: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(subscribers))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state.newsletter_repository.delete(id).await.map_err(|e| {
        error!("Failed to delete subscriber {}: {}", id, e);
        ApiError::InternalServerError
    })?;

    if !deleted {
        return Err(ApiError::NotFound("Subscriber not found".to_string()));
    }

    audit(
        &state,
        &identity,
        &ip,
        "delete_subscriber",
        Some(id.to_string()),
        json!({}),
    )
    .await;

    Ok(Json(json!({ "message": "Subscriber deleted" })))
}
