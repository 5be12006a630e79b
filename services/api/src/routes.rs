//! API service routes

pub mod admin;
pub mod challenges;
pub mod feeds;
pub mod members;
pub mod newsletter;
pub mod stats;
pub mod writeups;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, warn};

use crate::{
    config::ApiConfig, middleware::admin_auth, models::admin::AdminIdentity,
    models::challenge::ChallengeKind, state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/logout", post(admin::logout))
        .route("/session", get(admin::current_session))
        .route("/sessions/cleanup", post(admin::cleanup_sessions))
        .route("/stats/:platform", get(stats::admin_get).put(stats::update))
        .route("/stats/:platform/reset", post(stats::reset))
        .nest("/machines", challenges::admin_router(ChallengeKind::Machine))
        .nest("/rooms", challenges::admin_router(ChallengeKind::Room))
        .route("/members", get(members::list).post(members::create))
        .route("/members/:id", put(members::update).delete(members::remove))
        .route("/subscribers", get(newsletter::list))
        .route("/subscribers/:id", delete(newsletter::remove))
        .route("/logs", get(admin::admin_logs))
        .route("/unauthorized-logs", get(admin::unauthorized_logs))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    let admin_routes = Router::new()
        .route("/login", post(admin::login))
        .merge(protected_routes);

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        .route("/stats/:platform", get(stats::public_get))
        .nest("/machines", challenges::public_router(ChallengeKind::Machine))
        .nest("/rooms", challenges::public_router(ChallengeKind::Room))
        .route("/writeups/request-otp", post(writeups::request_otp))
        .route("/writeups/verify-otp", post(writeups::verify_otp))
        .route("/newsletter/subscribe", post(newsletter::subscribe))
        .route("/newsletter/unsubscribe", post(newsletter::unsubscribe))
        .route("/feeds/tools", get(feeds::tools))
        .route("/feeds/cves", get(feeds::cves))
        .route("/feeds/forums", get(feeds::forums))
        .nest("/admin", admin_routes)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}

/// Append an admin log row; failures are logged and never fail the request
pub(crate) async fn audit(
    state: &AppState,
    identity: &AdminIdentity,
    ip: &str,
    action: &str,
    target: Option<String>,
    details: serde_json::Value,
) {
    if let Err(e) = state
        .audit_repository
        .log_admin_action(identity, action, target.as_deref(), details, ip)
        .await
    {
        error!("Failed to record admin action {}: {}", action, e);
    }
}
