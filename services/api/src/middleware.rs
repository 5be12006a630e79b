//! Admin session validation and client address extraction

use axum::{
    async_trait,
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{HeaderMap, Request, header::USER_AGENT, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use common::security::sha256_hex;
use std::{
    convert::Infallible,
    net::{IpAddr, SocketAddr},
};
use tracing::{error, warn};

use crate::{error::ApiError, models::audit::NewUnauthorizedAccess, state::AppState};

/// Address the limiters and logs are keyed on.
///
/// This is the socket peer, unless the peer is one of the configured trusted
/// proxies; then it is the nearest untrusted hop in `X-Forwarded-For`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[async_trait]
impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(
            &parts.headers,
            peer_ip(parts),
            &state.trusted_proxies,
        )))
    }
}

/// Address claimed by the forwarding headers, falling back to [`ClientIp`].
///
/// Callers can set these headers freely, so this only feeds geolocation and
/// the address stored with a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedIp(pub String);

#[async_trait]
impl FromRequestParts<AppState> for ForwardedIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ip = claimed_ip(&parts.headers).unwrap_or_else(|| {
            client_ip(&parts.headers, peer_ip(parts), &state.trusted_proxies)
        });
        Ok(ForwardedIp(ip))
    }
}

fn peer_ip(parts: &Parts) -> Option<IpAddr> {
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trusted: &[IpAddr]) -> String {
    let Some(peer) = peer else {
        return "unknown".to_string();
    };
    if !trusted.contains(&peer) {
        return peer.to_string();
    }

    // Each proxy appends the address it received from, so walk right to left
    // and stop at the first hop that is not one of ours.
    let hops: Vec<&str> = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').map(str::trim).filter(|h| !h.is_empty()).collect())
        .unwrap_or_default();

    let untrusted = hops
        .iter()
        .rev()
        .find(|hop| !hop.parse::<IpAddr>().is_ok_and(|ip| trusted.contains(&ip)));

    untrusted
        .or(hops.first())
        .map(|hop| hop.to_string())
        .or_else(|| header_value(headers, "x-real-ip"))
        .unwrap_or_else(|| peer.to_string())
}

fn claimed_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|h| h.trim().to_string()))
        .filter(|v| !v.is_empty())
        .or_else(|| header_value(headers, "x-real-ip"))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Require a valid admin session bearer token
pub async fn admin_auth(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        spawn_unauthorized_log(&state, ip, &req, "missing_token");
        return Err(ApiError::Unauthorized("Missing bearer token".to_string()));
    };

    let token_hash = sha256_hex(bearer.token());
    let identity = state
        .admin_repository
        .find_active_session(&token_hash)
        .await
        .map_err(|e| {
            error!("Failed to look up admin session: {}", e);
            ApiError::InternalServerError
        })?;

    let Some(identity) = identity else {
        spawn_unauthorized_log(&state, ip, &req, "invalid_session");
        return Err(ApiError::Unauthorized(
            "Invalid or expired session".to_string(),
        ));
    };

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Write an unauthorized-access row without delaying the response
pub fn spawn_unauthorized_log<B>(state: &AppState, ip: String, req: &Request<B>, reason: &str) {
    let entry = NewUnauthorizedAccess {
        ip,
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        reason: reason.to_string(),
        user_agent: req
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.chars().take(256).collect()),
    };
    record_unauthorized(state, entry);
}

/// Same as [`spawn_unauthorized_log`] for handlers that no longer hold the request
pub fn record_unauthorized(state: &AppState, entry: NewUnauthorizedAccess) {
    let audit = state.audit_repository.clone();
    warn!(
        "Unauthorized {} {} from {} ({})",
        entry.method, entry.path, entry.ip, entry.reason
    );

    tokio::spawn(async move {
        if let Err(e) = audit.log_unauthorized(&entry).await {
            error!("Failed to record unauthorized access: {}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn ip(raw: &str) -> IpAddr {
        raw.parse().unwrap()
    }

    fn forwarded(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_untrusted_peer_ignores_forwarding_headers() {
        let mut headers = forwarded("203.0.113.7");
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        assert_eq!(client_ip(&headers, Some(ip("192.0.2.10")), &[]), "192.0.2.10");
        assert_eq!(
            client_ip(&headers, Some(ip("192.0.2.10")), &[ip("10.0.0.1")]),
            "192.0.2.10"
        );
    }

    #[test]
    fn test_trusted_proxy_yields_nearest_untrusted_hop() {
        let trusted = [ip("10.0.0.1"), ip("10.0.0.2")];

        // the leftmost entry is whatever the caller sent
        let headers = forwarded("1.1.1.1, 203.0.113.7, 10.0.0.2");
        assert_eq!(
            client_ip(&headers, Some(ip("10.0.0.1")), &trusted),
            "203.0.113.7"
        );

        let headers = forwarded("10.0.0.2");
        assert_eq!(client_ip(&headers, Some(ip("10.0.0.1")), &trusted), "10.0.0.2");
    }

    #[test]
    fn test_trusted_proxy_without_headers_falls_back() {
        let trusted = [ip("10.0.0.1")];
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(ip("10.0.0.1")), &trusted), "10.0.0.1");

        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(
            client_ip(&headers, Some(ip("10.0.0.1")), &trusted),
            "198.51.100.2"
        );

        assert_eq!(client_ip(&headers, None, &trusted), "unknown");
    }

    #[test]
    fn test_claimed_ip_prefers_forwarded_for() {
        let mut headers = forwarded("203.0.113.7, 10.0.0.1");
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(claimed_ip(&headers).as_deref(), Some("203.0.113.7"));

        headers.remove("x-forwarded-for");
        assert_eq!(claimed_ip(&headers).as_deref(), Some("198.51.100.2"));
        assert_eq!(claimed_ip(&HeaderMap::new()), None);
    }
}
