//! IP geolocation lookups

use serde::Deserialize;
use std::net::IpAddr;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct GeoResponse {
    status: String,
    country: Option<String>,
}

/// Country lookup against an ip-api compatible endpoint
#[derive(Debug, Clone)]
pub struct GeoLocator {
    http: reqwest::Client,
    api_url: String,
}

impl GeoLocator {
    pub fn new(http: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Best-effort country of a client IP; `None` for private addresses or failures
    pub async fn country_for(&self, ip: &str) -> Option<String> {
        let addr: IpAddr = ip.parse().ok()?;
        if !is_public_ip(&addr) {
            return None;
        }

        let url = format!("{}/{}", self.api_url, addr);
        let response = match self
            .http
            .get(&url)
            .query(&[("fields", "status,country")])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Geolocation lookup failed: {}", e);
                return None;
            }
        };

        match response.json::<GeoResponse>().await {
            Ok(body) => parse_country(body),
            Err(e) => {
                warn!("Geolocation response could not be decoded: {}", e);
                None
            }
        }
    }
}

fn parse_country(body: GeoResponse) -> Option<String> {
    if body.status != "success" {
        return None;
    }
    body.country.filter(|c| !c.trim().is_empty())
}

/// Whether an address is routable on the public internet
pub fn is_public_ip(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation())
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_addresses_are_skipped() {
        for ip in ["127.0.0.1", "10.1.2.3", "192.168.0.10", "::1", "fd00::1", "fe80::1"] {
            assert!(!is_public_ip(&ip.parse().unwrap()), "{ip}");
        }
        assert!(is_public_ip(&"8.8.8.8".parse().unwrap()));
        assert!(is_public_ip(&"2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn test_parse_country() {
        let ok: GeoResponse =
            serde_json::from_str(r#"{"status":"success","country":"Cameroon"}"#).unwrap();
        assert_eq!(parse_country(ok).as_deref(), Some("Cameroon"));

        let failed: GeoResponse = serde_json::from_str(r#"{"status":"fail"}"#).unwrap();
        assert!(parse_country(failed).is_none());
    }

    #[tokio::test]
    async fn test_lookup_skips_invalid_and_private() {
        let geo = GeoLocator::new(reqwest::Client::new(), "http://127.0.0.1:1/json");
        assert!(geo.country_for("unknown").await.is_none());
        assert!(geo.country_for("192.168.1.1").await.is_none());
    }
}
