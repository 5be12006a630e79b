//! NVD CVE API 2.0

use anyhow::{Result, bail};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::feed::CveItem;

const NVD_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
const RESULTS_PER_PAGE: u64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NvdResponse {
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    vulnerabilities: Vec<NvdVulnerability>,
}

#[derive(Debug, Deserialize)]
struct NvdVulnerability {
    cve: NvdCve,
}

#[derive(Debug, Deserialize)]
struct NvdCve {
    id: String,
    published: String,
    #[serde(default)]
    descriptions: Vec<NvdDescription>,
    #[serde(default)]
    metrics: NvdMetrics,
}

#[derive(Debug, Deserialize)]
struct NvdDescription {
    lang: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NvdMetrics {
    #[serde(default)]
    cvss_metric_v31: Vec<CvssMetric>,
    #[serde(default)]
    cvss_metric_v30: Vec<CvssMetric>,
    #[serde(default)]
    cvss_metric_v2: Vec<CvssMetric>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CvssMetric {
    cvss_data: CvssData,
    /// v2 carries the severity next to the data instead of inside it
    base_severity: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CvssData {
    base_score: f64,
    base_severity: Option<String>,
}

/// Fetch the newest CVEs published during the last `days` days
///
/// NVD lists results oldest first, so when the window holds more than one
/// page the last page is fetched instead of the first.
pub async fn fetch_cves(
    http: &reqwest::Client,
    api_url: &str,
    api_key: Option<&str>,
    days: i64,
) -> Result<Vec<CveItem>> {
    let end = Utc::now();
    let start = end - Duration::days(days);
    let window = (
        start.format(NVD_DATE_FORMAT).to_string(),
        end.format(NVD_DATE_FORMAT).to_string(),
    );

    let mut body = fetch_page(http, api_url, api_key, &window, 0).await?;
    if let Some(start_index) = newest_page_start(body.total_results, RESULTS_PER_PAGE) {
        debug!(
            "NVD window holds {} CVEs, fetching from index {}",
            body.total_results, start_index
        );
        body = fetch_page(http, api_url, api_key, &window, start_index).await?;
    }

    Ok(into_items(body))
}

async fn fetch_page(
    http: &reqwest::Client,
    api_url: &str,
    api_key: Option<&str>,
    (start, end): &(String, String),
    start_index: u64,
) -> Result<NvdResponse> {
    let mut request = http.get(api_url).query(&[
        ("pubStartDate", start.clone()),
        ("pubEndDate", end.clone()),
        ("resultsPerPage", RESULTS_PER_PAGE.to_string()),
        ("startIndex", start_index.to_string()),
    ]);
    if let Some(key) = api_key {
        request = request.header("apiKey", key);
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        bail!("NVD returned {}", response.status());
    }

    Ok(response.json().await?)
}

/// Start index of the page holding the newest results, when the first page
/// does not already cover everything
fn newest_page_start(total_results: u64, per_page: u64) -> Option<u64> {
    (total_results > per_page).then(|| total_results - per_page)
}

/// Map NVD records, skipping any whose publication date cannot be read
pub(crate) fn into_items(body: NvdResponse) -> Vec<CveItem> {
    body.vulnerabilities
        .into_iter()
        .filter_map(|v| {
            let cve = v.cve;
            let published = match parse_published(&cve.published) {
                Ok(published) => published,
                Err(e) => {
                    warn!("Skipping {} with unreadable publication date: {}", cve.id, e);
                    return None;
                }
            };
            let description = cve
                .descriptions
                .iter()
                .find(|d| d.lang == "en")
                .or_else(|| cve.descriptions.first())
                .map(|d| d.value.clone())
                .unwrap_or_default();
            let (score, severity) = cve.metrics.primary();

            Some(CveItem {
                url: format!("https://nvd.nist.gov/vuln/detail/{}", cve.id),
                id: cve.id,
                description,
                published,
                score,
                severity,
            })
        })
        .collect()
}

impl NvdMetrics {
    /// CVSS v3.1, then v3.0, then v2
    fn primary(&self) -> (Option<f64>, Option<String>) {
        let metric = self
            .cvss_metric_v31
            .first()
            .or_else(|| self.cvss_metric_v30.first())
            .or_else(|| self.cvss_metric_v2.first());

        match metric {
            Some(m) => (
                Some(m.cvss_data.base_score),
                m.cvss_data
                    .base_severity
                    .clone()
                    .or_else(|| m.base_severity.clone())
                    .map(|s| s.to_ascii_uppercase()),
            ),
            None => (None, None),
        }
    }
}

/// NVD timestamps carry no offset and are UTC
fn parse_published(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")?;
    Ok(naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "resultsPerPage": 2,
        "vulnerabilities": [
            {
                "cve": {
                    "id": "CVE-2024-0001",
                    "published": "2024-03-01T12:15:07.123",
                    "descriptions": [
                        {"lang": "es", "value": "Desbordamiento"},
                        {"lang": "en", "value": "Buffer overflow in parser"}
                    ],
                    "metrics": {
                        "cvssMetricV30": [{"cvssData": {"baseScore": 7.0, "baseSeverity": "HIGH"}}],
                        "cvssMetricV31": [{"cvssData": {"baseScore": 9.8, "baseSeverity": "CRITICAL"}}]
                    }
                }
            },
            {
                "cve": {
                    "id": "CVE-2014-0160",
                    "published": "2014-04-07T22:55:03.893",
                    "descriptions": [{"lang": "en", "value": "Heartbleed"}],
                    "metrics": {
                        "cvssMetricV2": [{"cvssData": {"baseScore": 5.0}, "baseSeverity": "MEDIUM"}]
                    }
                }
            }
        ]
    }"#;

    #[test]
    fn test_parses_scores_by_priority() {
        let body: NvdResponse = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(body.total_results, 0);
        let items = into_items(body);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "Buffer overflow in parser");
        assert_eq!(items[0].score, Some(9.8));
        assert_eq!(items[0].severity.as_deref(), Some("CRITICAL"));
        assert_eq!(items[1].severity.as_deref(), Some("MEDIUM"));
        assert_eq!(items[1].url, "https://nvd.nist.gov/vuln/detail/CVE-2014-0160");
    }

    #[test]
    fn test_published_is_utc() {
        let published = parse_published("2024-03-01T12:15:07.123").unwrap();
        assert_eq!(published.to_rfc3339(), "2024-03-01T12:15:07.123+00:00");
        assert!(parse_published("yesterday").is_err());
    }

    #[test]
    fn test_missing_metrics() {
        let body: NvdResponse = serde_json::from_str(
            r#"{"vulnerabilities":[{"cve":{"id":"CVE-2024-9","published":"2024-01-01T00:00:00.000"}}]}"#,
        )
        .unwrap();
        let items = into_items(body);
        assert!(items[0].score.is_none());
        assert!(items[0].description.is_empty());
    }

    #[test]
    fn test_unreadable_date_skips_only_that_record() {
        let body: NvdResponse = serde_json::from_str(
            r#"{
                "totalResults": 3,
                "vulnerabilities": [
                    {"cve": {"id": "CVE-2024-1", "published": "2024-01-01T00:00:00.000"}},
                    {"cve": {"id": "CVE-2024-2", "published": "last tuesday"}},
                    {"cve": {"id": "CVE-2024-3", "published": "2024-01-03T08:30:00.000"}}
                ]
            }"#,
        )
        .unwrap();

        let ids: Vec<String> = into_items(body).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["CVE-2024-1".to_string(), "CVE-2024-3".to_string()]);
    }

    #[test]
    fn test_newest_page_start() {
        assert_eq!(newest_page_start(0, 100), None);
        assert_eq!(newest_page_start(100, 100), None);
        assert_eq!(newest_page_start(101, 100), Some(1));
        assert_eq!(newest_page_start(2345, 100), Some(2245));
    }
}
