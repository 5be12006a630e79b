//! GitHub repository listings

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::feed::Tool;

#[derive(Debug, Deserialize)]
pub(crate) struct GithubRepo {
    full_name: String,
    name: String,
    description: Option<String>,
    html_url: String,
    language: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    topics: Vec<String>,
    updated_at: Option<DateTime<Utc>>,
}

/// Fetch the public, non-fork repositories of a user
pub async fn fetch_tools(
    http: &reqwest::Client,
    api_url: &str,
    user: &str,
    token: Option<&str>,
) -> Result<Vec<Tool>> {
    let url = format!("{}/users/{}/repos", api_url.trim_end_matches('/'), user);

    let mut request = http
        .get(&url)
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .query(&[("per_page", "100"), ("sort", "updated")]);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        bail!("GitHub returned {}", response.status());
    }

    let repos: Vec<GithubRepo> = response.json().await?;
    Ok(into_tools(repos))
}

pub(crate) fn into_tools(repos: Vec<GithubRepo>) -> Vec<Tool> {
    repos
        .into_iter()
        .filter(|repo| !repo.fork && !repo.archived)
        .map(|repo| Tool {
            id: repo.full_name,
            name: repo.name,
            description: repo.description.filter(|d| !d.trim().is_empty()),
            url: repo.html_url,
            language: repo.language,
            stars: repo.stargazers_count,
            category: repo.topics.into_iter().next(),
            updated_at: repo.updated_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "full_name": "octocat/recon-kit",
            "name": "recon-kit",
            "description": "Subdomain enumeration helpers",
            "html_url": "https://github.com/octocat/recon-kit",
            "language": "Rust",
            "stargazers_count": 41,
            "fork": false,
            "topics": ["recon", "osint"],
            "updated_at": "2024-05-01T10:00:00Z"
        },
        {
            "full_name": "octocat/linux",
            "name": "linux",
            "description": null,
            "html_url": "https://github.com/octocat/linux",
            "language": "C",
            "stargazers_count": 3,
            "fork": true,
            "updated_at": "2024-04-01T10:00:00Z"
        }
    ]"#;

    #[test]
    fn test_forks_are_dropped_and_ids_are_full_names() {
        let repos: Vec<GithubRepo> = serde_json::from_str(SAMPLE).unwrap();
        let tools = into_tools(repos);

        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].id, "octocat/recon-kit");
        assert_eq!(tools[0].stars, 41);
        assert_eq!(tools[0].category.as_deref(), Some("recon"));
    }
}
