//! Reddit and StackOverflow listings

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::feed::{ForumPost, ForumSource};

const REDDIT_WEB: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
pub(crate) struct RedditListing {
    data: RedditListingData,
}

#[derive(Debug, Deserialize)]
struct RedditListingData {
    #[serde(default)]
    children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize)]
struct RedditChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    id: String,
    title: String,
    permalink: String,
    author: String,
    #[serde(default)]
    score: i64,
    subreddit: String,
    created_utc: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StackExchangeResponse {
    #[serde(default)]
    items: Vec<StackExchangeQuestion>,
}

#[derive(Debug, Deserialize)]
struct StackExchangeQuestion {
    question_id: u64,
    title: String,
    link: String,
    owner: Option<StackExchangeOwner>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    tags: Vec<String>,
    creation_date: i64,
}

#[derive(Debug, Deserialize)]
struct StackExchangeOwner {
    display_name: Option<String>,
}

/// Newest posts of one subreddit
pub async fn fetch_subreddit(
    http: &reqwest::Client,
    base_url: &str,
    subreddit: &str,
    limit: usize,
) -> Result<Vec<ForumPost>> {
    let url = format!("{}/r/{}/new.json", base_url.trim_end_matches('/'), subreddit);
    let response = http
        .get(&url)
        .query(&[("limit", limit.to_string())])
        .send()
        .await?;
    if !response.status().is_success() {
        bail!("Reddit returned {} for r/{}", response.status(), subreddit);
    }

    let listing: RedditListing = response.json().await?;
    Ok(reddit_posts(listing))
}

/// Newest StackOverflow questions with the given tags
pub async fn fetch_stackoverflow(
    http: &reqwest::Client,
    base_url: &str,
    tags: &str,
    limit: usize,
) -> Result<Vec<ForumPost>> {
    let url = format!("{}/questions", base_url.trim_end_matches('/'));
    let pagesize = limit.to_string();
    let response = http
        .get(&url)
        .query(&[
            ("order", "desc"),
            ("sort", "creation"),
            ("tagged", tags),
            ("site", "stackoverflow"),
            ("pagesize", pagesize.as_str()),
        ])
        .send()
        .await?;
    if !response.status().is_success() {
        bail!("StackExchange returned {}", response.status());
    }

    let body: StackExchangeResponse = response.json().await?;
    Ok(stackoverflow_posts(body))
}

pub(crate) fn reddit_posts(listing: RedditListing) -> Vec<ForumPost> {
    listing
        .data
        .children
        .into_iter()
        .filter_map(|child| {
            let post = child.data;
            let created_at = DateTime::<Utc>::from_timestamp(post.created_utc as i64, 0)?;
            Some(ForumPost {
                id: format!("reddit:{}", post.id),
                source: ForumSource::Reddit,
                title: decode_entities(&post.title),
                url: format!("{}{}", REDDIT_WEB, post.permalink),
                author: post.author,
                score: post.score,
                community: post.subreddit,
                created_at,
            })
        })
        .collect()
}

pub(crate) fn stackoverflow_posts(body: StackExchangeResponse) -> Vec<ForumPost> {
    body.items
        .into_iter()
        .filter_map(|q| {
            let created_at = DateTime::<Utc>::from_timestamp(q.creation_date, 0)?;
            Some(ForumPost {
                id: format!("so:{}", q.question_id),
                source: ForumSource::Stackoverflow,
                title: decode_entities(&q.title),
                url: q.link,
                author: q
                    .owner
                    .and_then(|o| o.display_name)
                    .map(|n| decode_entities(&n))
                    .unwrap_or_else(|| "anonymous".to_string()),
                score: q.score,
                community: q.tags.join(","),
                created_at,
            })
        })
        .collect()
}

/// Undo the HTML escaping both APIs apply to titles
fn decode_entities(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}
