// src/scrape.rs
//! Job-posting scraper: fetch a posting URL and extract title, company,
//! location and description.

use crate::config::ScrapeConfig;
use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{info, warn};
use url::Url;

static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("blank lines regex"));

/// Extracted posting fields. Empty strings mean "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapedJob {
    pub title: String,
    pub company: String,
    pub description: String,
    pub office_location: String,
    pub country: String,
}

pub struct JobScraper {
    client: Client,
}

impl JobScraper {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch and parse a posting. Non-2xx responses fail with the
    /// numeric status in the error.
    pub async fn scrape(&self, url: &str) -> Result<ScrapedJob> {
        let url = normalize_job_url(url)?;
        info!("Fetching job post: {}", url);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .context("Failed to fetch job post")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status.as_u16());
        }

        let html = response
            .text()
            .await
            .context("Failed to read response body")?;
        let job = parse_job_page(&html)
            .context("Failed to extract job content from page")?;

        info!(
            "Successfully extracted job: {} at {}",
            job.title, job.company
        );
        Ok(job)
    }
}

/// Rewrite LinkedIn collections/search URLs to the plain job-view form;
/// everything else passes through after a parse check.
pub fn normalize_job_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("Invalid URL: {}", raw))?;

    let host = url.host_str().unwrap_or_default();
    if !host.ends_with("linkedin.com") {
        return Ok(url);
    }

    let path = url.path();
    if path.contains("/jobs/collections") || path.contains("/jobs/search") {
        let job_id = url
            .query_pairs()
            .find(|(key, _)| key == "currentJobId")
            .map(|(_, value)| value.to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Could not find job id in LinkedIn URL: {}", raw))?;
        let rewritten = format!("https://{}/jobs/view/{}", host, job_id);
        return Url::parse(&rewritten).context("Failed to build job view URL");
    }

    Ok(url)
}

/// LinkedIn selectors first, generic fallback second.
pub fn parse_job_page(html: &str) -> Option<ScrapedJob> {
    let document = Html::parse_document(html);
    parse_linkedin(&document).or_else(|| parse_generic(&document))
}

fn parse_linkedin(document: &Html) -> Option<ScrapedJob> {
    let title = find_text(document, &[".top-card-layout__title", "h1.top-card-layout__title"])?;

    // The topcard "flavor" row carries company first, location second.
    let flavors = collect_texts(document, ".topcard__flavor");
    let company = flavors.first().cloned().unwrap_or_default();
    let location = flavors.get(1).cloned().unwrap_or_default();
    let (office_location, country) = split_location(&location);

    let description = find_text(
        document,
        &[
            ".description__text.description__text--rich",
            ".description__text",
            ".show-more-less-html__markup",
        ],
    )
    .map(|text| collapse_blank_lines(&text))
    .unwrap_or_default();

    Some(ScrapedJob {
        title,
        company,
        description,
        office_location,
        country,
    })
}

fn parse_generic(document: &Html) -> Option<ScrapedJob> {
    warn!("Falling back to generic job parsing");

    let title = find_text(
        document,
        &["h1", "[class*='title']", "[class*='job-title']", "[class*='position']"],
    )?;
    let company = find_text(
        document,
        &["[class*='company']", "[class*='employer']", "[class*='organization']"],
    )
    .unwrap_or_default();
    let description = find_text(
        document,
        &[
            "[class*='description']",
            "[class*='content']",
            "[class*='details']",
            "main",
            "article",
        ],
    )?;

    Some(ScrapedJob {
        title,
        company,
        description,
        office_location: String::new(),
        country: String::new(),
    })
}

fn find_text(document: &Html, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let text = clean_text(&element.text().collect::<Vec<_>>().join(" "));
                if text.len() > 5 {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn collect_texts(document: &Html, selector_str: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector_str) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|element| clean_text(&element.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
        .collect()
}

/// "Zurich, Switzerland" → ("Zurich", "Switzerland").
fn split_location(location: &str) -> (String, String) {
    match location.split_once(", ") {
        Some((city, country)) => (city.trim().to_string(), country.trim().to_string()),
        None => (location.trim().to_string(), String::new()),
    }
}

fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse runs of three or more newlines into a single blank line.
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_LINES_RE.replace_all(text, "\n\n").trim().to_string()
}
