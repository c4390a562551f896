// src/web/handlers/scrape.rs

use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info, warn};

use crate::database::{Database, JobRepository};
use crate::scrape::JobScraper;
use crate::web::guards::OperationGate;
use crate::web::types::{ScrapeRequest, ScrapeResultResponse};

use super::{bad_request, conflict, not_found, server_error, ApiResult};

/// Scrape a posting URL. Bad input is rejected before any network
/// request goes out; with a `job_id` the scraped fields are persisted
/// onto that application.
pub async fn scrape_handler(
    request: Json<ScrapeRequest>,
    db: &State<Database>,
    scraper: &State<JobScraper>,
    gate: &State<OperationGate>,
) -> ApiResult<Json<ScrapeResultResponse>> {
    let request = request.into_inner();

    let url = match request.url.as_deref().map(str::trim) {
        None | Some("") => return Err(bad_request("Please enter a job posting URL")),
        Some(url) => url.to_string(),
    };
    if url::Url::parse(&url).is_err() {
        return Err(bad_request(
            "Please enter a valid URL (e.g. https://example.com/job)",
        ));
    }

    let gate_key = match request.job_id {
        Some(id) => format!("scrape:{}", id),
        None => format!("scrape:{}", url),
    };
    let _permit = gate
        .try_begin(&gate_key)
        .ok_or_else(|| conflict("A scrape for this job is already running"))?;

    if let Some(job_id) = request.job_id {
        let exists = JobRepository::new(db.pool())
            .get(job_id)
            .await
            .map_err(|e| {
                error!("Failed to load job {}: {}", job_id, e);
                server_error("Failed to load the job application")
            })?
            .is_some();
        if !exists {
            return Err(not_found("Job application not found"));
        }
    }

    let scraped = match scraper.scrape(&url).await {
        Ok(scraped) => scraped,
        Err(e) => {
            warn!("Scrape failed for {}: {}", url, e);
            return Ok(Json(ScrapeResultResponse::failure(format!(
                "Could not scrape the job posting: {}",
                e
            ))));
        }
    };

    if let Some(job_id) = request.job_id {
        JobRepository::new(db.pool())
            .apply_scraped(
                job_id,
                Some(&scraped.title),
                Some(&scraped.company),
                Some(&scraped.description),
                &url,
            )
            .await
            .map_err(|e| {
                error!("Failed to persist scraped fields for job {}: {}", job_id, e);
                server_error("Failed to save the scraped details")
            })?;
        info!("Applied scraped fields to job {}", job_id);
    }

    let optional = |s: String| if s.is_empty() { None } else { Some(s) };
    Ok(Json(ScrapeResultResponse {
        success: true,
        title: optional(scraped.title),
        company: optional(scraped.company),
        description: optional(scraped.description),
        office_location: optional(scraped.office_location),
        country: optional(scraped.country),
        message: Some("Job details scraped successfully!".to_string()),
        error: None,
    }))
}
