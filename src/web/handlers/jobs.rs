// src/web/handlers/jobs.rs

use rocket::serde::json::Json;
use rocket::serde::Serialize;
use rocket::State;
use tracing::error;

use crate::database::{Database, DocumentRepository, JobRepository, NewJob, ProfileRepository};
use crate::feedback::relative_time;
use crate::forms::{validate_form, FormData, Rule};
use crate::matching::{analyze, extract_keywords, MatchReport};
use crate::models::{ApplicationStatus, Document, JobApplication};
use crate::web::types::{Envelope, NewJobRequest, QuickLogRequest, UpdateStatusRequest};

use super::{bad_request, not_found, server_error, validation_failed, validators, ApiResult};

fn new_job_rules() -> Vec<(&'static str, Vec<Rule>)> {
    vec![
        ("company", vec![Rule::Required, Rule::MaxLen(200)]),
        ("title", vec![Rule::Required, Rule::MaxLen(200)]),
        ("url", vec![Rule::Url]),
        ("job_mode", vec![Rule::custom("job_mode")]),
    ]
}

pub async fn create_job_handler(
    request: Json<NewJobRequest>,
    db: &State<Database>,
) -> ApiResult<Json<Envelope>> {
    let request = request.into_inner();
    let data = FormData::from_pairs([
        ("company", request.company.clone().unwrap_or_default()),
        ("title", request.title.clone().unwrap_or_default()),
        ("url", request.url.clone().unwrap_or_default()),
        ("job_mode", request.job_mode.clone().unwrap_or_default()),
    ]);
    let report = validate_form(&data, &new_job_rules(), validators());
    if !report.valid {
        return Err(validation_failed(report));
    }

    let job = NewJob {
        company: request.company.unwrap_or_default().trim().to_string(),
        title: request.title.unwrap_or_default().trim().to_string(),
        description: request.description.filter(|s| !s.trim().is_empty()),
        url: request.url.filter(|s| !s.trim().is_empty()),
        office_location: request.office_location.filter(|s| !s.trim().is_empty()),
        country: request.country.filter(|s| !s.trim().is_empty()),
        job_mode: request
            .job_mode
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "On-site".to_string()),
    };

    let created = JobRepository::new(db.pool())
        .create(job)
        .await
        .map_err(|e| {
            error!("Failed to create job: {}", e);
            server_error("Failed to save the job application")
        })?;

    Ok(Json(
        Envelope::success("Job application added!").with_redirect(format!("/job/{}", created.id)),
    ))
}

/// One timeline entry: the stored log row plus a display-ready relative
/// timestamp label.
#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TimelineEntry {
    pub id: i64,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_change_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_change_to: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub when: String,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct JobDetailResponse {
    pub success: bool,
    pub job: JobApplication,
    pub when: String,
    pub logs: Vec<TimelineEntry>,
    pub documents: Vec<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_match: Option<MatchReport>,
    /// Frequent description keywords, for skill suggestions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

pub async fn job_detail_handler(
    id: i64,
    db: &State<Database>,
) -> ApiResult<Json<JobDetailResponse>> {
    let jobs = JobRepository::new(db.pool());
    let job = jobs
        .get(id)
        .await
        .map_err(|e| {
            error!("Failed to load job {}: {}", id, e);
            server_error("Failed to load the job application")
        })?
        .ok_or_else(|| not_found("Job application not found"))?;

    let now = chrono::Utc::now();
    let logs = jobs
        .logs(id)
        .await
        .map_err(|e| {
            error!("Failed to load logs for job {}: {}", id, e);
            server_error("Failed to load the activity log")
        })?
        .into_iter()
        .map(|log| TimelineEntry {
            when: relative_time(log.created_at, now),
            id: log.id,
            note: log.note,
            status_change_from: log.status_change_from,
            status_change_to: log.status_change_to,
            created_at: log.created_at,
        })
        .collect();

    let documents = DocumentRepository::new(db.pool())
        .for_job(id)
        .await
        .map_err(|e| {
            error!("Failed to load documents for job {}: {}", id, e);
            server_error("Failed to load generated documents")
        })?;

    // Skill match is best effort: no profile or no description means no
    // report, not an error.
    let skill_match = match (
        &job.description,
        ProfileRepository::new(db.pool()).get().await,
    ) {
        (Some(description), Ok(Some(profile))) => {
            let skills = profile.skills_list();
            if skills.is_empty() {
                None
            } else {
                Some(analyze(description, &skills))
            }
        }
        (_, Err(e)) => {
            error!("Failed to load profile for match report: {}", e);
            None
        }
        _ => None,
    };

    let keywords = job
        .description
        .as_deref()
        .map(extract_keywords)
        .unwrap_or_default();

    Ok(Json(JobDetailResponse {
        success: true,
        when: relative_time(job.last_update, now),
        job,
        logs,
        documents,
        skill_match,
        keywords,
    }))
}

pub async fn delete_job_handler(id: i64, db: &State<Database>) -> ApiResult<Json<Envelope>> {
    let deleted = JobRepository::new(db.pool()).delete(id).await.map_err(|e| {
        error!("Failed to delete job {}: {}", id, e);
        server_error("Failed to delete the job application")
    })?;
    if !deleted {
        return Err(not_found("Job application not found"));
    }
    Ok(Json(
        Envelope::success("Job application deleted").with_redirect("/"),
    ))
}

pub async fn update_status_handler(
    id: i64,
    request: Json<UpdateStatusRequest>,
    db: &State<Database>,
) -> ApiResult<Json<Envelope>> {
    let status = ApplicationStatus::parse(&request.status)
        .map_err(|_| bad_request(format!("Invalid status: {}", request.status)))?;

    let jobs = JobRepository::new(db.pool());
    let job = jobs
        .get(id)
        .await
        .map_err(|e| {
            error!("Failed to load job {}: {}", id, e);
            server_error("Failed to load the job application")
        })?
        .ok_or_else(|| not_found("Job application not found"))?;

    let previous = job
        .status_enum()
        .map_err(|_| server_error("Stored status is corrupt"))?;

    jobs.update_status(id, status).await.map_err(|e| {
        error!("Failed to update status for job {}: {}", id, e);
        server_error("Failed to update the status")
    })?;

    if previous != status {
        jobs.add_log(
            id,
            &format!("Status changed: {} to {}", previous.as_str(), status.as_str()),
            Some((previous, status)),
        )
        .await
        .map_err(|e| {
            error!("Failed to record status change for job {}: {}", id, e);
            server_error("Failed to record the status change")
        })?;
    }

    Ok(Json(
        Envelope::success(format!("Status updated to {}", status.as_str())).with_reload(),
    ))
}

fn quick_log_rules() -> Vec<(&'static str, Vec<Rule>)> {
    vec![
        (
            "note",
            vec![Rule::Required, Rule::MinLen(5), Rule::MaxLen(1000)],
        ),
        ("status_change", vec![Rule::custom("status")]),
    ]
}

pub async fn quick_log_handler(
    id: i64,
    request: Json<QuickLogRequest>,
    db: &State<Database>,
) -> ApiResult<Json<Envelope>> {
    let request = request.into_inner();
    let data = FormData::from_pairs([
        ("note", request.note.clone().unwrap_or_default()),
        (
            "status_change",
            request.status_change.clone().unwrap_or_default(),
        ),
    ]);
    let report = validate_form(&data, &quick_log_rules(), validators());
    if !report.valid {
        return Err(validation_failed(report));
    }

    let jobs = JobRepository::new(db.pool());
    let job = jobs
        .get(id)
        .await
        .map_err(|e| {
            error!("Failed to load job {}: {}", id, e);
            server_error("Failed to load the job application")
        })?
        .ok_or_else(|| not_found("Job application not found"))?;

    let note = request.note.unwrap_or_default().trim().to_string();
    let status_change = match request.status_change.filter(|s| !s.trim().is_empty()) {
        Some(target) => {
            let to = ApplicationStatus::parse(&target)
                .map_err(|_| bad_request(format!("Invalid status: {}", target)))?;
            let from = job
                .status_enum()
                .map_err(|_| server_error("Stored status is corrupt"))?;
            jobs.update_status(id, to).await.map_err(|e| {
                error!("Failed to update status for job {}: {}", id, e);
                server_error("Failed to update the status")
            })?;
            Some((from, to))
        }
        None => None,
    };

    jobs.add_log(id, &note, status_change).await.map_err(|e| {
        error!("Failed to add log for job {}: {}", id, e);
        server_error("Failed to save the log entry")
    })?;

    Ok(Json(Envelope::success("Log entry added").with_reload()))
}
