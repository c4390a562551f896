// src/web/types.rs
//! Wire types: the response envelope, request bodies and the PDF
//! responder.

use crate::feedback::{Notice, Severity};
use rocket::http::ContentType;
use rocket::response::{self, Responder};
use rocket::serde::{Deserialize, Serialize};
use rocket::{Request, Response};
use std::collections::BTreeMap;

/// The envelope every mutating endpoint answers with:
/// `{success, message|error, redirect?, reload?, errors?}` plus the
/// presentation hints clients render the notice with.
#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload: Option<bool>,
    /// Per-field validation messages, present on 422 responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
    pub severity: Severity,
    pub css_class: &'static str,
    /// Milliseconds after which the notice self-dismisses; absent means
    /// it persists until dismissed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismiss_ms: Option<u64>,
}

impl Envelope {
    fn from_notice(notice: Notice) -> Self {
        let success = notice.severity != Severity::Error;
        let dismiss_ms = notice.dismiss_after();
        let severity = notice.severity;
        Self {
            success,
            message: success.then_some(notice.message.clone()),
            error: (!success).then_some(notice.message),
            redirect: None,
            reload: None,
            errors: None,
            severity,
            css_class: severity.css_class(),
            dismiss_ms,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::from_notice(Notice::new(message, Severity::Success))
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::from_notice(Notice::new(error, Severity::Error))
    }

    pub fn with_redirect(mut self, redirect: impl Into<String>) -> Self {
        self.redirect = Some(redirect.into());
        self
    }

    pub fn with_reload(mut self) -> Self {
        self.reload = Some(true);
        self
    }

    pub fn with_field_errors(mut self, errors: BTreeMap<String, String>) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// Scrape endpoint envelope: `{success, title?, company?, description?,
/// message?}` plus the location fields the scraper recovers.
#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ScrapeResultResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeResultResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            title: None,
            company: None,
            description: None,
            office_location: None,
            country: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StatsResponse {
    pub success: bool,
    pub data: BTreeMap<String, String>,
}

// ===== Request bodies =====

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct NewJobRequest {
    pub company: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub office_location: Option<String>,
    pub country: Option<String>,
    pub job_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct QuickLogRequest {
    pub note: Option<String>,
    pub status_change: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ScrapeRequest {
    pub url: Option<String>,
    /// When present, scraped fields are persisted onto this job.
    pub job_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct GeneratePdfRequest {
    pub doc_type: String,
    pub content: Option<String>,
    pub template_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SaveTemplateRequest {
    pub name: Option<String>,
    pub content: Option<String>,
    pub template_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub skills: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct CsrfResponse {
    pub success: bool,
    pub token: String,
}

// ===== PDF responder =====

pub struct PdfResponse {
    pub data: Vec<u8>,
    pub filename: Option<String>,
}

impl PdfResponse {
    pub fn with_filename(data: Vec<u8>, filename: String) -> Self {
        Self {
            data,
            filename: Some(filename),
        }
    }
}

impl<'r> Responder<'r, 'static> for PdfResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut binding = Response::build();
        let mut response = binding
            .header(ContentType::PDF)
            .sized_body(self.data.len(), std::io::Cursor::new(self.data));

        if let Some(filename) = self.filename {
            response = response.raw_header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename),
            );
        }

        response.ok()
    }
}
