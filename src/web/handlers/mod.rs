// src/web/handlers/mod.rs
//! Request handlers, one module per resource. Handlers validate input,
//! call into the repositories/services and convert failures into error
//! envelopes at this boundary.

pub mod documents;
pub mod drafts;
pub mod jobs;
pub mod profile;
pub mod scrape;
pub mod stats;
pub mod templates;

use crate::forms::{RuleOutcome, ValidationReport, ValidatorSet};
use crate::models::ApplicationStatus;
use crate::web::types::Envelope;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use std::sync::LazyLock;

pub type ApiError = Custom<Json<Envelope>>;
pub type ApiResult<T> = Result<T, ApiError>;

pub fn bad_request(message: impl Into<String>) -> ApiError {
    Custom(Status::BadRequest, Json(Envelope::error(message)))
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    Custom(Status::NotFound, Json(Envelope::error(message)))
}

pub fn conflict(message: impl Into<String>) -> ApiError {
    Custom(Status::Conflict, Json(Envelope::error(message)))
}

pub fn server_error(message: impl Into<String>) -> ApiError {
    Custom(Status::InternalServerError, Json(Envelope::error(message)))
}

pub fn validation_failed(report: ValidationReport) -> ApiError {
    Custom(
        Status::UnprocessableEntity,
        Json(Envelope::error("Validation failed").with_field_errors(report.errors)),
    )
}

/// Shared validator registry. Domain enums plug in as named custom
/// rules so handlers can mix them with the built-ins.
pub fn validators() -> &'static ValidatorSet {
    static VALIDATORS: LazyLock<ValidatorSet> = LazyLock::new(|| {
        let mut set = ValidatorSet::new();
        set.register("status", |value, _| -> RuleOutcome {
            ApplicationStatus::parse(value)
                .map(|_| ())
                .map_err(|_| format!("Invalid status: {}", value))
        });
        set.register("job_mode", |value, _| -> RuleOutcome {
            match value {
                "Remote" | "Hybrid" | "On-site" => Ok(()),
                other => Err(format!("Invalid job mode: {}", other)),
            }
        });
        set
    });
    &VALIDATORS
}
