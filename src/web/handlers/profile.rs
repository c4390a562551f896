// src/web/handlers/profile.rs

use rocket::serde::json::Json;
use rocket::serde::Serialize;
use rocket::State;
use tracing::error;

use crate::database::{Database, ProfileRepository};
use crate::forms::{clean_skills_string, validate_form, FormData, Rule};
use crate::models::Profile;
use crate::web::types::{Envelope, ProfileRequest};

use super::{server_error, validation_failed, validators, ApiResult};

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: Option<Profile>,
    pub skills: Vec<String>,
}

pub async fn get_profile_handler(db: &State<Database>) -> ApiResult<Json<ProfileResponse>> {
    let profile = ProfileRepository::new(db.pool()).get().await.map_err(|e| {
        error!("Failed to load profile: {}", e);
        server_error("Failed to load the user profile")
    })?;
    let skills = profile
        .as_ref()
        .map(Profile::skills_list)
        .unwrap_or_default();
    Ok(Json(ProfileResponse {
        success: true,
        profile,
        skills,
    }))
}

fn profile_rules() -> Vec<(&'static str, Vec<Rule>)> {
    vec![
        ("name", vec![Rule::Required, Rule::MaxLen(200)]),
        ("email", vec![Rule::Required, Rule::Email]),
        ("phone", vec![Rule::Phone]),
        ("linkedin", vec![Rule::Url]),
        ("github", vec![Rule::Url]),
    ]
}

pub async fn save_profile_handler(
    request: Json<ProfileRequest>,
    db: &State<Database>,
) -> ApiResult<Json<Envelope>> {
    let request = request.into_inner();
    let data = FormData::from_pairs([
        ("name", request.name.clone().unwrap_or_default()),
        ("email", request.email.clone().unwrap_or_default()),
        ("phone", request.phone.clone().unwrap_or_default()),
        ("linkedin", request.linkedin.clone().unwrap_or_default()),
        ("github", request.github.clone().unwrap_or_default()),
    ]);
    let mut report = validate_form(&data, &profile_rules(), validators());

    let skills = match request.skills.as_deref().map(clean_skills_string) {
        Some(Ok(cleaned)) if !cleaned.is_empty() => Some(cleaned),
        Some(Ok(_)) | None => None,
        Some(Err(message)) => {
            report.valid = false;
            report.errors.insert("skills".to_string(), message);
            None
        }
    };
    if !report.valid {
        return Err(validation_failed(report));
    }

    ProfileRepository::new(db.pool())
        .upsert(
            request.name.unwrap_or_default().trim(),
            request.email.unwrap_or_default().trim(),
            request.phone.as_deref().filter(|s| !s.trim().is_empty()),
            request.linkedin.as_deref().filter(|s| !s.trim().is_empty()),
            request.github.as_deref().filter(|s| !s.trim().is_empty()),
            skills.as_deref(),
        )
        .await
        .map_err(|e| {
            error!("Failed to save profile: {}", e);
            server_error("Failed to save the user profile")
        })?;

    Ok(Json(Envelope::success("Profile saved")))
}
