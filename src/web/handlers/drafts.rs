// src/web/handlers/drafts.rs
//! Autosaved form drafts, addressed by form key.

use rocket::serde::json::Json;
use rocket::serde::Serialize;
use rocket::State;
use tracing::{error, warn};

use crate::database::{Database, DraftRepository};
use crate::forms::FormData;
use crate::web::types::Envelope;

use super::{bad_request, server_error, ApiResult};

fn checked_key(key: &str) -> Result<&str, super::ApiError> {
    if key.trim().is_empty() || key.len() > 100 {
        return Err(bad_request("Invalid draft key"));
    }
    Ok(key)
}

pub async fn save_draft_handler(
    key: &str,
    data: Json<FormData>,
    db: &State<Database>,
) -> ApiResult<Json<Envelope>> {
    let key = checked_key(key)?;
    let payload = serde_json::to_string(&data.into_inner()).map_err(|e| {
        error!("Failed to serialize draft {}: {}", key, e);
        server_error("Failed to save the draft")
    })?;
    DraftRepository::new(db.pool())
        .save(key, &payload)
        .await
        .map_err(|e| {
            error!("Failed to save draft {}: {}", key, e);
            server_error("Failed to save the draft")
        })?;
    Ok(Json(Envelope::success("Draft saved")))
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DraftResponse {
    pub success: bool,
    pub data: Option<FormData>,
}

/// Load a saved draft. A payload that no longer parses is discarded and
/// its slot cleared, the same as no draft at all.
pub async fn load_draft_handler(key: &str, db: &State<Database>) -> ApiResult<Json<DraftResponse>> {
    let key = checked_key(key)?;
    let repo = DraftRepository::new(db.pool());
    let data = match repo.load(key).await.map_err(|e| {
        error!("Failed to load draft {}: {}", key, e);
        server_error("Failed to load the draft")
    })? {
        Some(payload) => match serde_json::from_str::<FormData>(&payload) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Discarding malformed draft {}: {}", key, e);
                repo.remove(key).await.map_err(|e| {
                    error!("Failed to clear malformed draft {}: {}", key, e);
                    server_error("Failed to load the draft")
                })?;
                None
            }
        },
        None => None,
    };
    Ok(Json(DraftResponse {
        success: true,
        data,
    }))
}

pub async fn delete_draft_handler(key: &str, db: &State<Database>) -> ApiResult<Json<Envelope>> {
    let key = checked_key(key)?;
    DraftRepository::new(db.pool())
        .remove(key)
        .await
        .map_err(|e| {
            error!("Failed to delete draft {}: {}", key, e);
            server_error("Failed to delete the draft")
        })?;
    Ok(Json(Envelope::success("Draft cleared")))
}
