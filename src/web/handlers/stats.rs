// src/web/handlers/stats.rs

use rocket::serde::json::Json;
use rocket::State;
use tracing::error;

use crate::database::{Database, JobRepository};
use crate::web::types::StatsResponse;

use super::{server_error, ApiResult};

/// Dashboard counters, keyed the way the dashboard addresses its
/// `stat-<key>` elements.
pub async fn dashboard_stats_handler(db: &State<Database>) -> ApiResult<Json<StatsResponse>> {
    let stats = JobRepository::new(db.pool())
        .dashboard_stats()
        .await
        .map_err(|e| {
            error!("Failed to compute dashboard stats: {}", e);
            server_error("Failed to load dashboard statistics")
        })?;
    Ok(Json(StatsResponse {
        success: true,
        data: stats.into_iter().collect(),
    }))
}
