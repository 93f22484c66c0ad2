use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use services::archive::{ArchivePolicy, run_archival};
use services::categories::repair_categories;
use services::sync::{Reconciler, SyncSettings};
use std::collections::BTreeMap;
use tracing::info;
use util::config;
use validator::Validate;

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::routes::common::check_secret;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SecretRequest {
    #[serde(default)]
    pub admin_secret: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SyncRequest {
    #[serde(default)]
    pub admin_secret: String,
    /// Reconciles this guild instead of `DISCORD_GUILD_ID`.
    #[validate(length(min = 1, message = "guild_id must not be empty"))]
    pub guild_id: Option<String>,
    /// Replaces `DISCORD_CATEGORY_MAPPINGS` for this run.
    #[validate(length(min = 1, message = "category_mappings must not be empty"))]
    pub category_mappings: Option<BTreeMap<String, String>>,
}

impl SyncRequest {
    fn settings(self) -> SyncSettings {
        let mut settings = SyncSettings::from_config();
        if let Some(guild_id) = self.guild_id {
            settings.guild_id = guild_id;
        }
        if let Some(mappings) = self.category_mappings {
            settings.category_mappings = mappings;
        }
        settings
    }
}

fn job_running() -> AppError {
    AppError::Conflict("Another Discord job is already running".into())
}

/// POST /api/jobs/sync
///
/// Runs one reconciliation pass now. `guild_id` and `category_mappings`
/// override the configured values for this run only, which is how a guild is
/// imported for the first time.
///
/// ### Request body
/// ```json
/// { "admin_secret": "...", "guild_id": "123...", "category_mappings": { "456...": "Claim" } }
/// ```
///
/// ### Responses
/// - `200 OK` with the sync report
/// - `403 Forbidden` on a wrong or unset secret
/// - `409 Conflict` while a sync or category repair is running
/// - `500` when the guild or mappings are not configured
pub async fn trigger_sync(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SyncRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    check_secret(&req.admin_secret, &config::admin_secret())?;
    req.validate()?;

    let _guard = state.try_job_guard().ok_or_else(job_running)?;
    info!("Manual sync triggered");
    let report = Reconciler::new(state.db(), state.platform(), req.settings())
        .run()
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(report, "Sync completed"))))
}

/// POST /api/jobs/archive
///
/// Runs the archival policy once.
pub async fn trigger_archive(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SecretRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    check_secret(&req.admin_secret, &config::admin_secret())?;

    info!("Manual archival triggered");
    let report = run_archival(state.db(), &ArchivePolicy::from_config()).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(report, "Archival completed"))))
}

/// POST /api/jobs/fix-categories
///
/// Re-reads every open ticket's channel parent and repairs `category_id`.
pub async fn trigger_fix_categories(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SecretRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    check_secret(&req.admin_secret, &config::admin_secret())?;

    let _guard = state.try_job_guard().ok_or_else(job_running)?;
    info!("Manual category repair triggered");
    let report = repair_categories(state.db(), state.platform(), &config::category_mappings()).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(report, "Category repair completed"))))
}
