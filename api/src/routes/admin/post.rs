use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use db::models::{user, user_role};
use sea_orm::TransactionTrait;
use serde::Deserialize;
use services::discord::ChatError;
use tracing::info;
use util::config;
use util::validation::validate_snowflake;
use validator::Validate;

use super::common::ensure_roles_exist;
use crate::auth::AuthContext;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::routes::common::{UserResponse, check_secret};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(custom(function = "validate_snowflake"))]
    pub discord_id: String,
    #[serde(default = "default_true")]
    pub can_access_dashboard: bool,
    #[serde(default)]
    pub role_ids: Vec<i64>,
}

fn default_true() -> bool {
    true
}

/// POST /api/admin/users
///
/// Adds a staff member before their first login. The profile is read from
/// Discord with the bot token.
///
/// ### Request body
/// ```json
/// { "discord_id": "123456789012345678", "can_access_dashboard": true, "role_ids": [2] }
/// ```
///
/// ### Responses
/// - `201 Created` with the new user and roles
/// - `400 Bad Request` on an invalid id or unknown role
/// - `404 Not Found` when Discord has no such user
/// - `409 Conflict` when the account already exists
pub async fn create_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Json(req), _): WithRejection<Json<CreateUserRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let db = state.db();

    if user::Model::find_by_discord_id(db, &req.discord_id).await?.is_some() {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let profile = match state.platform().get_user(&req.discord_id).await {
        Ok(profile) => profile,
        Err(ChatError::NotFound(_)) => return Err(AppError::not_found("Discord user not found")),
        Err(e) => return Err(e.into()),
    };

    let txn = db.begin().await?;
    ensure_roles_exist(&txn, &req.role_ids).await?;
    let created = user::Model::create_from_discord(&txn, &profile.identity(), req.can_access_dashboard).await?;
    user_role::Model::assign(&txn, created.id, &req.role_ids, Some(ctx.user_id())).await?;
    let response = UserResponse::load(&txn, created).await?;
    txn.commit().await?;

    info!(admin_id = ctx.user_id(), discord_id = %req.discord_id, "User created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response, "User created"))))
}

#[derive(Debug, Deserialize, Validate)]
pub struct GrantAccessRequest {
    #[serde(default)]
    pub admin_secret: String,
    #[validate(custom(function = "validate_snowflake"))]
    pub discord_id: String,
}

/// POST /api/admin/grant-access
///
/// Bootstrap hook for granting dashboard access without a signed-in admin.
/// The account must already exist (the person has logged in once).
///
/// ### Responses
/// - `200 OK` with the updated user
/// - `403 Forbidden` on a wrong or unset `ADMIN_SECRET`
/// - `404 Not Found` when no account has that Discord id
pub async fn grant_access(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<GrantAccessRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    check_secret(&req.admin_secret, &config::admin_secret())?;
    req.validate()?;

    let db = state.db();
    let granted = user::Model::grant_dashboard_access(db, &req.discord_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found. They must log in once first."))?;
    let response = UserResponse::load(db, granted).await?;

    info!(discord_id = %req.discord_id, "Dashboard access granted");
    Ok((StatusCode::OK, Json(ApiResponse::success(response, "Dashboard access granted"))))
}
