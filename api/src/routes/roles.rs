use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use db::models::role;

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::routes::common::RoleResponse;
use crate::state::AppState;

/// GET /api/roles
///
/// Active roles in rank order: founder, dev, admin, moderator, support, then
/// any others by name.
pub async fn list_roles(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let roles: Vec<RoleResponse> = role::Model::list_active(state.db())
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok((StatusCode::OK, Json(ApiResponse::success(roles, "Roles retrieved"))))
}
