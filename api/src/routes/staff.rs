use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use db::models::user;

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::routes::common::UserResponse;
use crate::state::AppState;

/// GET /api/staff
///
/// Active dashboard users with their roles, super admins first. Feeds the
/// assignee picker.
pub async fn list_staff(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let db = state.db();
    let mut staff = Vec::new();
    for member in user::Model::list_staff(db).await? {
        staff.push(UserResponse::load(db, member).await?);
    }

    Ok((StatusCode::OK, Json(ApiResponse::success(staff, "Staff retrieved"))))
}
