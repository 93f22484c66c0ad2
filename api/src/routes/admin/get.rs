use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use db::models::user;

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::routes::common::UserResponse;
use crate::state::AppState;

/// GET /api/admin/users
///
/// Every account with its roles: super admins first, then dashboard users,
/// then by username.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let db = state.db();
    let mut users = Vec::new();
    for account in user::Model::list_all(db).await? {
        users.push(UserResponse::load(db, account).await?);
    }

    Ok((StatusCode::OK, Json(ApiResponse::success(users, "Users retrieved"))))
}
