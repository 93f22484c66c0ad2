use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use db::models::user::{self, PermissionUpdate};
use db::models::user_role;
use sea_orm::TransactionTrait;
use serde::Deserialize;
use tracing::info;

use super::common::ensure_roles_exist;
use crate::auth::AuthContext;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::routes::common::UserResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub can_access_dashboard: Option<bool>,
    pub can_manage_votes: Option<bool>,
    pub is_active: Option<bool>,
    /// Replaces the user's roles when present.
    pub role_ids: Option<Vec<i64>>,
}

impl UpdateUserRequest {
    fn permissions(&self) -> PermissionUpdate {
        PermissionUpdate {
            can_access_dashboard: self.can_access_dashboard,
            can_manage_votes: self.can_manage_votes,
            is_active: self.is_active,
        }
    }
}

/// PUT /api/admin/users/{user_id}
///
/// Updates permission flags and optionally replaces the role set. Absent
/// fields are left as they are.
///
/// ### Request body
/// ```json
/// { "can_access_dashboard": true, "can_manage_votes": false, "is_active": true, "role_ids": [1, 3] }
/// ```
///
/// ### Responses
/// - `200 OK` with the updated user and roles
/// - `400 Bad Request` when deactivating yourself, removing your own
///   dashboard access, or naming an unknown role
/// - `404 Not Found` when the user does not exist
pub async fn update_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Path(user_id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateUserRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    if user_id == ctx.user_id() {
        if req.is_active == Some(false) {
            return Err(AppError::bad_request("You cannot deactivate your own account"));
        }
        if req.can_access_dashboard == Some(false) {
            return Err(AppError::bad_request("You cannot remove your own dashboard access"));
        }
    }

    let txn = state.db().begin().await?;
    let target = user::Model::find_by_id(&txn, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let updated = target.update_permissions(&txn, req.permissions()).await?;
    if let Some(role_ids) = &req.role_ids {
        ensure_roles_exist(&txn, role_ids).await?;
        user_role::Model::replace_for_user(&txn, user_id, role_ids, Some(ctx.user_id())).await?;
    }
    let response = UserResponse::load(&txn, updated).await?;
    txn.commit().await?;

    info!(admin_id = ctx.user_id(), user_id, "User permissions updated");
    Ok((StatusCode::OK, Json(ApiResponse::success(response, "User updated"))))
}
