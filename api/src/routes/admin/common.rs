use db::models::role;
use sea_orm::ConnectionTrait;
use std::collections::HashSet;

use crate::error::AppError;

/// Fails with 400 unless every id names an existing role.
pub async fn ensure_roles_exist<C: ConnectionTrait>(db: &C, role_ids: &[i64]) -> Result<(), AppError> {
    let wanted: HashSet<i64> = role_ids.iter().copied().collect();
    let found = role::Model::find_by_ids(db, role_ids).await?;
    if found.len() != wanted.len() {
        return Err(AppError::bad_request("Unknown role id"));
    }
    Ok(())
}
