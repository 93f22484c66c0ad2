use chrono::{DateTime, Utc};
use db::models::{role, user};
use sea_orm::{ConnectionTrait, DbErr};
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub color: Option<String>,
}

impl From<role::Model> for RoleResponse {
    fn from(role: role::Model) -> Self {
        Self {
            id: role.id,
            name: role.name,
            display_name: role.display_name,
            color: role.color,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub discord_id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub can_access_dashboard: bool,
    pub can_manage_votes: bool,
    pub is_super_admin: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<RoleResponse>,
}

impl UserResponse {
    pub fn new(user: user::Model, roles: Vec<role::Model>) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name().to_string(),
            discord_id: user.discord_id,
            username: user.discord_username,
            global_name: user.discord_global_name,
            avatar_url: user.discord_avatar_url,
            can_access_dashboard: user.can_access_dashboard,
            can_manage_votes: user.can_manage_votes,
            is_super_admin: user.is_super_admin,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
            roles: roles.into_iter().map(RoleResponse::from).collect(),
        }
    }

    /// Loads the user's roles (ranked) and builds the response.
    pub async fn load<C: ConnectionTrait>(db: &C, user: user::Model) -> Result<Self, DbErr> {
        let roles = user.roles(db).await?;
        Ok(Self::new(user, roles))
    }
}

/// Rejects the call unless `provided` equals the configured secret.
/// An unset secret rejects everything.
pub fn check_secret(provided: &str, expected: &str) -> Result<(), AppError> {
    if expected.is_empty() || provided != expected {
        return Err(AppError::forbidden("Invalid secret"));
    }
    Ok(())
}
