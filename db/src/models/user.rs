use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::Serialize;
use std::collections::HashSet;

/// A Discord account known to the dashboard.
///
/// Rows are created on first OAuth login (without dashboard access) or by a
/// super admin adding a Discord id directly.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord snowflake, unique.
    pub discord_id: String,
    pub discord_username: String,
    pub discord_discriminator: Option<String>,
    pub discord_global_name: Option<String>,
    pub discord_avatar_url: Option<String>,
    #[serde(skip_serializing)]
    pub discord_email: Option<String>,
    /// Whether the account may sign in to the dashboard at all.
    pub can_access_dashboard: bool,
    /// Whether the account may open, close and toggle ticket votes.
    pub can_manage_votes: bool,
    pub is_super_admin: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_role::Entity")]
    UserRoles,
    #[sea_orm(has_many = "super::session::Entity")]
    Sessions,
}

impl Related<super::user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRoles.def()
    }
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_role::Relation::Role.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::user_role::Relation::User.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Profile fields as reported by Discord for one account.
#[derive(Debug, Clone, Default)]
pub struct DiscordIdentity {
    pub discord_id: String,
    pub username: String,
    pub discriminator: Option<String>,
    pub global_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
}

/// Partial change to an account's permission flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionUpdate {
    pub can_access_dashboard: Option<bool>,
    pub can_manage_votes: Option<bool>,
    pub is_active: Option<bool>,
}

impl Model {
    /// Global display name when set, username otherwise.
    pub fn display_name(&self) -> &str {
        self.discord_global_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.discord_username)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn find_by_discord_id<C: ConnectionTrait>(
        db: &C,
        discord_id: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::DiscordId.eq(discord_id))
            .one(db)
            .await
    }

    /// Inserts a new account from a Discord profile.
    pub async fn create_from_discord<C: ConnectionTrait>(
        db: &C,
        identity: &DiscordIdentity,
        can_access_dashboard: bool,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();

        ActiveModel {
            discord_id: Set(identity.discord_id.clone()),
            discord_username: Set(identity.username.clone()),
            discord_discriminator: Set(identity.discriminator.clone()),
            discord_global_name: Set(identity.global_name.clone()),
            discord_avatar_url: Set(identity.avatar_url.clone()),
            discord_email: Set(identity.email.clone()),
            can_access_dashboard: Set(can_access_dashboard),
            can_manage_votes: Set(false),
            is_super_admin: Set(false),
            is_active: Set(true),
            last_login: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Refreshes profile fields and `last_login` after an OAuth login, creating
    /// the account (without dashboard access) when it does not exist yet.
    pub async fn upsert_login<C: ConnectionTrait>(
        db: &C,
        identity: &DiscordIdentity,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();

        let existing = match Self::find_by_discord_id(db, &identity.discord_id).await? {
            Some(user) => user,
            None => Self::create_from_discord(db, identity, false).await?,
        };

        let mut active: ActiveModel = existing.into();
        active.discord_username = Set(identity.username.clone());
        active.discord_discriminator = Set(identity.discriminator.clone());
        active.discord_global_name = Set(identity.global_name.clone());
        active.discord_avatar_url = Set(identity.avatar_url.clone());
        if identity.email.is_some() {
            active.discord_email = Set(identity.email.clone());
        }
        active.last_login = Set(Some(now));
        active.updated_at = Set(now);
        active.update(db).await
    }

    /// Dashboard-enabled account whose username or global name matches `name`,
    /// ignoring case.
    ///
    /// Case folding happens here rather than in SQL: SQLite's `LOWER` only
    /// folds ASCII, and global names routinely carry accented capitals.
    pub async fn find_dashboard_staff_by_name<C: ConnectionTrait>(
        db: &C,
        name: &str,
    ) -> Result<Option<Model>, DbErr> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let staff = Entity::find()
            .filter(Column::CanAccessDashboard.eq(true))
            .order_by_asc(Column::Id)
            .all(db)
            .await?;

        Ok(staff.into_iter().find(|u| {
            u.discord_username.to_lowercase() == needle
                || u.discord_global_name.as_deref().is_some_and(|g| g.to_lowercase() == needle)
        }))
    }

    /// Discord ids of every dashboard-enabled account; used to flag staff-authored messages.
    pub async fn dashboard_discord_ids<C: ConnectionTrait>(db: &C) -> Result<HashSet<String>, DbErr> {
        let ids: Vec<String> = Entity::find()
            .select_only()
            .column(Column::DiscordId)
            .filter(Column::CanAccessDashboard.eq(true))
            .into_tuple()
            .all(db)
            .await?;

        Ok(ids.into_iter().collect())
    }

    /// Active dashboard staff, super admins first, then by username.
    pub async fn list_staff<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::CanAccessDashboard.eq(true))
            .filter(Column::IsActive.eq(true))
            .order_by_desc(Column::IsSuperAdmin)
            .order_by_asc(Column::DiscordUsername)
            .all(db)
            .await
    }

    pub async fn list_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .order_by_desc(Column::IsSuperAdmin)
            .order_by_desc(Column::CanAccessDashboard)
            .order_by_asc(Column::DiscordUsername)
            .all(db)
            .await
    }

    pub async fn find_by_ids<C: ConnectionTrait>(db: &C, ids: &[i64]) -> Result<Vec<Model>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Entity::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .all(db)
            .await
    }

    pub async fn roles<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<super::role::Model>, DbErr> {
        let mut roles = self.find_related(super::role::Entity).all(db).await?;
        super::role::sort_by_rank(&mut roles);
        Ok(roles)
    }

    /// Grants dashboard access to the account with the given Discord id.
    pub async fn grant_dashboard_access<C: ConnectionTrait>(
        db: &C,
        discord_id: &str,
    ) -> Result<Option<Model>, DbErr> {
        let Some(user) = Self::find_by_discord_id(db, discord_id).await? else {
            return Ok(None);
        };

        let mut active: ActiveModel = user.into();
        active.can_access_dashboard = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(db).await.map(Some)
    }

    /// Applies the flags that are set in `update`, leaving the rest untouched.
    pub async fn update_permissions<C: ConnectionTrait>(
        self,
        db: &C,
        update: PermissionUpdate,
    ) -> Result<Model, DbErr> {
        let mut active: ActiveModel = self.into();
        if let Some(v) = update.can_access_dashboard {
            active.can_access_dashboard = Set(v);
        }
        if let Some(v) = update.can_manage_votes {
            active.can_manage_votes = Set(v);
        }
        if let Some(v) = update.is_active {
            active.is_active = Set(v);
        }
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }
}
