use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryFilter};
use serde::Serialize;

/// Staff role shown next to a user's name (founder, moderator, ...).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub color: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_role::Entity")]
    UserRoles,
}

impl Related<super::user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRoles.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_role::Relation::User.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::user_role::Relation::Role.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Display order for well-known role names; anything else sorts after, by name.
pub const ROLE_RANK: &[&str] = &["founder", "dev", "admin", "moderator", "support"];

fn rank(name: &str) -> usize {
    ROLE_RANK
        .iter()
        .position(|r| r.eq_ignore_ascii_case(name))
        .unwrap_or(ROLE_RANK.len())
}

pub fn sort_by_rank(roles: &mut [Model]) {
    roles.sort_by(|a, b| rank(&a.name).cmp(&rank(&b.name)).then_with(|| a.name.cmp(&b.name)));
}

impl Model {
    pub async fn list_active<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, DbErr> {
        let mut roles = Entity::find()
            .filter(Column::IsActive.eq(true))
            .all(db)
            .await?;
        sort_by_rank(&mut roles);
        Ok(roles)
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
}
