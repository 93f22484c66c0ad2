use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, QueryFilter, Set};
use serde::Serialize;

/// Join table between `users` and `roles`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "user_roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub role_id: i64,
    pub assigned_by_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::role::Entity",
        from = "Column::RoleId",
        to = "super::role::Column::Id",
        on_delete = "Cascade"
    )]
    Role,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Replaces every role of `user_id` with `role_ids`.
    ///
    /// Run inside a transaction: the delete and the inserts must land together.
    pub async fn replace_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        role_ids: &[i64],
        assigned_by: Option<i64>,
    ) -> Result<(), DbErr> {
        Entity::delete_many()
            .filter(Column::UserId.eq(user_id))
            .exec(db)
            .await?;

        Self::assign(db, user_id, role_ids, assigned_by).await
    }

    /// Adds roles to a user, ignoring ones already held.
    pub async fn assign<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        role_ids: &[i64],
        assigned_by: Option<i64>,
    ) -> Result<(), DbErr> {
        let now = Utc::now();

        for role_id in role_ids {
            let row = ActiveModel {
                user_id: Set(user_id),
                role_id: Set(*role_id),
                assigned_by_user_id: Set(assigned_by),
                created_at: Set(now),
            };

            Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([Column::UserId, Column::RoleId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(db)
                .await?;
        }

        Ok(())
    }
}
