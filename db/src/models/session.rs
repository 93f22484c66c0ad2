use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, QueryFilter, Set};

/// Server-side half of a dashboard login. The browser only holds `session_token`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub session_token: String,
    pub discord_access_token: Option<String>,
    pub discord_refresh_token: Option<String>,
    pub discord_token_expires_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Everything needed to open a session for a freshly authenticated user.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: i64,
    pub ttl: Duration,
    pub discord_access_token: Option<String>,
    pub discord_refresh_token: Option<String>,
    pub discord_token_expires_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewSession {
    pub fn new(user_id: i64, ttl: Duration) -> Self {
        Self {
            user_id,
            ttl,
            discord_access_token: None,
            discord_refresh_token: None,
            discord_token_expires_at: None,
            ip_address: None,
            user_agent: None,
        }
    }
}

/// 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Model {
    pub async fn create<C: ConnectionTrait>(db: &C, new: NewSession) -> Result<Model, DbErr> {
        let now = Utc::now();

        ActiveModel {
            user_id: Set(new.user_id),
            session_token: Set(generate_token()),
            discord_access_token: Set(new.discord_access_token),
            discord_refresh_token: Set(new.discord_refresh_token),
            discord_token_expires_at: Set(new.discord_token_expires_at),
            expires_at: Set(now + new.ttl),
            ip_address: Set(new.ip_address),
            user_agent: Set(new.user_agent),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Unexpired session for `token` together with its owner.
    pub async fn find_active_with_user<C: ConnectionTrait>(
        db: &C,
        token: &str,
    ) -> Result<Option<(Model, super::user::Model)>, DbErr> {
        let found = Entity::find()
            .filter(Column::SessionToken.eq(token))
            .filter(Column::ExpiresAt.gt(Utc::now()))
            .find_also_related(super::user::Entity)
            .one(db)
            .await?;

        Ok(found.and_then(|(session, user)| user.map(|u| (session, u))))
    }

    pub async fn delete_by_token<C: ConnectionTrait>(db: &C, token: &str) -> Result<u64, DbErr> {
        let res = Entity::delete_many()
            .filter(Column::SessionToken.eq(token))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn purge_expired<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
        let res = Entity::delete_many()
            .filter(Column::ExpiresAt.lte(Utc::now()))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }
}
