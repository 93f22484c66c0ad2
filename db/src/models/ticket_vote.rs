use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "ticket_votes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub ticket_id: i64,
    pub user_id: i64,
    pub vote: VoteValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum VoteValue {
    #[sea_orm(string_value = "for")]
    For,

    #[sea_orm(string_value = "against")]
    Against,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ticket::Entity",
        from = "Column::TicketId",
        to = "super::ticket::Column::Id",
        on_delete = "Cascade"
    )]
    Ticket,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ticket.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteStats {
    pub votes_for: u64,
    pub votes_against: u64,
    pub total_votes: u64,
}

impl VoteStats {
    fn tally(&mut self, vote: VoteValue) {
        match vote {
            VoteValue::For => self.votes_for += 1,
            VoteValue::Against => self.votes_against += 1,
        }
        self.total_votes += 1;
    }
}

impl Model {
    pub async fn find_for_user<C: ConnectionTrait>(
        db: &C,
        ticket_id: i64,
        user_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::TicketId.eq(ticket_id))
            .filter(Column::UserId.eq(user_id))
            .one(db)
            .await
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        ticket_id: i64,
        user_id: i64,
        vote: VoteValue,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        ActiveModel {
            ticket_id: Set(ticket_id),
            user_id: Set(user_id),
            vote: Set(vote),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn change<C: ConnectionTrait>(self, db: &C, vote: VoteValue) -> Result<Model, DbErr> {
        let mut active: ActiveModel = self.into();
        active.vote = Set(vote);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    pub async fn stats<C: ConnectionTrait>(db: &C, ticket_id: i64) -> Result<VoteStats, DbErr> {
        let votes = Entity::find()
            .filter(Column::TicketId.eq(ticket_id))
            .all(db)
            .await?;

        let mut stats = VoteStats::default();
        for v in votes {
            stats.tally(v.vote);
        }
        Ok(stats)
    }

    pub async fn stats_for_tickets<C: ConnectionTrait>(
        db: &C,
        ticket_ids: &[i64],
    ) -> Result<HashMap<i64, VoteStats>, DbErr> {
        if ticket_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let votes = Entity::find()
            .filter(Column::TicketId.is_in(ticket_ids.iter().copied()))
            .all(db)
            .await?;

        let mut out: HashMap<i64, VoteStats> = HashMap::new();
        for v in votes {
            out.entry(v.ticket_id).or_default().tally(v.vote);
        }
        Ok(out)
    }
}
