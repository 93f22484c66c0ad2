use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Append-only audit trail of ticket changes.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "ticket_activity_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub ticket_id: i64,
    /// Acting dashboard user; `None` for automated jobs.
    pub user_id: Option<i64>,
    pub action_type: ActivityAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityAction {
    #[sea_orm(string_value = "assigned")]
    Assigned,

    #[sea_orm(string_value = "priority_changed")]
    PriorityChanged,

    #[sea_orm(string_value = "category_changed")]
    CategoryChanged,

    #[sea_orm(string_value = "status_changed")]
    StatusChanged,

    #[sea_orm(string_value = "vote_cast")]
    VoteCast,

    #[sea_orm(string_value = "vote_changed")]
    VoteChanged,

    #[sea_orm(string_value = "vote_closed")]
    VoteClosed,

    #[sea_orm(string_value = "voting_toggled")]
    VotingToggled,

    #[sea_orm(string_value = "archived")]
    Archived,
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
}

impl Related<super::ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ticket.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Builder for one activity row.
///
/// ```ignore
/// NewActivity::new(ticket.id, ActivityAction::PriorityChanged)
///     .by(user.id)
///     .change(Some("low"), Some("high"))
///     .insert(&txn)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct NewActivity {
    ticket_id: i64,
    action: ActivityAction,
    user_id: Option<i64>,
    old_value: Option<String>,
    new_value: Option<String>,
    comment: Option<String>,
}

impl NewActivity {
    pub fn new(ticket_id: i64, action: ActivityAction) -> Self {
        Self {
            ticket_id,
            action,
            user_id: None,
            old_value: None,
            new_value: None,
            comment: None,
        }
    }

    pub fn by(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn by_opt(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn change(mut self, old: Option<impl ToString>, new: Option<impl ToString>) -> Self {
        self.old_value = old.map(|v| v.to_string());
        self.new_value = new.map(|v| v.to_string());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub async fn insert<C: ConnectionTrait>(self, db: &C) -> Result<Model, DbErr> {
        ActiveModel {
            ticket_id: Set(self.ticket_id),
            user_id: Set(self.user_id),
            action_type: Set(self.action),
            old_value: Set(self.old_value),
            new_value: Set(self.new_value),
            comment: Set(self.comment),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }
}

impl Model {
    pub async fn for_ticket<C: ConnectionTrait>(db: &C, ticket_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::TicketId.eq(ticket_id))
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    pub async fn for_ticket_with_action<C: ConnectionTrait>(
        db: &C,
        ticket_id: i64,
        action: ActivityAction,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::TicketId.eq(ticket_id))
            .filter(Column::ActionType.eq(action))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }
}
