use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{Display, EnumString};

use crate::filters::TicketFilterSet;

/// A support ticket mirrored from one Discord text channel.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord channel snowflake; unique, one ticket per channel.
    pub discord_channel_id: String,
    pub discord_server_id: String,
    /// Mirrors the channel name.
    pub title: String,
    pub category_id: Option<i64>,
    pub status: TicketStatus,
    /// `None` means unset.
    pub priority: Option<TicketPriority>,
    pub created_by_discord_id: String,
    pub created_by_username: String,
    pub created_by_avatar_url: Option<String>,
    /// Unicode-lowercased title and creator name, matched by ticket search.
    #[serde(skip_serializing)]
    pub search_text: String,
    pub assigned_to_user_id: Option<i64>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub assigned_by_user_id: Option<i64>,
    pub is_unread: bool,
    pub unread_count: i32,
    pub has_new_messages: bool,
    pub is_archived: bool,
    pub voting_enabled: bool,
    pub voting_closed: bool,
    pub voting_closed_at: Option<DateTime<Utc>>,
    pub voting_closed_by_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub last_message_at: Option<DateTime<Utc>>,
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
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TicketStatus {
    #[sea_orm(string_value = "new")]
    New,

    #[sea_orm(string_value = "in_progress")]
    InProgress,

    #[sea_orm(string_value = "resolved")]
    Resolved,
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
pub enum TicketPriority {
    #[sea_orm(string_value = "high")]
    High,

    #[sea_orm(string_value = "medium")]
    Medium,

    #[sea_orm(string_value = "low")]
    Low,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AssignedToUserId",
        to = "super::user::Column::Id"
    )]
    Assignee,

    #[sea_orm(has_many = "super::ticket_message::Entity")]
    Messages,

    #[sea_orm(has_many = "super::ticket_vote::Entity")]
    Votes,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignee.def()
    }
}

impl Related<super::ticket_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl Related<super::ticket_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields for a ticket discovered on Discord (sync) or announced by the bot (webhook).
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub discord_channel_id: String,
    pub discord_server_id: String,
    pub title: String,
    pub category_id: Option<i64>,
    pub priority: Option<TicketPriority>,
    pub created_by_discord_id: String,
    pub created_by_username: String,
    pub created_by_avatar_url: Option<String>,
    pub assigned_to_user_id: Option<i64>,
    pub unread_count: i32,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl NewTicket {
    fn into_active_model(self) -> ActiveModel {
        let now = Utc::now();
        let assigned = self.assigned_to_user_id.is_some();
        let search_text = search_text(&self.title, &self.created_by_username);

        ActiveModel {
            discord_channel_id: Set(self.discord_channel_id),
            discord_server_id: Set(self.discord_server_id),
            title: Set(self.title),
            category_id: Set(self.category_id),
            status: Set(if assigned {
                TicketStatus::InProgress
            } else {
                TicketStatus::New
            }),
            priority: Set(self.priority),
            search_text: Set(search_text),
            created_by_discord_id: Set(self.created_by_discord_id),
            created_by_username: Set(self.created_by_username),
            created_by_avatar_url: Set(self.created_by_avatar_url),
            assigned_to_user_id: Set(self.assigned_to_user_id),
            assigned_at: Set(assigned.then_some(now)),
            assigned_by_user_id: Set(None),
            is_unread: Set(true),
            unread_count: Set(self.unread_count),
            has_new_messages: Set(self.unread_count > 0),
            is_archived: Set(false),
            voting_enabled: Set(false),
            voting_closed: Set(false),
            voting_closed_at: Set(None),
            voting_closed_by_user_id: Set(None),
            created_at: Set(self.created_at),
            updated_at: Set(now),
            closed_at: Set(None),
            last_message_at: Set(self.last_message_at),
            ..Default::default()
        }
    }
}

/// Text the search filter matches against. SQLite only folds ASCII case, so
/// folding happens once here on write.
fn search_text(title: &str, creator: &str) -> String {
    format!("{title}\n{creator}").to_lowercase()
}

/// Dashboard header counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TicketStats {
    pub urgent_count: u64,
    pub pending_count: u64,
    pub resolved_7d_count: u64,
    pub avg_resolution_hours: Option<f64>,
}

const PRIORITY_ORDER: &str =
    "CASE \"priority\" WHEN 'high' THEN 0 WHEN 'medium' THEN 1 WHEN 'low' THEN 2 ELSE 3 END";

impl Model {
    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn find_by_channel_id<C: ConnectionTrait>(
        db: &C,
        channel_id: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::DiscordChannelId.eq(channel_id))
            .one(db)
            .await
    }

    /// Inserts the ticket unless its channel is already tracked.
    ///
    /// Returns `None` when a row for the channel existed, so repeated runs never
    /// create duplicates.
    pub async fn insert_if_absent<C: ConnectionTrait>(
        db: &C,
        new: NewTicket,
    ) -> Result<Option<Model>, DbErr> {
        let channel_id = new.discord_channel_id.clone();

        let inserted = Entity::insert(new.into_active_model())
            .on_conflict(
                OnConflict::column(Column::DiscordChannelId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        if inserted == 0 {
            return Ok(None);
        }
        Self::find_by_channel_id(db, &channel_id).await
    }

    /// Inserts the ticket or, when the channel is known, refreshes its title.
    pub async fn upsert_by_channel<C: ConnectionTrait>(db: &C, new: NewTicket) -> Result<Model, DbErr> {
        let channel_id = new.discord_channel_id.clone();

        Entity::insert(new.into_active_model())
            .on_conflict(
                OnConflict::column(Column::DiscordChannelId)
                    .update_columns([Column::Title, Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        let ticket = Self::find_by_channel_id(db, &channel_id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("ticket for channel {channel_id}")))?;

        let expected = search_text(&ticket.title, &ticket.created_by_username);
        if ticket.search_text == expected {
            return Ok(ticket);
        }
        let mut active: ActiveModel = ticket.into();
        active.search_text = Set(expected);
        active.update(db).await
    }

    /// Every ticket that still needs reconciling with Discord.
    pub async fn open_tickets<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Status.ne(TicketStatus::Resolved))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Channel ids of every persisted ticket, resolved ones included.
    pub async fn known_channel_ids<C: ConnectionTrait>(db: &C) -> Result<HashSet<String>, DbErr> {
        let ids: Vec<String> = Entity::find()
            .select_only()
            .column(Column::DiscordChannelId)
            .into_tuple()
            .all(db)
            .await?;
        Ok(ids.into_iter().collect())
    }

    /// Assigns the ticket. A `new` ticket moves to `in_progress`; other statuses are kept.
    pub async fn assign<C: ConnectionTrait>(
        self,
        db: &C,
        user_id: i64,
        assigned_by: Option<i64>,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        let status = self.status;

        let mut active: ActiveModel = self.into();
        active.assigned_to_user_id = Set(Some(user_id));
        active.assigned_at = Set(Some(now));
        active.assigned_by_user_id = Set(assigned_by);
        if status == TicketStatus::New {
            active.status = Set(TicketStatus::InProgress);
        }
        active.updated_at = Set(now);
        active.update(db).await
    }

    pub async fn rename<C: ConnectionTrait>(self, db: &C, title: &str) -> Result<Model, DbErr> {
        let search = search_text(title, &self.created_by_username);
        let mut active: ActiveModel = self.into();
        active.title = Set(title.to_owned());
        active.search_text = Set(search);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    pub async fn set_priority<C: ConnectionTrait>(
        self,
        db: &C,
        priority: Option<TicketPriority>,
    ) -> Result<Model, DbErr> {
        let mut active: ActiveModel = self.into();
        active.priority = Set(priority);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    pub async fn set_category<C: ConnectionTrait>(
        self,
        db: &C,
        category_id: Option<i64>,
    ) -> Result<Model, DbErr> {
        let mut active: ActiveModel = self.into();
        active.category_id = Set(category_id);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    /// Enables or disables voting. Disabling also reopens a closed vote.
    pub async fn set_voting<C: ConnectionTrait>(self, db: &C, enabled: bool) -> Result<Model, DbErr> {
        let mut active: ActiveModel = self.into();
        active.voting_enabled = Set(enabled);
        if !enabled {
            active.voting_closed = Set(false);
            active.voting_closed_at = Set(None);
            active.voting_closed_by_user_id = Set(None);
        }
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    pub async fn close_voting<C: ConnectionTrait>(self, db: &C, closed_by: i64) -> Result<Model, DbErr> {
        let now = Utc::now();
        let mut active: ActiveModel = self.into();
        active.voting_closed = Set(true);
        active.voting_closed_at = Set(Some(now));
        active.voting_closed_by_user_id = Set(Some(closed_by));
        active.updated_at = Set(now);
        active.update(db).await
    }

    pub async fn resolve<C: ConnectionTrait>(self, db: &C) -> Result<Model, DbErr> {
        let now = Utc::now();
        let mut active: ActiveModel = self.into();
        active.status = Set(TicketStatus::Resolved);
        active.closed_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(db).await
    }

    /// Flags the ticket unread after `count` messages were imported.
    pub async fn record_new_messages<C: ConnectionTrait>(
        db: &C,
        ticket_id: i64,
        count: u64,
        last_message_at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        Entity::update_many()
            .col_expr(Column::IsUnread, Expr::value(true))
            .col_expr(Column::HasNewMessages, Expr::value(true))
            .col_expr(Column::UnreadCount, Expr::col(Column::UnreadCount).add(count as i64))
            .col_expr(Column::LastMessageAt, Expr::value(last_message_at))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(ticket_id))
            .exec(db)
            .await?;
        Ok(())
    }

    // --- Listing ---

    /// Live (non-archived) tickets: unread first, then priority high to unset, newest first.
    pub async fn list<C: ConnectionTrait>(
        db: &C,
        filters: &TicketFilterSet,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(filters.condition())
            .order_by_desc(Column::IsUnread)
            .order_by(Expr::cust(PRIORITY_ORDER), Order::Asc)
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .offset(offset)
            .all(db)
            .await
    }

    /// Archived tickets, most recently closed first with undated ones last.
    pub async fn list_archived<C: ConnectionTrait>(
        db: &C,
        filters: &TicketFilterSet,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(filters.condition())
            .order_by(Expr::col(Column::ClosedAt).is_null(), Order::Asc)
            .order_by_desc(Column::ClosedAt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .offset(offset)
            .all(db)
            .await
    }

    /// Ids of every ticket matching `filters`, newest first.
    pub async fn ids_matching<C: ConnectionTrait>(
        db: &C,
        filters: &TicketFilterSet,
    ) -> Result<Vec<i64>, DbErr> {
        Entity::find()
            .select_only()
            .column(Column::Id)
            .filter(filters.condition())
            .order_by_desc(Column::CreatedAt)
            .into_tuple()
            .all(db)
            .await
    }

    pub async fn count_matching<C: ConnectionTrait>(
        db: &C,
        filters: &TicketFilterSet,
    ) -> Result<u64, DbErr> {
        Entity::find().filter(filters.condition()).count(db).await
    }

    pub async fn stats<C: ConnectionTrait>(db: &C) -> Result<TicketStats, DbErr> {
        let urgent_count = Entity::find()
            .filter(Column::IsArchived.eq(false))
            .filter(Column::Priority.eq(TicketPriority::High))
            .filter(Column::Status.ne(TicketStatus::Resolved))
            .count(db)
            .await?;

        let pending_count = Entity::find()
            .filter(Column::IsArchived.eq(false))
            .filter(Column::Status.eq(TicketStatus::InProgress))
            .count(db)
            .await?;

        let resolved_7d_count = Entity::find()
            .filter(Column::Status.eq(TicketStatus::Resolved))
            .filter(Column::ClosedAt.gte(Utc::now() - Duration::days(7)))
            .count(db)
            .await?;

        let spans: Vec<(DateTime<Utc>, Option<DateTime<Utc>>)> = Entity::find()
            .select_only()
            .column(Column::CreatedAt)
            .column(Column::ClosedAt)
            .filter(Column::Status.eq(TicketStatus::Resolved))
            .filter(Column::ClosedAt.is_not_null())
            .into_tuple()
            .all(db)
            .await?;

        let hours: Vec<f64> = spans
            .into_iter()
            .filter_map(|(created, closed)| closed.map(|c| (c - created).num_seconds() as f64 / 3600.0))
            .collect();
        let avg_resolution_hours = if hours.is_empty() {
            None
        } else {
            let avg = hours.iter().sum::<f64>() / hours.len() as f64;
            Some((avg * 10.0).round() / 10.0)
        };

        Ok(TicketStats {
            urgent_count,
            pending_count,
            resolved_7d_count,
            avg_resolution_hours,
        })
    }

    // --- Archival ---

    pub async fn count_resolved_unarchived<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::Status.eq(TicketStatus::Resolved))
            .filter(Column::IsArchived.eq(false))
            .count(db)
            .await
    }

    /// Oldest resolved, unarchived tickets: by `closed_at` (undated last), then `updated_at`.
    pub async fn oldest_resolved_unarchived<C: ConnectionTrait>(
        db: &C,
        limit: u64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Status.eq(TicketStatus::Resolved))
            .filter(Column::IsArchived.eq(false))
            .order_by(Expr::col(Column::ClosedAt).is_null(), Order::Asc)
            .order_by_asc(Column::ClosedAt)
            .order_by_asc(Column::UpdatedAt)
            .order_by_asc(Column::Id)
            .limit(limit)
            .all(db)
            .await
    }

    /// Marks the given tickets archived. Only resolved tickets are touched.
    pub async fn mark_archived<C: ConnectionTrait>(db: &C, ids: &[i64]) -> Result<u64, DbErr> {
        if ids.is_empty() {
            return Ok(0);
        }

        let res = Entity::update_many()
            .col_expr(Column::IsArchived, Expr::value(true))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.is_in(ids.iter().copied()))
            .filter(Column::Status.eq(TicketStatus::Resolved))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }
}
