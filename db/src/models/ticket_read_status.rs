//! Read-state tracker.
//!
//! One row per (ticket, user) recording when that user last opened the ticket
//! and the last message stored at the time. Unread counts are the visible
//! messages stored after that marker, so a message imported late by sync still
//! shows up as unread even when Discord dates it before the view.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, QueryFilter, Set};
use serde::Serialize;
use std::collections::HashMap;

use super::ticket_message;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "ticket_read_status")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub ticket_id: i64,
    pub user_id: i64,
    pub last_read_at: DateTime<Utc>,
    pub last_read_message_id: Option<String>,
    pub updated_at: DateTime<Utc>,
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

impl Model {
    /// Records that `user_id` has read `ticket_id` up to now.
    pub async fn mark_read<C: ConnectionTrait>(
        db: &C,
        ticket_id: i64,
        user_id: i64,
        last_message_id: Option<String>,
    ) -> Result<(), DbErr> {
        let now = Utc::now();
        let row = ActiveModel {
            ticket_id: Set(ticket_id),
            user_id: Set(user_id),
            last_read_at: Set(now),
            last_read_message_id: Set(last_message_id),
            updated_at: Set(now),
            ..Default::default()
        };

        Entity::insert(row)
            .on_conflict(
                OnConflict::columns([Column::TicketId, Column::UserId])
                    .update_columns([
                        Column::LastReadAt,
                        Column::LastReadMessageId,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }

    /// Marks the ticket read up to the last message stored for it.
    pub async fn mark_read_latest<C: ConnectionTrait>(
        db: &C,
        ticket_id: i64,
        user_id: i64,
    ) -> Result<(), DbErr> {
        let latest = ticket_message::Model::last_stored_for_ticket(db, ticket_id).await?;
        Self::mark_read(db, ticket_id, user_id, latest.map(|m| m.discord_message_id)).await
    }

    pub async fn find_for<C: ConnectionTrait>(
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

    /// Unread message count per ticket for one user.
    ///
    /// Tickets the user never opened count every visible message.
    pub async fn unread_counts<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        ticket_ids: &[i64],
    ) -> Result<HashMap<i64, u64>, DbErr> {
        if ticket_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let markers: HashMap<i64, Option<String>> = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::TicketId.is_in(ticket_ids.iter().copied()))
            .all(db)
            .await?
            .into_iter()
            .map(|r| (r.ticket_id, r.last_read_message_id))
            .collect();

        let marker_ids: Vec<String> = markers.values().flatten().cloned().collect();
        let rows = ticket_message::Model::row_ids_for(db, &marker_ids).await?;

        let mut counts = HashMap::with_capacity(ticket_ids.len());
        for &ticket_id in ticket_ids {
            let after_row = markers
                .get(&ticket_id)
                .and_then(|marker| marker.as_ref())
                .and_then(|id| rows.get(id).copied());
            let n = ticket_message::Model::count_visible_after(db, ticket_id, after_row).await?;
            counts.insert(ticket_id, n);
        }
        Ok(counts)
    }
}
