use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::Serialize;
use std::collections::HashMap;

/// Longest message body kept, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "ticket_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub ticket_id: i64,
    /// Discord message snowflake; unique across all tickets.
    pub discord_message_id: String,
    pub author_discord_id: String,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub is_from_staff: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
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

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub ticket_id: i64,
    pub discord_message_id: String,
    pub author_discord_id: String,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub is_from_staff: bool,
    pub created_at: DateTime<Utc>,
}

/// Cuts `content` to at most `MAX_CONTENT_CHARS` characters on a char boundary.
pub fn truncate_content(content: &str) -> String {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((idx, _)) => content[..idx].to_string(),
        None => content.to_string(),
    }
}

impl Model {
    /// Inserts the message unless its Discord id is already stored.
    ///
    /// Returns whether a row was written.
    pub async fn insert_if_absent<C: ConnectionTrait>(db: &C, new: NewMessage) -> Result<bool, DbErr> {
        let row = ActiveModel {
            ticket_id: Set(new.ticket_id),
            discord_message_id: Set(new.discord_message_id),
            author_discord_id: Set(new.author_discord_id),
            author_username: Set(new.author_username),
            author_avatar_url: Set(new.author_avatar_url),
            content: Set(truncate_content(&new.content)),
            is_from_staff: Set(new.is_from_staff),
            created_at: Set(new.created_at),
            deleted_at: Set(None),
            ..Default::default()
        };

        let inserted = Entity::insert(row)
            .on_conflict(
                OnConflict::column(Column::DiscordMessageId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        Ok(inserted > 0)
    }

    /// Most recent stored message of a ticket; its Discord id is the sync cursor.
    pub async fn latest_for_ticket<C: ConnectionTrait>(
        db: &C,
        ticket_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::TicketId.eq(ticket_id))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .one(db)
            .await
    }

    /// Last row stored for a ticket, by insertion order rather than Discord time.
    /// Read markers point at this row so that late imports still count as unread.
    pub async fn last_stored_for_ticket<C: ConnectionTrait>(
        db: &C,
        ticket_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::TicketId.eq(ticket_id))
            .order_by_desc(Column::Id)
            .one(db)
            .await
    }

    /// Row ids of the stored messages among `discord_ids`, keyed by Discord id.
    pub async fn row_ids_for<C: ConnectionTrait>(
        db: &C,
        discord_ids: &[String],
    ) -> Result<HashMap<String, i64>, DbErr> {
        if discord_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(String, i64)> = Entity::find()
            .select_only()
            .column(Column::DiscordMessageId)
            .column(Column::Id)
            .filter(Column::DiscordMessageId.is_in(discord_ids.iter().cloned()))
            .into_tuple()
            .all(db)
            .await?;
        Ok(rows.into_iter().collect())
    }

    /// Visible messages of a ticket, oldest first.
    pub async fn list_for_ticket<C: ConnectionTrait>(db: &C, ticket_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::TicketId.eq(ticket_id))
            .filter(Column::DeletedAt.is_null())
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Visible messages of a ticket stored after row `after_row` (all of them when `None`).
    pub async fn count_visible_after<C: ConnectionTrait>(
        db: &C,
        ticket_id: i64,
        after_row: Option<i64>,
    ) -> Result<u64, DbErr> {
        let mut query = Entity::find()
            .filter(Column::TicketId.eq(ticket_id))
            .filter(Column::DeletedAt.is_null());
        if let Some(after_row) = after_row {
            query = query.filter(Column::Id.gt(after_row));
        }
        query.count(db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::{Model as Ticket, tests::new_ticket};
    use crate::test_utils::setup_test_db;
    use chrono::Duration;

    fn message(ticket_id: i64, id: &str, at: DateTime<Utc>) -> NewMessage {
        NewMessage {
            ticket_id,
            discord_message_id: id.into(),
            author_discord_id: "500".into(),
            author_username: "customer".into(),
            author_avatar_url: None,
            content: "hello".into(),
            is_from_staff: false,
            created_at: at,
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "é".repeat(MAX_CONTENT_CHARS + 10);
        let cut = truncate_content(&long);
        assert_eq!(cut.chars().count(), MAX_CONTENT_CHARS);
        assert_eq!(truncate_content("short"), "short");
    }

    #[tokio::test]
    async fn same_discord_id_is_stored_once() {
        let db = setup_test_db().await;
        let ticket = Ticket::insert_if_absent(&db, new_ticket("c1", "001-alice"))
            .await
            .unwrap()
            .unwrap();
        let now = Utc::now();

        assert!(Model::insert_if_absent(&db, message(ticket.id, "m1", now)).await.unwrap());
        assert!(!Model::insert_if_absent(&db, message(ticket.id, "m1", now)).await.unwrap());
        assert_eq!(Model::list_for_ticket(&db, ticket.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sync_cursor_follows_creation_time_and_counts_follow_insertion() {
        let db = setup_test_db().await;
        let ticket = Ticket::insert_if_absent(&db, new_ticket("c1", "001-alice"))
            .await
            .unwrap()
            .unwrap();
        let base = Utc::now() - Duration::minutes(10);

        for (i, id) in ["m2", "m3", "m1"].iter().enumerate() {
            let at = match i {
                0 => base + Duration::minutes(1),
                1 => base + Duration::minutes(2),
                _ => base,
            };
            Model::insert_if_absent(&db, message(ticket.id, id, at)).await.unwrap();
        }

        let latest = Model::latest_for_ticket(&db, ticket.id).await.unwrap().unwrap();
        assert_eq!(latest.discord_message_id, "m3");
        let stored = Model::last_stored_for_ticket(&db, ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.discord_message_id, "m1");

        let rows = Model::row_ids_for(&db, &["m2".to_string(), "zz".to_string()]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(Model::count_visible_after(&db, ticket.id, None).await.unwrap(), 3);
        assert_eq!(Model::count_visible_after(&db, ticket.id, Some(rows["m2"])).await.unwrap(), 2);
    }
}
