use chrono::{DateTime, Utc};
use db::models::ticket_message::{self, NewMessage};
use sea_orm::{ConnectionTrait, DbErr};
use std::collections::HashSet;

use crate::SyncError;
use crate::discord::{ChatPlatform, MAX_MESSAGES_PER_PAGE, Message};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Rows actually written.
    pub inserted: u64,
    /// Bot-authored, empty, or already-stored messages.
    pub skipped: u64,
    /// Timestamp of the newest inserted message.
    pub newest_at: Option<DateTime<Utc>>,
}

/// Copies Discord messages into `ticket_messages`.
///
/// Inserts are idempotent on the Discord message id, so the same page can be
/// imported any number of times.
pub struct MessageImporter<'a, C: ConnectionTrait> {
    db: &'a C,
    staff_ids: &'a HashSet<String>,
}

impl<'a, C: ConnectionTrait> MessageImporter<'a, C> {
    /// `staff_ids` are the Discord ids of dashboard users; their messages are flagged as staff.
    pub fn new(db: &'a C, staff_ids: &'a HashSet<String>) -> Self {
        Self { db, staff_ids }
    }

    /// Stores every human, non-empty message of `messages`, oldest first.
    pub async fn import(&self, ticket_id: i64, messages: &[Message]) -> Result<ImportOutcome, DbErr> {
        let mut ordered: Vec<&Message> = messages.iter().collect();
        ordered.sort_by_key(|m| m.timestamp);

        let mut outcome = ImportOutcome::default();
        for m in ordered {
            if m.author.bot || m.content.trim().is_empty() {
                outcome.skipped += 1;
                continue;
            }

            let written = ticket_message::Model::insert_if_absent(
                self.db,
                NewMessage {
                    ticket_id,
                    discord_message_id: m.id.clone(),
                    author_discord_id: m.author.id.clone(),
                    author_username: m.author.display_name().to_string(),
                    author_avatar_url: m.author.avatar_url(),
                    content: m.content.clone(),
                    is_from_staff: self.staff_ids.contains(&m.author.id),
                    created_at: m.timestamp,
                },
            )
            .await?;

            if written {
                outcome.inserted += 1;
                outcome.newest_at = Some(outcome.newest_at.map_or(m.timestamp, |t| t.max(m.timestamp)));
            } else {
                outcome.skipped += 1;
            }
        }

        Ok(outcome)
    }
}

/// Fetches the page of messages newer than the ticket's latest stored one
/// (or the most recent page when nothing is stored yet).
pub async fn fetch_new_messages<C: ConnectionTrait>(
    db: &C,
    platform: &dyn ChatPlatform,
    ticket_id: i64,
    channel_id: &str,
) -> Result<Vec<Message>, SyncError> {
    let cursor = ticket_message::Model::latest_for_ticket(db, ticket_id)
        .await?
        .map(|m| m.discord_message_id);

    Ok(platform
        .list_channel_messages(channel_id, cursor.as_deref(), MAX_MESSAGES_PER_PAGE)
        .await?)
}
