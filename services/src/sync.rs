//! Reconciliation engine.
//!
//! Mirrors the ticket channels of one guild into the database: unseen
//! channels become tickets, tracked tickets pick up renames, claims and new
//! messages. A failure on one channel is recorded in the report and the run
//! moves on to the next.

use chrono::{DateTime, Utc};
use db::models::category;
use db::models::ticket::{self, NewTicket, TicketPriority};
use db::models::ticket_activity_log::{ActivityAction, NewActivity};
use db::models::user;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};
use util::config;

use crate::SyncError;
use crate::discord::{Channel, ChatPlatform, MAX_MESSAGES_PER_PAGE, Message, TEXT_CHANNEL, snowflake_timestamp};
use crate::importer::{MessageImporter, fetch_new_messages};
use crate::ticket_name;

const UNKNOWN_AUTHOR_ID: &str = "unknown";
const UNKNOWN_AUTHOR_NAME: &str = "Unknown user";

/// What to reconcile and how new tickets are prioritized.
#[derive(Debug, Clone, Default)]
pub struct SyncSettings {
    pub guild_id: String,
    /// Discord category channel id -> category name.
    pub category_mappings: BTreeMap<String, String>,
    /// Category names whose new tickets start at high priority.
    pub high_priority_categories: Vec<String>,
}

impl SyncSettings {
    pub fn from_config() -> Self {
        Self {
            guild_id: config::discord_guild_id(),
            category_mappings: config::category_mappings(),
            high_priority_categories: config::high_priority_categories(),
        }
    }

    fn default_priority(&self, category_name: &str) -> TicketPriority {
        if self
            .high_priority_categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category_name))
        {
            TicketPriority::High
        } else {
            TicketPriority::Medium
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncFailure {
    pub channel_id: String,
    pub ticket_id: Option<i64>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub tickets_found_on_discord: usize,
    pub tickets_in_database: usize,
    pub new_tickets_created: u64,
    pub existing_tickets_updated: u64,
    pub assignments_detected: u64,
    pub new_messages_synced: u64,
    /// Open tickets whose channel was deleted or hidden from the bot.
    pub channels_gone: Vec<i64>,
    pub failures: Vec<SyncFailure>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    fn new(found: usize, in_database: usize) -> Self {
        Self {
            tickets_found_on_discord: found,
            tickets_in_database: in_database,
            new_tickets_created: 0,
            existing_tickets_updated: 0,
            assignments_detected: 0,
            new_messages_synced: 0,
            channels_gone: Vec::new(),
            failures: Vec::new(),
            finished_at: Utc::now(),
        }
    }

    fn fail(&mut self, channel_id: &str, ticket_id: Option<i64>, error: &SyncError) {
        self.failures.push(SyncFailure {
            channel_id: channel_id.to_string(),
            ticket_id,
            error: error.to_string(),
        });
    }
}

/// Per-ticket result of the refresh pass.
#[derive(Debug, Default)]
struct Refresh {
    assigned: bool,
    renamed: bool,
    messages: u64,
}

impl Refresh {
    fn changed(&self) -> bool {
        self.assigned || self.renamed || self.messages > 0
    }
}

pub struct Reconciler<'a> {
    db: &'a DatabaseConnection,
    platform: &'a dyn ChatPlatform,
    settings: SyncSettings,
}

impl<'a> Reconciler<'a> {
    pub fn new(db: &'a DatabaseConnection, platform: &'a dyn ChatPlatform, settings: SyncSettings) -> Self {
        Self {
            db,
            platform,
            settings,
        }
    }

    /// Runs one full reconciliation pass.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        if self.settings.guild_id.is_empty() {
            return Err(SyncError::NotConfigured("DISCORD_GUILD_ID"));
        }
        if self.settings.category_mappings.is_empty() {
            return Err(SyncError::NotConfigured("DISCORD_CATEGORY_MAPPINGS"));
        }

        let channels: Vec<Channel> = self
            .platform
            .list_guild_channels(&self.settings.guild_id)
            .await?
            .into_iter()
            .filter(|c| c.kind == TEXT_CHANNEL && self.category_name(c).is_some())
            .collect();

        let known = ticket::Model::known_channel_ids(self.db).await?;
        let open = ticket::Model::open_tickets(self.db).await?;
        let staff_ids = user::Model::dashboard_discord_ids(self.db).await?;

        let mut report = SyncReport::new(channels.len(), open.len());

        for channel in channels.iter().filter(|c| !known.contains(&c.id)) {
            match self.create_ticket(channel, &staff_ids).await {
                Ok(Some(messages)) => {
                    report.new_tickets_created += 1;
                    report.new_messages_synced += messages;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(channel_id = %channel.id, error = %e, "Failed to import new ticket channel");
                    report.fail(&channel.id, None, &e);
                }
            }
        }

        for ticket in open {
            let (id, channel_id) = (ticket.id, ticket.discord_channel_id.clone());
            match self.refresh_ticket(ticket, &staff_ids).await {
                Ok(refresh) => {
                    if refresh.assigned {
                        report.assignments_detected += 1;
                    }
                    if refresh.changed() {
                        report.existing_tickets_updated += 1;
                    }
                    report.new_messages_synced += refresh.messages;
                }
                Err(SyncError::Chat(e)) if e.is_gone() => {
                    info!(ticket_id = id, channel_id = %channel_id, error = %e, "Ticket channel is gone");
                    report.channels_gone.push(id);
                }
                Err(e) => {
                    warn!(ticket_id = id, channel_id = %channel_id, error = %e, "Failed to refresh ticket");
                    report.fail(&channel_id, Some(id), &e);
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            found = report.tickets_found_on_discord,
            created = report.new_tickets_created,
            updated = report.existing_tickets_updated,
            assignments = report.assignments_detected,
            messages = report.new_messages_synced,
            gone = report.channels_gone.len(),
            failures = report.failures.len(),
            "Ticket sync finished"
        );
        Ok(report)
    }

    fn category_name(&self, channel: &Channel) -> Option<&str> {
        channel
            .parent_id
            .as_ref()
            .and_then(|p| self.settings.category_mappings.get(p))
            .map(String::as_str)
    }

    /// Imports an untracked channel. Returns the number of messages stored, or
    /// `None` when another writer created the ticket first.
    async fn create_ticket(
        &self,
        channel: &Channel,
        staff_ids: &HashSet<String>,
    ) -> Result<Option<u64>, SyncError> {
        let category_name = self.category_name(channel).unwrap_or_default();
        let category_id = category::Model::find_by_name(self.db, category_name)
            .await?
            .map(|c| c.id);

        let mut messages = self
            .platform
            .list_channel_messages(&channel.id, None, MAX_MESSAGES_PER_PAGE)
            .await?;
        messages.sort_by_key(|m| m.timestamp);

        let parsed = ticket_name::parse(&channel.name);
        let assignee = match parsed.staff.as_deref() {
            Some(staff) => user::Model::find_dashboard_staff_by_name(self.db, staff).await?,
            None => None,
        };

        let creator = messages.iter().find(|m| !m.author.bot).map(|m| &m.author);
        let created_by_username = creator
            .map(|a| a.display_name().to_string())
            .or_else(|| (!parsed.customer.is_empty()).then(|| parsed.customer.clone()))
            .unwrap_or_else(|| UNKNOWN_AUTHOR_NAME.to_string());

        let new = NewTicket {
            discord_channel_id: channel.id.clone(),
            discord_server_id: self.settings.guild_id.clone(),
            title: channel.name.clone(),
            category_id,
            priority: Some(self.settings.default_priority(category_name)),
            created_by_discord_id: creator.map_or_else(|| UNKNOWN_AUTHOR_ID.to_string(), |a| a.id.clone()),
            created_by_username,
            created_by_avatar_url: creator.map(|a| a.avatar_url_or_default()),
            assigned_to_user_id: assignee.as_ref().map(|u| u.id),
            unread_count: 0,
            created_at: snowflake_timestamp(&channel.id).unwrap_or_else(Utc::now),
            last_message_at: None,
        };

        let txn = self.db.begin().await?;

        let Some(ticket) = ticket::Model::insert_if_absent(&txn, new).await? else {
            txn.rollback().await?;
            return Ok(None);
        };

        if let Some(staff) = &assignee {
            NewActivity::new(ticket.id, ActivityAction::Assigned)
                .change(None::<i64>, Some(staff.id))
                .comment(format!("Detected from channel name {}", channel.name))
                .insert(&txn)
                .await?;
        }

        let inserted = import_messages(&txn, staff_ids, ticket.id, &messages).await?;
        txn.commit().await?;

        info!(
            ticket_id = ticket.id,
            channel_id = %channel.id,
            assigned_to = ?ticket.assigned_to_user_id,
            messages = inserted,
            "Created ticket from Discord channel"
        );
        Ok(Some(inserted))
    }

    async fn refresh_ticket(
        &self,
        mut ticket: ticket::Model,
        staff_ids: &HashSet<String>,
    ) -> Result<Refresh, SyncError> {
        let channel = self.platform.get_channel(&ticket.discord_channel_id).await?;
        let parsed = ticket_name::parse(&channel.name);
        let mut refresh = Refresh::default();

        // A name without a staff token never unassigns.
        if let Some(staff) = parsed.staff.as_deref() {
            if let Some(staff) = user::Model::find_dashboard_staff_by_name(self.db, staff).await? {
                if ticket.assigned_to_user_id != Some(staff.id) {
                    let previous = ticket.assigned_to_user_id;
                    let txn = self.db.begin().await?;
                    ticket = ticket.assign(&txn, staff.id, None).await?;
                    NewActivity::new(ticket.id, ActivityAction::Assigned)
                        .change(previous, Some(staff.id))
                        .comment(format!("Detected from channel name {}", channel.name))
                        .insert(&txn)
                        .await?;
                    txn.commit().await?;

                    info!(ticket_id = ticket.id, assigned_to = staff.id, "Detected ticket claim");
                    refresh.assigned = true;
                }
            }
        }

        if channel.name != ticket.title {
            ticket = ticket.rename(self.db, &channel.name).await?;
            refresh.renamed = true;
        }

        let messages = fetch_new_messages(self.db, self.platform, ticket.id, &channel.id).await?;
        refresh.messages = import_messages(self.db, staff_ids, ticket.id, &messages).await?;

        Ok(refresh)
    }
}

/// Stores `messages` and, when any were new, flags the ticket unread.
async fn import_messages<C: sea_orm::ConnectionTrait>(
    db: &C,
    staff_ids: &HashSet<String>,
    ticket_id: i64,
    messages: &[Message],
) -> Result<u64, SyncError> {
    let outcome = MessageImporter::new(db, staff_ids).import(ticket_id, messages).await?;
    if let Some(newest) = outcome.newest_at {
        ticket::Model::record_new_messages(db, ticket_id, outcome.inserted, newest).await?;
    }
    Ok(outcome.inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeDiscord, message, user as discord_user};
    use db::models::ticket::TicketStatus;
    use db::models::ticket_activity_log;
    use db::models::ticket_message;
    use db::models::user::DiscordIdentity;
    use db::test_utils::setup_test_db;

    const CLAIM_PARENT: &str = "900";
    const QUESTIONS_PARENT: &str = "901";

    fn settings() -> SyncSettings {
        SyncSettings {
            guild_id: "guild".into(),
            category_mappings: BTreeMap::from([
                (CLAIM_PARENT.to_string(), "Claim".to_string()),
                (QUESTIONS_PARENT.to_string(), "Questions".to_string()),
            ]),
            high_priority_categories: vec!["Claim".into(), "Bugs".into()],
        }
    }

    async fn staff(db: &DatabaseConnection, discord_id: &str, username: &str) -> user::Model {
        user::Model::create_from_discord(
            db,
            &DiscordIdentity {
                discord_id: discord_id.into(),
                username: username.into(),
                ..Default::default()
            },
            true,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn missing_guild_or_mappings_is_a_configuration_error() {
        let db = setup_test_db().await;
        let discord = FakeDiscord::new();

        let err = Reconciler::new(&db, &discord, SyncSettings::default()).run().await.unwrap_err();
        assert!(matches!(err, SyncError::NotConfigured("DISCORD_GUILD_ID")));

        let no_mappings = SyncSettings {
            guild_id: "guild".into(),
            ..Default::default()
        };
        let err = Reconciler::new(&db, &discord, no_mappings).run().await.unwrap_err();
        assert!(matches!(err, SyncError::NotConfigured("DISCORD_CATEGORY_MAPPINGS")));
    }

    #[tokio::test]
    async fn creates_tickets_once_and_ignores_unmapped_channels() {
        let db = setup_test_db().await;
        let discord = FakeDiscord::new();
        let alice = discord_user("10", "alice", false);
        let bot = discord_user("11", "tickettool", true);

        discord.add_text_channel("100", "001-alice", CLAIM_PARENT);
        discord.add_text_channel("101", "002-bob", "999");
        discord.add_channel(Channel {
            id: "102".into(),
            name: "voice".into(),
            kind: 2,
            parent_id: Some(CLAIM_PARENT.into()),
        });
        discord.post("100", message(20, &bot, "Welcome"));
        discord.post("100", message(21, &alice, "my claim"));
        discord.post("100", message(22, &alice, "details"));

        let reconciler = Reconciler::new(&db, &discord, settings());
        let first = reconciler.run().await.unwrap();
        assert_eq!(first.tickets_found_on_discord, 1);
        assert_eq!(first.new_tickets_created, 1);
        assert_eq!(first.new_messages_synced, 2);
        assert!(first.failures.is_empty());

        let ticket = ticket::Model::find_by_channel_id(&db, "100").await.unwrap().unwrap();
        let claim = category::Model::find_by_name(&db, "claim").await.unwrap().unwrap();
        assert_eq!(ticket.category_id, Some(claim.id));
        assert_eq!(ticket.priority, Some(TicketPriority::High));
        assert_eq!(ticket.status, TicketStatus::New);
        assert_eq!(ticket.created_by_discord_id, "10");
        assert_eq!(ticket.created_by_username, "alice");
        assert_eq!(ticket.unread_count, 2);
        assert!(ticket.is_unread);

        let second = reconciler.run().await.unwrap();
        assert_eq!(second.new_tickets_created, 0);
        assert_eq!(second.new_messages_synced, 0);
        assert_eq!(second.existing_tickets_updated, 0);
        assert_eq!(ticket_message::Model::list_for_ticket(&db, ticket.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn claimed_channel_is_created_in_progress_with_medium_priority() {
        let db = setup_test_db().await;
        let dave = staff(&db, "50", "Dave").await;
        let discord = FakeDiscord::new();
        discord.add_text_channel("100", "🟢 003-dave-erin", QUESTIONS_PARENT);

        Reconciler::new(&db, &discord, settings()).run().await.unwrap();

        let ticket = ticket::Model::find_by_channel_id(&db, "100").await.unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert_eq!(ticket.assigned_to_user_id, Some(dave.id));
        assert_eq!(ticket.priority, Some(TicketPriority::Medium));
        assert_eq!(ticket.created_by_username, "erin");
        assert_eq!(ticket.created_by_discord_id, UNKNOWN_AUTHOR_ID);

        let logs = ticket_activity_log::Model::for_ticket_with_action(&db, ticket.id, ActivityAction::Assigned)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn rename_with_staff_token_assigns_once() {
        let db = setup_test_db().await;
        let dave = staff(&db, "50", "dave").await;
        let discord = FakeDiscord::new();
        let carol = discord_user("60", "carol", false);
        discord.add_text_channel("100", "007-carol", CLAIM_PARENT);
        discord.post("100", message(30, &carol, "hello"));

        let reconciler = Reconciler::new(&db, &discord, settings());
        reconciler.run().await.unwrap();

        discord.rename_channel("100", "007-dave-carol");
        discord.post("100", message(31, &carol, "anyone?"));
        let report = reconciler.run().await.unwrap();
        assert_eq!(report.assignments_detected, 1);
        assert_eq!(report.existing_tickets_updated, 1);
        assert_eq!(report.new_messages_synced, 1);

        let ticket = ticket::Model::find_by_channel_id(&db, "100").await.unwrap().unwrap();
        assert_eq!(ticket.assigned_to_user_id, Some(dave.id));
        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert_eq!(ticket.title, "007-dave-carol");
        assert_eq!(ticket.unread_count, 2);

        let again = reconciler.run().await.unwrap();
        assert_eq!(again.assignments_detected, 0);
        let logs = ticket_activity_log::Model::for_ticket_with_action(&db, ticket.id, ActivityAction::Assigned)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);

        // Dropping the staff token keeps the assignment.
        discord.rename_channel("100", "007-carol");
        reconciler.run().await.unwrap();
        let ticket = ticket::Model::find_by_id(&db, ticket.id).await.unwrap().unwrap();
        assert_eq!(ticket.assigned_to_user_id, Some(dave.id));
    }

    #[tokio::test]
    async fn claim_detection_matches_accented_staff_names() {
        let db = setup_test_db().await;
        let emile = user::Model::create_from_discord(
            &db,
            &DiscordIdentity {
                discord_id: "51".into(),
                username: "emile_s".into(),
                global_name: Some("Émile".into()),
                ..Default::default()
            },
            true,
        )
        .await
        .unwrap();
        let discord = FakeDiscord::new();
        discord.add_text_channel("100", "008-Émile-carol", CLAIM_PARENT);
        discord.add_text_channel("101", "009-carol", CLAIM_PARENT);

        let reconciler = Reconciler::new(&db, &discord, settings());
        reconciler.run().await.unwrap();
        let created = ticket::Model::find_by_channel_id(&db, "100").await.unwrap().unwrap();
        assert_eq!(created.assigned_to_user_id, Some(emile.id));

        discord.rename_channel("101", "009-émile-carol");
        let report = reconciler.run().await.unwrap();
        assert_eq!(report.assignments_detected, 1);
        let claimed = ticket::Model::find_by_channel_id(&db, "101").await.unwrap().unwrap();
        assert_eq!(claimed.assigned_to_user_id, Some(emile.id));
        assert_eq!(claimed.status, TicketStatus::InProgress);
    }

    #[tokio::test]
    async fn one_failing_channel_does_not_stop_the_batch() {
        let db = setup_test_db().await;
        let discord = FakeDiscord::new();
        let alice = discord_user("10", "alice", false);
        for id in ["100", "101", "102"] {
            discord.add_text_channel(id, &format!("{id}-alice"), CLAIM_PARENT);
        }

        let reconciler = Reconciler::new(&db, &discord, settings());
        assert_eq!(reconciler.run().await.unwrap().new_tickets_created, 3);
        let deleted = ticket::Model::find_by_channel_id(&db, "100").await.unwrap().unwrap();

        discord.remove_channel("100");
        discord.break_messages("101");
        discord.post("102", message(40, &alice, "still here"));

        let report = reconciler.run().await.unwrap();
        assert_eq!(report.channels_gone, vec![deleted.id]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].channel_id, "101");
        assert_eq!(report.new_messages_synced, 1);
    }

    #[tokio::test]
    async fn resolved_tickets_are_not_recreated() {
        let db = setup_test_db().await;
        let discord = FakeDiscord::new();
        discord.add_text_channel("100", "001-alice", CLAIM_PARENT);

        let reconciler = Reconciler::new(&db, &discord, settings());
        reconciler.run().await.unwrap();
        let ticket = ticket::Model::find_by_channel_id(&db, "100").await.unwrap().unwrap();
        ticket.resolve(&db).await.unwrap();

        let report = reconciler.run().await.unwrap();
        assert_eq!(report.new_tickets_created, 0);
        assert_eq!(report.tickets_in_database, 0);
    }
}
