//! Category repair.
//!
//! Tickets keep the category they were created under. When staff move a
//! channel to another Discord category, this job re-reads each open ticket's
//! parent and brings `category_id` back in line.

use chrono::{DateTime, Utc};
use db::models::category;
use db::models::ticket;
use db::models::ticket_activity_log::{ActivityAction, NewActivity};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::SyncError;
use crate::discord::ChatPlatform;
use crate::sync::SyncFailure;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRepairReport {
    pub tickets_checked: u64,
    pub categories_fixed: u64,
    pub failures: Vec<SyncFailure>,
    pub finished_at: DateTime<Utc>,
}

/// Re-derives `category_id` for every non-resolved ticket from its channel's
/// parent. Channels under an unmapped parent are left alone.
pub async fn repair_categories(
    db: &DatabaseConnection,
    platform: &dyn ChatPlatform,
    mappings: &BTreeMap<String, String>,
) -> Result<CategoryRepairReport, SyncError> {
    if mappings.is_empty() {
        return Err(SyncError::NotConfigured("DISCORD_CATEGORY_MAPPINGS"));
    }

    let mut report = CategoryRepairReport {
        tickets_checked: 0,
        categories_fixed: 0,
        failures: Vec::new(),
        finished_at: Utc::now(),
    };

    for ticket in ticket::Model::open_tickets(db).await? {
        report.tickets_checked += 1;
        let (id, channel_id) = (ticket.id, ticket.discord_channel_id.clone());

        match repair_one(db, platform, mappings, ticket).await {
            Ok(true) => report.categories_fixed += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(ticket_id = id, channel_id = %channel_id, error = %e, "Category repair failed");
                report.failures.push(SyncFailure {
                    channel_id,
                    ticket_id: Some(id),
                    error: e.to_string(),
                });
            }
        }
    }

    report.finished_at = Utc::now();
    info!(
        checked = report.tickets_checked,
        fixed = report.categories_fixed,
        failures = report.failures.len(),
        "Category repair finished"
    );
    Ok(report)
}

async fn repair_one(
    db: &DatabaseConnection,
    platform: &dyn ChatPlatform,
    mappings: &BTreeMap<String, String>,
    ticket: ticket::Model,
) -> Result<bool, SyncError> {
    let channel = platform.get_channel(&ticket.discord_channel_id).await?;
    let Some(name) = channel.parent_id.as_ref().and_then(|p| mappings.get(p)) else {
        return Ok(false);
    };
    let Some(category) = category::Model::find_by_name(db, name).await? else {
        return Ok(false);
    };
    if ticket.category_id == Some(category.id) {
        return Ok(false);
    }

    let previous = ticket.category_id;
    let txn = db.begin().await?;
    let ticket = ticket.set_category(&txn, Some(category.id)).await?;
    NewActivity::new(ticket.id, ActivityAction::CategoryChanged)
        .change(previous, Some(category.id))
        .comment(format!("Channel moved to {}", category.name))
        .insert(&txn)
        .await?;
    txn.commit().await?;

    Ok(true)
}
