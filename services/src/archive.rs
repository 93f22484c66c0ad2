//! Archival job.
//!
//! Keeps the resolved backlog bounded: once the number of resolved, unarchived
//! tickets reaches the threshold, the oldest batch is archived in one
//! transaction.

use chrono::{DateTime, Utc};
use db::models::ticket;
use db::models::ticket_activity_log::{ActivityAction, NewActivity};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use tracing::info;
use util::config;

use crate::SyncError;

/// Audit rows written per run; the rest of the batch is archived silently.
const AUDIT_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchivePolicy {
    pub threshold: u64,
    pub batch_size: u64,
    pub audit_cap: usize,
}

impl Default for ArchivePolicy {
    fn default() -> Self {
        Self {
            threshold: 480,
            batch_size: 100,
            audit_cap: AUDIT_CAP,
        }
    }
}

impl ArchivePolicy {
    pub fn from_config() -> Self {
        Self {
            threshold: config::archive_threshold(),
            batch_size: config::archive_batch_size(),
            audit_cap: AUDIT_CAP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveReport {
    pub total_resolved_before: u64,
    pub tickets_archived: u64,
    pub total_resolved_after: u64,
    pub threshold: u64,
    pub archive_batch_size: u64,
    pub finished_at: DateTime<Utc>,
}

pub async fn run_archival(db: &DatabaseConnection, policy: &ArchivePolicy) -> Result<ArchiveReport, SyncError> {
    let txn = db.begin().await?;

    let before = ticket::Model::count_resolved_unarchived(&txn).await?;
    let mut archived = 0;

    if before >= policy.threshold {
        let batch = ticket::Model::oldest_resolved_unarchived(&txn, policy.batch_size).await?;
        let ids: Vec<i64> = batch.iter().map(|t| t.id).collect();
        archived = ticket::Model::mark_archived(&txn, &ids).await?;

        for t in batch.iter().take(policy.audit_cap) {
            NewActivity::new(t.id, ActivityAction::Archived)
                .change(Some(false), Some(true))
                .comment(format!(
                    "Auto-archived: {before} resolved tickets reached the threshold of {}",
                    policy.threshold
                ))
                .insert(&txn)
                .await?;
        }
    }

    txn.commit().await?;

    let report = ArchiveReport {
        total_resolved_before: before,
        tickets_archived: archived,
        total_resolved_after: before - archived,
        threshold: policy.threshold,
        archive_batch_size: policy.batch_size,
        finished_at: Utc::now(),
    };
    info!(
        before = report.total_resolved_before,
        archived = report.tickets_archived,
        after = report.total_resolved_after,
        "Archival finished"
    );
    Ok(report)
}
