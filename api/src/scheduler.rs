//! Background jobs: Discord reconciliation, archival and expired-session cleanup.

use db::models::session;
use services::archive::{ArchivePolicy, run_archival};
use services::sync::{Reconciler, SyncSettings};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};
use util::config;

use crate::state::AppState;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawns every periodic job on the current runtime.
pub fn spawn_schedulers(state: AppState) -> Vec<JoinHandle<()>> {
    let sync_every = Duration::from_secs(config::sync_interval_seconds().max(1));
    let archive_every = Duration::from_secs(config::archive_interval_seconds().max(1));
    info!(
        sync_secs = sync_every.as_secs(),
        archive_secs = archive_every.as_secs(),
        "Starting schedulers"
    );

    vec![
        tokio::spawn(sync_loop(state.clone(), sync_every)),
        tokio::spawn(archive_loop(state.clone(), archive_every)),
        tokio::spawn(session_purge_loop(state)),
    ]
}

async fn sync_loop(state: AppState, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        run_sync_once(&state).await;
    }
}

/// One scheduled reconciliation. Skipped while a manual sync or repair holds the job lock.
pub async fn run_sync_once(state: &AppState) {
    let Some(_guard) = state.try_job_guard() else {
        debug!("Previous Discord job still running; skipping scheduled sync");
        return;
    };

    match Reconciler::new(state.db(), state.platform(), SyncSettings::from_config())
        .run()
        .await
    {
        Ok(report) => debug!(
            created = report.new_tickets_created,
            updated = report.existing_tickets_updated,
            "Scheduled sync done"
        ),
        Err(e) => error!(error = %e, "Scheduled sync failed"),
    }
}

async fn archive_loop(state: AppState, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if let Err(e) = run_archival(state.db(), &ArchivePolicy::from_config()).await {
            error!(error = %e, "Scheduled archival failed");
        }
    }
}

async fn session_purge_loop(state: AppState) {
    let mut ticker = interval(SESSION_PURGE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match session::Model::purge_expired(state.db()).await {
            Ok(0) => {}
            Ok(n) => info!(purged = n, "Expired sessions removed"),
            Err(e) => error!(error = %e, "Session purge failed"),
        }
    }
}
