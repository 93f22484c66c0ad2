use sea_orm::DatabaseConnection;
use services::discord::{ChatPlatform, DiscordClient, OAuthProvider};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Shared handles for every request and scheduled job.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    platform: Arc<dyn ChatPlatform>,
    oauth: Arc<dyn OAuthProvider>,
    job_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        platform: Arc<dyn ChatPlatform>,
        oauth: Arc<dyn OAuthProvider>,
    ) -> Self {
        Self {
            db,
            platform,
            oauth,
            job_lock: Arc::new(Mutex::new(())),
        }
    }

    /// State backed by the real Discord client built from config.
    pub fn from_config(db: DatabaseConnection) -> Self {
        let client = Arc::new(DiscordClient::from_config());
        Self::new(db, client.clone(), client)
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn platform(&self) -> &dyn ChatPlatform {
        self.platform.as_ref()
    }

    pub fn oauth(&self) -> &dyn OAuthProvider {
        self.oauth.as_ref()
    }

    /// Claims the Discord job slot, or `None` while another sync or repair runs.
    pub fn try_job_guard(&self) -> Option<OwnedMutexGuard<()>> {
        self.job_lock.clone().try_lock_owned().ok()
    }
}
