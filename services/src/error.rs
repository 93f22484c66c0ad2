use sea_orm::DbErr;
use thiserror::Error;

use crate::discord::ChatError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("Missing configuration: {0}")]
    NotConfigured(&'static str),
}
