//! `/jobs` routes: manual triggers for the background jobs.
//!
//! Each takes `admin_secret` in the JSON body and allows cross-origin POSTs so
//! external schedulers can call them.
//!
//! - `POST /jobs/sync` → `trigger_sync`
//! - `POST /jobs/archive` → `trigger_archive`
//! - `POST /jobs/fix-categories` → `trigger_fix_categories`

pub mod post;

use axum::{Router, routing::post};

use crate::routes::trigger_cors;
use crate::state::AppState;

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(post::trigger_sync))
        .route("/archive", post(post::trigger_archive))
        .route("/fix-categories", post(post::trigger_fix_categories))
        .layer(trigger_cors())
}
