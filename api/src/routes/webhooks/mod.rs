//! `/webhooks` routes: events pushed by the Discord ticket bot.
//!
//! - `POST /webhooks/discord` → `discord_event`

pub mod post;

use axum::{Router, routing::post};

use crate::routes::trigger_cors;
use crate::state::AppState;

pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/discord", post(post::discord_event))
        .layer(trigger_cors())
}
