//! `/tickets` routes. Every route here sits behind `allow_authenticated`.
//!
//! - `GET /tickets` → `list_tickets`
//! - `GET /tickets/archived` → `list_archived`
//! - `POST /tickets/read-all` → `mark_all_read`
//! - `GET /tickets/{ticket_id}` → `get_ticket`
//! - `POST /tickets/{ticket_id}/claim` → `claim_ticket`
//! - `PUT /tickets/{ticket_id}/priority` → `update_priority`
//! - `POST /tickets/{ticket_id}/votes` → `cast_vote`
//! - `POST /tickets/{ticket_id}/votes/close` → `close_vote`
//! - `PUT /tickets/{ticket_id}/voting` → `toggle_voting`

pub mod common;
pub mod get;
pub mod post;
pub mod put;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

pub fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get::list_tickets))
        .route("/archived", get(get::list_archived))
        .route("/read-all", post(post::mark_all_read))
        .route("/{ticket_id}", get(get::get_ticket))
        .route("/{ticket_id}/claim", post(post::claim_ticket))
        .route("/{ticket_id}/priority", put(put::update_priority))
        .route("/{ticket_id}/votes", post(post::cast_vote))
        .route("/{ticket_id}/votes/close", post(post::close_vote))
        .route("/{ticket_id}/voting", put(put::toggle_voting))
}
