use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use db::models::ticket::TicketPriority;
use db::models::ticket_activity_log::{ActivityAction, NewActivity};
use sea_orm::TransactionTrait;
use serde::Deserialize;

use super::common::{load_ticket, require_vote_manager};
use crate::auth::AuthContext;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PriorityRequest {
    /// `null` clears the priority.
    pub priority: Option<TicketPriority>,
}

/// PUT /api/tickets/{ticket_id}/priority
///
/// ### Request body
/// ```json
/// { "priority": "high" }
/// ```
///
/// ### Responses
/// - `200 OK` with the updated ticket
/// - `400 Bad Request` when `priority` is not `high`, `medium`, `low` or `null`
/// - `404 Not Found` when the ticket does not exist
pub async fn update_priority(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<PriorityRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db().begin().await?;
    let ticket = load_ticket(&txn, ticket_id).await?;
    let previous = ticket.priority;
    let ticket = ticket.set_priority(&txn, req.priority).await?;
    NewActivity::new(ticket_id, ActivityAction::PriorityChanged)
        .by(ctx.user_id())
        .change(previous, req.priority)
        .insert(&txn)
        .await?;
    txn.commit().await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(ticket, "Priority updated"))))
}

#[derive(Debug, Deserialize)]
pub struct VotingRequest {
    pub enable: bool,
}

/// PUT /api/tickets/{ticket_id}/voting
///
/// Turns voting on or off. Turning it off also reopens a closed vote.
/// Requires `can_manage_votes`.
///
/// ### Request body
/// ```json
/// { "enable": true }
/// ```
pub async fn toggle_voting(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<VotingRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    require_vote_manager(&ctx)?;

    let txn = state.db().begin().await?;
    let ticket = load_ticket(&txn, ticket_id).await?;
    let previous = ticket.voting_enabled;
    let ticket = ticket.set_voting(&txn, req.enable).await?;
    NewActivity::new(ticket_id, ActivityAction::VotingToggled)
        .by(ctx.user_id())
        .change(Some(previous), Some(req.enable))
        .insert(&txn)
        .await?;
    txn.commit().await?;

    let message = if req.enable { "Voting enabled" } else { "Voting disabled" };
    Ok((StatusCode::OK, Json(ApiResponse::success(ticket, message))))
}
