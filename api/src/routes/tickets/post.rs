use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use db::filters::TicketFilterSet;
use db::models::ticket;
use db::models::ticket_activity_log::{ActivityAction, NewActivity};
use db::models::ticket_vote::{self, VoteStats, VoteValue};
use db::models::{ticket_read_status, user};
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};

use super::common::{load_ticket, require_vote_manager};
use crate::auth::AuthContext;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ClaimRequest {
    /// Staff member to assign; the caller when omitted.
    pub user_id: Option<i64>,
}

/// POST /api/tickets/{ticket_id}/claim
///
/// Assigns the ticket to the caller, or to `user_id` when given. A `new`
/// ticket moves to `in_progress`.
///
/// ### Request body (optional)
/// ```json
/// { "user_id": 12 }
/// ```
///
/// ### Responses
/// - `200 OK` with the updated ticket
/// - `400 Bad Request` when the target has no dashboard access
/// - `404 Not Found` when the ticket or target user does not exist
pub async fn claim_ticket(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<i64>, AppError>,
    body: Option<Json<ClaimRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.db();
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let caller = ctx.user_id();
    let target_id = req.user_id.unwrap_or(caller);

    if target_id != caller {
        let target = user::Model::find_by_id(db, target_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        if !target.can_access_dashboard || !target.is_active {
            return Err(AppError::bad_request("User does not have dashboard access"));
        }
    }

    let txn = db.begin().await?;
    let ticket = load_ticket(&txn, ticket_id).await?;
    let previous = ticket.assigned_to_user_id;
    let ticket = ticket.assign(&txn, target_id, Some(caller)).await?;
    NewActivity::new(ticket.id, ActivityAction::Assigned)
        .by(caller)
        .change(previous, Some(target_id))
        .comment(if target_id == caller {
            "Self-assigned"
        } else {
            "Assigned by staff"
        })
        .insert(&txn)
        .await?;
    txn.commit().await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(ticket, "Ticket claimed"))))
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub vote: VoteValue,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub vote: VoteValue,
    pub is_update: bool,
    pub vote_unchanged: bool,
    pub stats: VoteStats,
}

/// POST /api/tickets/{ticket_id}/votes
///
/// Casts or changes the caller's vote. Re-sending the same vote changes
/// nothing and reports `vote_unchanged: true`.
///
/// ### Request body
/// ```json
/// { "vote": "for" }
/// ```
///
/// ### Responses
/// - `200 OK` with `{ vote, is_update, vote_unchanged, stats }`
/// - `400 Bad Request` when voting is disabled or closed, or `vote` is invalid
/// - `404 Not Found` when the ticket does not exist
pub async fn cast_vote(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<VoteRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.db();
    let user_id = ctx.user_id();

    let txn = db.begin().await?;
    let ticket = load_ticket(&txn, ticket_id).await?;
    if !ticket.voting_enabled {
        return Err(AppError::bad_request("Voting is not enabled for this ticket"));
    }
    if ticket.voting_closed {
        return Err(AppError::bad_request("Voting is closed for this ticket"));
    }

    let existing = ticket_vote::Model::find_for_user(&txn, ticket_id, user_id).await?;
    let (is_update, vote_unchanged) = match existing {
        Some(current) if current.vote == req.vote => (true, true),
        Some(current) => {
            let old = current.vote;
            current.change(&txn, req.vote).await?;
            NewActivity::new(ticket_id, ActivityAction::VoteChanged)
                .by(user_id)
                .change(Some(old), Some(req.vote))
                .comment("Vote changed")
                .insert(&txn)
                .await?;
            (true, false)
        }
        None => {
            ticket_vote::Model::create(&txn, ticket_id, user_id, req.vote).await?;
            NewActivity::new(ticket_id, ActivityAction::VoteCast)
                .by(user_id)
                .change(None::<VoteValue>, Some(req.vote))
                .comment("New vote")
                .insert(&txn)
                .await?;
            (false, false)
        }
    };

    let stats = ticket_vote::Model::stats(&txn, ticket_id).await?;
    txn.commit().await?;

    let message = if vote_unchanged {
        "Vote unchanged"
    } else if is_update {
        "Vote updated"
    } else {
        "Vote recorded"
    };
    let response = VoteResponse {
        vote: req.vote,
        is_update,
        vote_unchanged,
        stats,
    };
    Ok((StatusCode::OK, Json(ApiResponse::success(response, message))))
}

#[derive(Debug, Serialize)]
pub struct CloseVoteResponse {
    pub ticket: ticket::Model,
    pub stats: VoteStats,
}

/// POST /api/tickets/{ticket_id}/votes/close
///
/// Freezes the tally. Requires `can_manage_votes`.
///
/// ### Responses
/// - `200 OK` with `{ ticket, stats }`
/// - `400 Bad Request` when voting is disabled or already closed
/// - `403 Forbidden` without vote-management permission
/// - `404 Not Found` when the ticket does not exist
pub async fn close_vote(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<i64>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    require_vote_manager(&ctx)?;
    let db = state.db();

    let txn = db.begin().await?;
    let ticket = load_ticket(&txn, ticket_id).await?;
    if !ticket.voting_enabled {
        return Err(AppError::bad_request("Voting is not enabled for this ticket"));
    }
    if ticket.voting_closed {
        return Err(AppError::bad_request("Voting is already closed"));
    }

    let stats = ticket_vote::Model::stats(&txn, ticket_id).await?;
    let ticket = ticket.close_voting(&txn, ctx.user_id()).await?;
    let snapshot = serde_json::to_string(&stats).map_err(|e| AppError::Internal(e.to_string()))?;
    NewActivity::new(ticket_id, ActivityAction::VoteClosed)
        .by(ctx.user_id())
        .change(None::<String>, Some(snapshot))
        .comment(format!(
            "Vote closed: {} for, {} against",
            stats.votes_for, stats.votes_against
        ))
        .insert(&txn)
        .await?;
    txn.commit().await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(CloseVoteResponse { ticket, stats }, "Voting closed"))))
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub tickets_marked: usize,
}

/// POST /api/tickets/read-all
///
/// Marks every ticket, archived ones included, read for the caller.
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.db();
    let user_id = ctx.user_id();

    let txn = db.begin().await?;
    let ids = ticket::Model::ids_matching(&txn, &TicketFilterSet::new()).await?;
    for id in &ids {
        ticket_read_status::Model::mark_read_latest(&txn, *id, user_id).await?;
    }
    txn.commit().await?;

    let response = MarkAllReadResponse {
        tickets_marked: ids.len(),
    };
    Ok((StatusCode::OK, Json(ApiResponse::success(response, "All tickets marked as read"))))
}

