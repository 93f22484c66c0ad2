use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use db::filters::{TicketFilter, TicketFilterSet};
use db::models::ticket::{self, TicketPriority, TicketStats, TicketStatus};
use db::models::ticket_vote::{self, VoteStats, VoteValue};
use db::models::{ticket_activity_log, ticket_message, ticket_read_status};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::common::{TicketSummary, load_ticket, page_limit, summarize};
use crate::auth::AuthContext;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;

const MAX_PAGE: u64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category_id: Option<i64>,
    pub assigned_to: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ListQuery {
    fn filters(self, viewer_id: i64) -> Result<TicketFilterSet, AppError> {
        let mut set = TicketFilterSet::new()
            .with(TicketFilter::Archived(false))
            .with_opt(self.category_id, TicketFilter::Category)
            .with_opt(non_empty(self.search), TicketFilter::Search);

        if let Some(status) = non_empty(self.status) {
            let status = TicketStatus::from_str(&status)
                .map_err(|_| AppError::bad_request(format!("Invalid status: {status}")))?;
            set = set.with(TicketFilter::Status(status));
        }

        if let Some(priority) = non_empty(self.priority) {
            let filter = if priority.eq_ignore_ascii_case("unset") {
                TicketFilter::Priority(None)
            } else {
                let p = TicketPriority::from_str(&priority)
                    .map_err(|_| AppError::bad_request(format!("Invalid priority: {priority}")))?;
                TicketFilter::Priority(Some(p))
            };
            set = set.with(filter);
        }

        if let Some(assigned) = non_empty(self.assigned_to) {
            let filter = match assigned.as_str() {
                "me" => TicketFilter::AssignedTo(viewer_id),
                "unassigned" => TicketFilter::Unassigned,
                other => other
                    .parse::<i64>()
                    .map(TicketFilter::AssignedTo)
                    .map_err(|_| AppError::bad_request(format!("Invalid assigned_to: {other}")))?,
            };
            set = set.with(filter);
        }

        Ok(set)
    }
}

#[derive(Debug, Serialize)]
pub struct TicketListResponse {
    pub tickets: Vec<TicketSummary>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub stats: TicketStats,
}

/// GET /api/tickets
///
/// Live (non-archived) tickets, unread first, then by priority and age.
///
/// ### Query parameters
/// - `status`: `new`, `in_progress` or `resolved`
/// - `priority`: `high`, `medium`, `low` or `unset`
/// - `category_id`
/// - `assigned_to`: `me`, `unassigned` or a user id
/// - `search`: case-insensitive match on title or creator name
/// - `limit` (default 50, max 200), `offset`
///
/// ### Responses
/// - `200 OK` with `{ tickets, total, limit, offset, stats }`
/// - `400 Bad Request` on an unknown filter value
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.db();
    let limit = page_limit(query.limit, 50, MAX_PAGE);
    let offset = query.offset.unwrap_or(0);
    let filters = query.filters(ctx.user_id())?;

    let tickets = ticket::Model::list(db, &filters, limit, offset).await?;
    let total = ticket::Model::count_matching(db, &filters).await?;
    let stats = ticket::Model::stats(db).await?;
    let tickets = summarize(db, tickets, ctx.user_id()).await?;

    let response = TicketListResponse {
        tickets,
        total,
        limit,
        offset,
        stats,
    };
    Ok((StatusCode::OK, Json(ApiResponse::success(response, "Tickets retrieved"))))
}

#[derive(Debug, Deserialize)]
pub struct ArchivedQuery {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ArchivedTicket {
    #[serde(flatten)]
    pub summary: TicketSummary,
    #[serde(flatten)]
    pub votes: VoteStats,
}

#[derive(Debug, Serialize)]
pub struct ArchivedListResponse {
    pub tickets: Vec<ArchivedTicket>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// GET /api/tickets/archived
///
/// Archived tickets, most recently closed first, each with its vote tally.
/// Accepts `category_id`, `search`, `limit` (default 100, max 200) and `offset`.
pub async fn list_archived(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Query(query), _): WithRejection<Query<ArchivedQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.db();
    let limit = page_limit(query.limit, 100, MAX_PAGE);
    let offset = query.offset.unwrap_or(0);
    let filters = TicketFilterSet::new()
        .with(TicketFilter::Archived(true))
        .with_opt(query.category_id, TicketFilter::Category)
        .with_opt(non_empty(query.search), TicketFilter::Search);

    let tickets = ticket::Model::list_archived(db, &filters, limit, offset).await?;
    let total = ticket::Model::count_matching(db, &filters).await?;
    let ids: Vec<i64> = tickets.iter().map(|t| t.id).collect();
    let mut votes = ticket_vote::Model::stats_for_tickets(db, &ids).await?;

    let tickets = summarize(db, tickets, ctx.user_id())
        .await?
        .into_iter()
        .map(|summary| ArchivedTicket {
            votes: votes.remove(&summary.ticket.id).unwrap_or_default(),
            summary,
        })
        .collect();

    let response = ArchivedListResponse {
        tickets,
        total,
        limit,
        offset,
    };
    Ok((StatusCode::OK, Json(ApiResponse::success(response, "Archived tickets retrieved"))))
}

#[derive(Debug, Serialize)]
pub struct TicketDetailsResponse {
    pub ticket: TicketSummary,
    pub messages: Vec<ticket_message::Model>,
    pub vote_stats: VoteStats,
    pub my_vote: Option<VoteValue>,
    pub activity: Vec<ticket_activity_log::Model>,
}

/// GET /api/tickets/{ticket_id}
///
/// Full ticket view. Opening a ticket marks it read for the caller up to its
/// newest visible message.
///
/// ### Responses
/// - `200 OK` with `{ ticket, messages, vote_stats, my_vote, activity }`
/// - `404 Not Found` when the ticket does not exist
pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<i64>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.db();
    let user_id = ctx.user_id();
    let ticket = load_ticket(db, ticket_id).await?;

    let messages = ticket_message::Model::list_for_ticket(db, ticket_id).await?;
    let vote_stats = ticket_vote::Model::stats(db, ticket_id).await?;
    let my_vote = ticket_vote::Model::find_for_user(db, ticket_id, user_id)
        .await?
        .map(|v| v.vote);
    let activity = ticket_activity_log::Model::for_ticket(db, ticket_id).await?;

    ticket_read_status::Model::mark_read_latest(db, ticket_id, user_id).await?;

    let ticket = summarize(db, vec![ticket], user_id)
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Ticket not found"))?;

    let response = TicketDetailsResponse {
        ticket,
        messages,
        vote_stats,
        my_vote,
        activity,
    };
    Ok((StatusCode::OK, Json(ApiResponse::success(response, "Ticket retrieved"))))
}
