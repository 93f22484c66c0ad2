use db::models::{category, ticket, user};
use db::models::ticket_read_status;
use sea_orm::{ConnectionTrait, DbErr};
use serde::Serialize;
use std::collections::HashMap;

use crate::auth::AuthContext;
use crate::error::AppError;

/// A ticket with its category and assignee display fields joined in.
#[derive(Debug, Serialize)]
pub struct TicketSummary {
    #[serde(flatten)]
    pub ticket: ticket::Model,
    pub category_name: Option<String>,
    pub category_emoji: Option<String>,
    pub category_color: Option<String>,
    pub assigned_to_username: Option<String>,
    pub assigned_to_display_name: Option<String>,
    pub assigned_to_avatar: Option<String>,
    /// Messages the caller has not seen yet.
    pub user_unread_count: u64,
}

/// Joins category, assignee and the caller's unread counts onto `tickets`.
pub async fn summarize<C: ConnectionTrait>(
    db: &C,
    tickets: Vec<ticket::Model>,
    viewer_id: i64,
) -> Result<Vec<TicketSummary>, DbErr> {
    let ticket_ids: Vec<i64> = tickets.iter().map(|t| t.id).collect();
    let category_ids: Vec<i64> = tickets.iter().filter_map(|t| t.category_id).collect();
    let assignee_ids: Vec<i64> = tickets.iter().filter_map(|t| t.assigned_to_user_id).collect();

    let categories: HashMap<i64, category::Model> = category::Model::find_by_ids(db, &category_ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();
    let assignees: HashMap<i64, user::Model> = user::Model::find_by_ids(db, &assignee_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let unread = ticket_read_status::Model::unread_counts(db, viewer_id, &ticket_ids).await?;

    Ok(tickets
        .into_iter()
        .map(|t| {
            let category = t.category_id.and_then(|id| categories.get(&id));
            let assignee = t.assigned_to_user_id.and_then(|id| assignees.get(&id));
            TicketSummary {
                category_name: category.map(|c| c.name.clone()),
                category_emoji: category.and_then(|c| c.emoji.clone()),
                category_color: category.and_then(|c| c.color.clone()),
                assigned_to_username: assignee.map(|u| u.discord_username.clone()),
                assigned_to_display_name: assignee.map(|u| u.display_name().to_string()),
                assigned_to_avatar: assignee.and_then(|u| u.discord_avatar_url.clone()),
                user_unread_count: unread.get(&t.id).copied().unwrap_or(0),
                ticket: t,
            }
        })
        .collect())
}

pub async fn load_ticket<C: ConnectionTrait>(db: &C, ticket_id: i64) -> Result<ticket::Model, AppError> {
    ticket::Model::find_by_id(db, ticket_id)
        .await?
        .ok_or_else(|| AppError::not_found("Ticket not found"))
}

pub fn require_vote_manager(ctx: &AuthContext) -> Result<(), AppError> {
    if !ctx.user.can_manage_votes {
        return Err(AppError::forbidden("You do not have permission to manage votes"));
    }
    Ok(())
}

/// Clamps a requested page size to `1..=max`, using `default` when absent.
pub fn page_limit(requested: Option<u64>, default: u64, max: u64) -> u64 {
    requested.unwrap_or(default).clamp(1, max)
}
