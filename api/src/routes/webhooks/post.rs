use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use db::models::ticket::{self, NewTicket, TicketPriority};
use db::models::ticket_activity_log::{ActivityAction, NewActivity};
use db::models::ticket_message::{self, NewMessage};
use db::models::{category, user};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::{info, warn};
use util::config;

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::routes::common::check_secret;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    #[serde(default)]
    pub secret: String,
    pub event_type: String,
    #[serde(default)]
    pub ticket_data: Value,
}

#[derive(Debug, Deserialize)]
pub struct TicketCreated {
    pub discord_channel_id: String,
    pub discord_server_id: String,
    pub title: String,
    pub category_name: Option<String>,
    pub priority: Option<String>,
    pub created_by_discord_id: String,
    pub created_by_username: String,
    pub created_by_avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TicketMessage {
    pub discord_channel_id: String,
    pub discord_message_id: String,
    pub author_discord_id: String,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
    #[serde(default)]
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct TicketClosed {
    pub discord_channel_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TicketClaimed {
    pub discord_channel_id: String,
    pub claimed_by_discord_id: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub event_type: String,
    /// False when the event was acknowledged without changing anything.
    pub applied: bool,
}

fn payload<T: DeserializeOwned>(data: Value) -> Result<T, AppError> {
    serde_json::from_value(data).map_err(|e| AppError::bad_request(format!("Invalid ticket_data: {e}")))
}

/// POST /api/webhooks/discord
///
/// Receives ticket lifecycle events from the bot.
///
/// ### Request body
/// ```json
/// { "secret": "...", "event_type": "ticket_closed", "ticket_data": { "discord_channel_id": "123..." } }
/// ```
///
/// `event_type` is one of `ticket_created`, `ticket_message`, `ticket_closed`
/// or `ticket_claimed`. Other types are logged and acknowledged.
///
/// ### Responses
/// - `200 OK` with `{ event_type, applied }`
/// - `400 Bad Request` when `ticket_data` does not fit the event
/// - `403 Forbidden` on a wrong or unset `WEBHOOK_SECRET`
pub async fn discord_event(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<WebhookRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    check_secret(&req.secret, &config::webhook_secret())?;
    let db = state.db();

    let applied = match req.event_type.as_str() {
        "ticket_created" => ticket_created(db, payload(req.ticket_data)?).await?,
        "ticket_message" => ticket_message(db, payload(req.ticket_data)?).await?,
        "ticket_closed" => ticket_closed(db, payload(req.ticket_data)?).await?,
        "ticket_claimed" => ticket_claimed(db, payload(req.ticket_data)?).await?,
        other => {
            warn!(event_type = other, "Unknown webhook event ignored");
            false
        }
    };

    let response = WebhookResponse {
        event_type: req.event_type,
        applied,
    };
    Ok((StatusCode::OK, Json(ApiResponse::success(response, "Event received"))))
}

async fn ticket_created(db: &DatabaseConnection, data: TicketCreated) -> Result<bool, AppError> {
    let category = match data.category_name.as_deref() {
        Some(name) => category::Model::find_by_name(db, name).await?,
        None => None,
    };
    let priority = data
        .priority
        .as_deref()
        .and_then(|p| TicketPriority::from_str(p).ok())
        .unwrap_or(TicketPriority::Medium);

    let ticket = ticket::Model::upsert_by_channel(
        db,
        NewTicket {
            discord_channel_id: data.discord_channel_id,
            discord_server_id: data.discord_server_id,
            title: data.title,
            category_id: category.map(|c| c.id),
            priority: Some(priority),
            created_by_discord_id: data.created_by_discord_id,
            created_by_username: data.created_by_username,
            created_by_avatar_url: data.created_by_avatar_url,
            assigned_to_user_id: None,
            unread_count: 0,
            created_at: Utc::now(),
            last_message_at: None,
        },
    )
    .await?;

    info!(ticket_id = ticket.id, channel_id = %ticket.discord_channel_id, "Ticket created from webhook");
    Ok(true)
}

async fn ticket_message(db: &DatabaseConnection, data: TicketMessage) -> Result<bool, AppError> {
    let Some(ticket) = ticket::Model::find_by_channel_id(db, &data.discord_channel_id).await? else {
        warn!(channel_id = %data.discord_channel_id, "Webhook message for unknown ticket");
        return Ok(false);
    };
    let is_from_staff = user::Model::find_by_discord_id(db, &data.author_discord_id)
        .await?
        .is_some_and(|u| u.can_access_dashboard);
    let created_at = data.created_at.unwrap_or_else(Utc::now);

    let txn = db.begin().await?;
    let inserted = ticket_message::Model::insert_if_absent(
        &txn,
        NewMessage {
            ticket_id: ticket.id,
            discord_message_id: data.discord_message_id,
            author_discord_id: data.author_discord_id,
            author_username: data.author_username,
            author_avatar_url: data.author_avatar_url,
            content: data.content,
            is_from_staff,
            created_at,
        },
    )
    .await?;
    if inserted {
        ticket::Model::record_new_messages(&txn, ticket.id, 1, created_at).await?;
    }
    txn.commit().await?;

    Ok(inserted)
}

async fn ticket_closed(db: &DatabaseConnection, data: TicketClosed) -> Result<bool, AppError> {
    let Some(ticket) = ticket::Model::find_by_channel_id(db, &data.discord_channel_id).await? else {
        return Ok(false);
    };
    let ticket = ticket.resolve(db).await?;

    info!(ticket_id = ticket.id, "Ticket resolved from webhook");
    Ok(true)
}

async fn ticket_claimed(db: &DatabaseConnection, data: TicketClaimed) -> Result<bool, AppError> {
    let Some(ticket) = ticket::Model::find_by_channel_id(db, &data.discord_channel_id).await? else {
        return Ok(false);
    };
    let Some(staff) = user::Model::find_by_discord_id(db, &data.claimed_by_discord_id).await? else {
        warn!(discord_id = %data.claimed_by_discord_id, "Ticket claimed by an unknown user");
        return Ok(false);
    };
    if ticket.assigned_to_user_id == Some(staff.id) {
        return Ok(false);
    }

    let previous = ticket.assigned_to_user_id;
    let txn = db.begin().await?;
    let ticket = ticket.assign(&txn, staff.id, None).await?;
    NewActivity::new(ticket.id, ActivityAction::Assigned)
        .change(previous, Some(staff.id))
        .comment("Claimed on Discord")
        .insert(&txn)
        .await?;
    txn.commit().await?;

    Ok(true)
}
