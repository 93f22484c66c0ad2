use axum::{
    Extension, Json,
    extract::{ConnectInfo, Query, State},
    http::{
        Extensions, HeaderMap, HeaderValue, StatusCode,
        header::{LOCATION, SET_COOKIE, USER_AGENT},
    },
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Duration, Utc};
use db::models::{session, user};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use util::config;

use super::common::LoginState;
use crate::auth::session::{AuthContext, clear_session_cookie, session_cookie, token_from_headers};
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::routes::common::UserResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn redirect(location: &str, cookie: Option<String>) -> Result<Response, AppError> {
    let location = HeaderValue::from_str(location)
        .map_err(|_| AppError::bad_request("Invalid redirect target"))?;
    let mut response = (StatusCode::FOUND, [(LOCATION, location)]).into_response();
    if let Some(cookie) = cookie {
        let cookie = HeaderValue::from_str(&cookie).map_err(|e| AppError::Internal(e.to_string()))?;
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    Ok(response)
}

/// GET /api/auth/discord?return_to=/tickets.html
///
/// Redirects (302) to Discord's consent screen. `return_to` travels in the
/// OAuth `state` and must be a same-origin path; anything else becomes `/`.
pub async fn discord_login(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<LoginQuery>, AppError>,
) -> Result<Response, AppError> {
    let login_state = LoginState::new(query.return_to.as_deref());
    let url = state.oauth().authorize_url(&login_state.encode())?;
    redirect(&url, None)
}

/// GET /api/auth/callback?code=...&state=...
///
/// Completes the OAuth flow: exchanges the code, upserts the user and opens a
/// session.
///
/// ### Responses
/// - `302 Found` to the `return_to` path with `Set-Cookie: session=...`
/// - `400 Bad Request` when Discord reported an error or no code was sent
/// - `403 Forbidden` when the account has no dashboard access, or is not a
///   super admin and asked for the admin page
/// - `502 Bad Gateway` when Discord could not be reached
pub async fn discord_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    WithRejection(Query(query), _): WithRejection<Query<CallbackQuery>, AppError>,
) -> Result<Response, AppError> {
    if let Some(error) = query.error {
        return Err(AppError::bad_request(format!("Discord authorization failed: {error}")));
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::bad_request("Missing authorization code"))?;
    let login_state = LoginState::decode(query.state.as_deref());

    let grant = state.oauth().exchange_code(&code).await?;
    let profile = state.oauth().current_user(&grant.access_token).await?;

    let db = state.db();
    let account = user::Model::upsert_login(db, &profile.identity()).await?;

    if !account.is_active || !account.can_access_dashboard {
        tracing::info!(discord_id = %account.discord_id, "Login refused: no dashboard access");
        return Err(AppError::forbidden("You do not have access to the dashboard"));
    }
    if login_state.targets_admin_page() && !account.is_super_admin {
        return Err(AppError::forbidden("Super admin access required"));
    }

    let ttl = Duration::days(config::session_ttl_days());
    let mut new_session = session::NewSession::new(account.id, ttl);
    new_session.discord_access_token = Some(grant.access_token);
    new_session.discord_refresh_token = grant.refresh_token;
    new_session.discord_token_expires_at = grant.expires_in.map(|s| Utc::now() + Duration::seconds(s));
    new_session.ip_address = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    new_session.user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let created = session::Model::create(db, new_session).await?;
    tracing::info!(user_id = account.id, "Dashboard login");

    redirect(
        &login_state.return_to,
        Some(session_cookie(&created.session_token, ttl.num_seconds())),
    )
}

/// GET /api/auth/logout
///
/// Deletes the session (if any), expires the cookie and redirects to `/`.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = token_from_headers(&headers) {
        session::Model::delete_by_token(state.db(), &token).await?;
    }
    redirect("/", Some(clear_session_cookie()))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub session_expires_at: DateTime<Utc>,
}

/// GET /api/auth/me
///
/// The signed-in user with roles and the session expiry.
pub async fn get_me(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let user = UserResponse::load(state.db(), ctx.user).await?;
    let body = MeResponse {
        user,
        session_expires_at: ctx.session_expires_at,
    };

    Ok((StatusCode::OK, Json(ApiResponse::success(body, "User retrieved"))))
}
