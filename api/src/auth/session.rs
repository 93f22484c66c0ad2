//! Cookie sessions.
//!
//! The browser holds an opaque `session` cookie; everything else lives in the
//! `sessions` table. [`AuthContext`] is what the guards resolve that cookie to.

use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use db::models::{session, user};
use sea_orm::{ConnectionTrait, DbErr};
use time::Duration;

pub const SESSION_COOKIE: &str = "session";

/// The signed-in user behind a request, inserted into request extensions by the guards.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: user::Model,
    pub session_token: String,
    pub session_expires_at: DateTime<Utc>,
}

impl AuthContext {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    /// Active account that may still use the dashboard.
    pub fn has_dashboard_access(&self) -> bool {
        self.user.is_active && self.user.can_access_dashboard
    }
}

/// Session token carried by the request, if any.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolves the request's cookie to an unexpired session and its user.
pub async fn resolve<C: ConnectionTrait>(db: &C, headers: &HeaderMap) -> Result<Option<AuthContext>, DbErr> {
    let Some(token) = token_from_headers(headers) else {
        return Ok(None);
    };

    Ok(session::Model::find_active_with_user(db, &token)
        .await?
        .map(|(session, user)| AuthContext {
            user,
            session_token: session.session_token,
            session_expires_at: session.expires_at,
        }))
}

/// `Set-Cookie` value opening a session for `max_age_secs` seconds.
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    Cookie::build((SESSION_COOKIE, token.to_owned()))
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(max_age_secs))
        .build()
        .to_string()
}

/// `Set-Cookie` value that expires the session cookie immediately.
pub fn clear_session_cookie() -> String {
    session_cookie("", 0)
}
