//! `/auth` routes: Discord OAuth login, logout and the signed-in user.
//!
//! - `GET /auth/discord` → `discord_login`
//! - `GET /auth/callback` → `discord_callback`
//! - `GET /auth/logout` → `logout`
//! - `GET /auth/me` → `get_me` (authenticated)

pub mod common;
pub mod get;

use axum::{Router, middleware::from_fn_with_state, routing::get};

use crate::auth::guards::allow_authenticated;
use crate::state::AppState;
use get::{discord_callback, discord_login, get_me, logout};

pub fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/discord", get(discord_login))
        .route("/callback", get(discord_callback))
        .route("/logout", get(logout))
        .route(
            "/me",
            get(get_me).route_layer(from_fn_with_state(state, allow_authenticated)),
        )
}
