//! `/admin` routes.
//!
//! Super admin only:
//! - `GET /admin/users` → `list_users`
//! - `POST /admin/users` → `create_user`
//! - `PUT /admin/users/{user_id}` → `update_user`
//!
//! Secret-guarded (CORS enabled):
//! - `POST /admin/grant-access` → `grant_access`

pub mod common;
pub mod get;
pub mod post;
pub mod put;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use crate::auth::guards::allow_super_admin;
use crate::routes::trigger_cors;
use crate::state::AppState;

pub fn admin_routes(state: AppState) -> Router<AppState> {
    let users = Router::new()
        .route("/users", get(get::list_users).post(post::create_user))
        .route("/users/{user_id}", put(put::update_user))
        .route_layer(from_fn_with_state(state, allow_super_admin));

    let triggers = Router::new()
        .route("/grant-access", post(post::grant_access))
        .layer(trigger_cors());

    users.merge(triggers)
}
