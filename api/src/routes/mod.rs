//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness probe (public)
//! - `/auth` → Discord OAuth login, logout and the current user
//! - `/tickets` → ticket listing, details, claims, priority and votes (authenticated)
//! - `/staff`, `/roles` → staff directory (authenticated) and role catalogue (public)
//! - `/admin` → user management (super admin) and the secret-guarded access grant
//! - `/jobs` → secret-guarded manual triggers for sync, archival and category repair
//! - `/webhooks` → events pushed by the Discord ticket bot

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::guards::allow_authenticated;
use crate::auth::middleware::log_request;
use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod common;
pub mod health;
pub mod jobs;
pub mod roles;
pub mod staff;
pub mod tickets;
pub mod webhooks;

/// CORS for endpoints invoked from outside the dashboard (cron services, the bot, curl).
/// The dashboard itself is served from the same origin, so no other route sends CORS headers.
pub fn trigger_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

/// Builds the `/api` router with its state applied.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::health_routes())
        .nest("/auth", auth::auth_routes(state.clone()))
        .nest(
            "/tickets",
            tickets::ticket_routes().route_layer(from_fn_with_state(state.clone(), allow_authenticated)),
        )
        .route(
            "/staff",
            get(staff::list_staff).route_layer(from_fn_with_state(state.clone(), allow_authenticated)),
        )
        .route("/roles", get(roles::list_roles))
        .nest("/admin", admin::admin_routes(state.clone()))
        .nest("/jobs", jobs::job_routes())
        .nest("/webhooks", webhooks::webhook_routes())
        .with_state(state)
}

/// The whole server: `/api` behind the request logger.
pub fn app(state: AppState) -> Router {
    Router::new().nest("/api", routes(state)).layer(from_fn(log_request))
}
