use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::response::{ApiResponse, Empty};
use crate::state::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// GET /api/health
///
/// Liveness plus a database ping. `503` when the database does not answer.
///
/// ```json
/// { "success": true, "data": "OK", "message": "Health check passed" }
/// ```
async fn health_check(State(state): State<AppState>) -> Response {
    match state.db().ping().await {
        Ok(()) => Json(ApiResponse::success("OK", "Health check passed")).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::<Empty>::error("Database unreachable")),
            )
                .into_response()
        }
    }
}
