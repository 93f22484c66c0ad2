use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::auth::session::{self, AuthContext};
use crate::error::AppError;
use crate::state::AppState;

/// User id of the authenticated caller, copied onto the response for request logging.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUserId(pub i64);

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, AppError> {
    let ctx = session::resolve(state.db(), headers)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if !ctx.has_dashboard_access() {
        return Err(AppError::forbidden("Dashboard access has been revoked"));
    }
    Ok(ctx)
}

async fn run_with(ctx: AuthContext, mut req: Request<Body>, next: Next) -> Response {
    let user_id = ctx.user_id();
    req.extensions_mut().insert(ctx);
    let mut response = next.run(req).await;
    response.extensions_mut().insert(AuthenticatedUserId(user_id));
    response
}

/// Requires a valid session belonging to an active, dashboard-enabled user.
pub async fn allow_authenticated(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = authenticate(&state, req.headers()).await?;
    Ok(run_with(ctx, req, next).await)
}

/// Same as [`allow_authenticated`], and the user must be a super admin.
pub async fn allow_super_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = authenticate(&state, req.headers()).await?;
    if !ctx.user.is_super_admin {
        return Err(AppError::forbidden("Super admin access required"));
    }
    Ok(run_with(ctx, req, next).await)
}
