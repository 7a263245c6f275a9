use crate::{
    AppState,
    auth::Session,
    models::{AdminAccessResponse, AdminHome, GateState, Role},
};
use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

// --- Handlers ---

/// get_admin_access
///
/// [Public Route] Evaluates the admin gate for the caller's session.
///
/// Always answers 200: anonymous callers, non-admins and backend failures all come back as
/// `denied`. The front-end shows the "Admin Access" control only when `admin_route` is set.
#[utoipa::path(
    get,
    path = "/access/admin",
    responses((status = 200, description = "Gate decision", body = AdminAccessResponse))
)]
pub async fn get_admin_access(
    session: Session,
    State(state): State<AppState>,
) -> Json<AdminAccessResponse> {
    let decision = state.gate().evaluate(session.identity.as_ref()).await;

    Json(AdminAccessResponse {
        state: decision,
        admin_route: decision
            .is_granted()
            .then(|| state.config.admin_route.clone()),
        checked_at: Utc::now(),
    })
}

/// get_admin_home
///
/// [Admin Route] Landing payload of the privileged area. Only reachable through
/// `require_admin`, so the identity is known to be present and granted.
#[utoipa::path(
    get,
    path = "/admin",
    responses(
        (status = 200, description = "Admin landing", body = AdminHome),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_home(session: Session) -> Result<Json<AdminHome>, StatusCode> {
    let identity = session.identity.ok_or(StatusCode::FORBIDDEN)?;
    Ok(Json(AdminHome {
        identity,
        role: Role::Admin,
    }))
}

/// require_admin
///
/// Middleware guarding the admin routes. Runs a fresh gate evaluation and lets the request
/// through only on `Granted`; everything else, including lookup failures, is a 403.
pub async fn require_admin(
    session: Session,
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    match state.gate().evaluate(session.identity.as_ref()).await {
        GateState::Granted => Ok(next.run(request).await),
        _ => Err(StatusCode::FORBIDDEN),
    }
}
