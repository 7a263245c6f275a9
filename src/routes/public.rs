use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that accept anonymous callers. The session is still resolved when present,
/// which is how `/access/admin` can answer `granted` for a signed-in admin.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // GET /access/admin
        // Gate decision for the caller: pending never leaves the server, so this returns
        // either `denied` or `granted` (with the route the admin control links to).
        .route("/access/admin", get(handlers::get_admin_access))
}
