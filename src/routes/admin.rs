use crate::{AppState, handlers};
use axum::{Router, middleware, routing::get};

/// Admin Router Module
///
/// The privileged area the "Admin Access" control navigates to, mounted at the configured
/// `admin_route`. Every route here sits behind `require_admin`, which re-runs the gate
/// for the request instead of trusting whatever the front-end rendered.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    let admin_route = state.config.admin_route.clone();

    Router::new()
        // GET {admin_route}
        // Admin landing payload (identity and role).
        .route(&admin_route, get(handlers::get_admin_home))
        .route_layer(middleware::from_fn_with_state(state, handlers::require_admin))
}
