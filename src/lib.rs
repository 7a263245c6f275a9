use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core domain: the admin access gate and its collaborators.
pub mod gate;
pub mod models;
pub mod observability;
pub mod store;

// Service surface: configuration, session resolution, HTTP handlers.
pub mod auth;
pub mod config;
pub mod handlers;

// Module for routing segregation (Public, Admin).
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use gate::AuthorizationGate;
pub use observability::{FailureReporter, ReporterState, TracingFailureReporter};
pub use store::{
    AuthorizationStore, InMemoryAuthorizationStore, PostgresAuthorizationStore, StoreState,
    SupabaseAuthorizationStore,
};

/// ApiDoc
///
/// Auto-generated OpenAPI document for the service, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::get_admin_access, handlers::get_admin_home),
    components(
        schemas(
            models::GateState, models::Role, models::Identity,
            models::AdminAccessResponse, models::AdminHome,
        )
    ),
    tags(
        (name = "kiki-hub", description = "KIKI's Learning Hub admin access API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for the store, the failure reporter and the configuration.
/// Cloning is cheap: the collaborators sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Authorization store the gate reads roles from (Postgres, Supabase, in-memory).
    pub store: StoreState,
    /// Observability collaborator for failed role lookups.
    pub reporter: ReporterState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    /// A fresh gate for one request, wired to the shared store and reporter.
    pub fn gate(&self) -> AuthorizationGate {
        AuthorizationGate::new(
            Arc::clone(&self.store),
            Arc::clone(&self.reporter),
            self.config.role_lookup_timeout,
        )
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for StoreState {
    fn from_ref(app_state: &AppState) -> StoreState {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, applies the scoped and global middleware, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: session is optional.
        .merge(public::public_routes())
        // Admin Routes: guarded by the gate middleware inside the module.
        .merge(admin::admin_routes(state.clone()))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, correlating every log line with its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
