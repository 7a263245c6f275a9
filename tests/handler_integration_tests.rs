use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
};
use kiki_hub::{
    AppConfig, AppState, FailureReporter, InMemoryAuthorizationStore, create_router,
    auth::Session,
    config::Env,
    handlers,
    models::{AdminAccessResponse, AdminHome, GateState, Identity, Role},
    observability::LookupFailure,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tower::ServiceExt;

// --- TEST UTILITIES ---

#[derive(Default)]
struct CountingReporter {
    failures: AtomicUsize,
}

impl FailureReporter for CountingReporter {
    fn lookup_failed(&self, _identity: &Identity, _failure: &LookupFailure) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}

fn seeded_store() -> InMemoryAuthorizationStore {
    InMemoryAuthorizationStore::new()
        .with_role("user-42", "admin")
        .with_role("user-7", "standard")
}

fn create_test_state(store: InMemoryAuthorizationStore) -> AppState {
    AppState {
        store: Arc::new(store),
        reporter: Arc::new(CountingReporter::default()),
        config: AppConfig::default(),
    }
}

async fn send(state: AppState, uri: &str, user: Option<&str>) -> Response {
    let mut request = Request::builder().uri(uri);
    if let Some(user) = user {
        request = request.header("x-user-id", user);
    }
    create_router(state)
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- HANDLER TESTS ---

#[tokio::test]
async fn test_admin_access_granted_for_admin() {
    let state = create_test_state(seeded_store());

    let Json(response) =
        handlers::get_admin_access(Session::signed_in("user-42"), State(state)).await;

    assert_eq!(response.state, GateState::Granted);
    assert_eq!(response.admin_route.as_deref(), Some("/admin"));
}

#[tokio::test]
async fn test_admin_access_denied_for_standard_user() {
    let state = create_test_state(seeded_store());

    let Json(response) =
        handlers::get_admin_access(Session::signed_in("user-7"), State(state)).await;

    assert_eq!(response.state, GateState::Denied);
    assert!(response.admin_route.is_none());
}

#[tokio::test]
async fn test_admin_access_denied_for_anonymous_without_lookup() {
    let store = Arc::new(seeded_store());
    let state = AppState {
        store: store.clone(),
        reporter: Arc::new(CountingReporter::default()),
        config: AppConfig::default(),
    };

    let Json(response) = handlers::get_admin_access(Session::anonymous(), State(state)).await;

    assert_eq!(response.state, GateState::Denied);
    assert_eq!(store.lookups(), 0);
}

#[tokio::test]
async fn test_admin_access_store_failure_is_silent_denial() {
    let reporter = Arc::new(CountingReporter::default());
    let state = AppState {
        store: Arc::new(InMemoryAuthorizationStore::new_failing()),
        reporter: reporter.clone(),
        config: AppConfig::default(),
    };

    let Json(response) =
        handlers::get_admin_access(Session::signed_in("user-42"), State(state)).await;

    assert_eq!(response.state, GateState::Denied);
    assert!(response.admin_route.is_none());
    assert_eq!(reporter.failures.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_admin_home_requires_identity() {
    let result = handlers::get_admin_home(Session::anonymous()).await;
    assert_eq!(result.unwrap_err(), StatusCode::FORBIDDEN);
}

// --- ROUTER TESTS ---

#[tokio::test]
async fn test_health_check() {
    let response = send(create_test_state(seeded_store()), "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_route_access_admin_json_shape() {
    let response = send(
        create_test_state(seeded_store()),
        "/access/admin",
        Some("user-42"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = json_body(response).await;
    assert_eq!(body["state"], "granted");
    assert_eq!(body["admin_route"], "/admin");
    assert!(body["checked_at"].is_string());
}

#[tokio::test]
async fn test_route_access_admin_anonymous_omits_route() {
    let response = send(create_test_state(seeded_store()), "/access/admin", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: AdminAccessResponse = json_body(response).await;
    assert_eq!(body.state, GateState::Denied);
    assert!(body.admin_route.is_none());
}

#[tokio::test]
async fn test_route_admin_home_for_admin() {
    let response = send(create_test_state(seeded_store()), "/admin", Some("user-42")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: AdminHome = json_body(response).await;
    assert_eq!(body.identity, Identity::from("user-42"));
    assert_eq!(body.role, Role::Admin);
}

#[tokio::test]
async fn test_route_admin_home_forbidden_for_standard_user() {
    let response = send(create_test_state(seeded_store()), "/admin", Some("user-7")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_route_admin_home_forbidden_for_anonymous() {
    let response = send(create_test_state(seeded_store()), "/admin", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_route_admin_home_forbidden_when_store_down() {
    let state = create_test_state(InMemoryAuthorizationStore::new_failing());
    let response = send(state, "/admin", Some("user-42")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_route_custom_admin_route() {
    let mut state = create_test_state(seeded_store());
    state.config.admin_route = "/console".to_string();

    let response = send(state.clone(), "/access/admin", Some("user-42")).await;
    let body: AdminAccessResponse = json_body(response).await;
    assert_eq!(body.admin_route.as_deref(), Some("/console"));

    let response = send(state, "/console", Some("user-42")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_dev_header_ignored_in_production() {
    let mut state = create_test_state(seeded_store());
    state.config.env = Env::Production;

    let response = send(state, "/admin", Some("user-42")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
