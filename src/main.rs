use kiki_hub::{
    AppState, TracingFailureReporter,
    config::{AppConfig, Env},
    create_router,
    store::{PostgresAuthorizationStore, StoreState, SupabaseAuthorizationStore},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Initializes configuration, logging, the authorization store and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kiki_hub=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Authorization store: local Postgres profiles table, or Supabase REST in production.
    let store: StoreState = match config.env {
        Env::Local => {
            let db_url = config
                .db_url
                .as_deref()
                .expect("FATAL: DATABASE_URL required in local");
            // Lazy: the gate fails closed while the database is unreachable.
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(config.role_lookup_timeout)
                .connect_lazy(db_url)
                .expect("FATAL: DATABASE_URL is not a valid Postgres URL.");
            Arc::new(PostgresAuthorizationStore::new(pool))
        }
        Env::Production => Arc::new(SupabaseAuthorizationStore::new(
            &config.supabase_url,
            &config.supabase_key,
        )),
    };

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        store,
        reporter: Arc::new(TracingFailureReporter),
        config,
    };

    // 4. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: could not bind BIND_ADDR");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated");
}
