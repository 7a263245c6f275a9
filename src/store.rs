use crate::models::{AuthorizationRecord, Identity};
use async_trait::async_trait;
use reqwest::StatusCode;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// StoreError
///
/// Everything that can go wrong while reading an authorization record. None of these are
/// ever shown to the end user; the gate folds them into `Denied`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached (connection refused, pool exhausted, DNS, ...).
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered, but with a non-success status.
    #[error("backend returned status {status}")]
    Backend { status: u16 },
    /// The backend answered with a body we could not decode.
    #[error("could not decode authorization record: {0}")]
    Decode(String),
}

/// AuthorizationStore
///
/// The single read capability the gate depends on. Implementations return `Ok(None)` when
/// no record exists for the identity; that is not an error.
///
/// **Send + Sync + async_trait** keep `Arc<dyn AuthorizationStore>` shareable across
/// Axum's request tasks and the gate's background listener.
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    async fn fetch_record(
        &self,
        identity: &Identity,
    ) -> Result<Option<AuthorizationRecord>, StoreError>;
}

/// StoreState
///
/// The concrete type used to share the store across the application state.
pub type StoreState = Arc<dyn AuthorizationStore>;

// --- Postgres (local development database) ---

/// PostgresAuthorizationStore
///
/// Reads `role` from the `public.profiles` table, whose primary key mirrors `auth.users.id`.
pub struct PostgresAuthorizationStore {
    pool: PgPool,
}

impl PostgresAuthorizationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationStore for PostgresAuthorizationStore {
    async fn fetch_record(
        &self,
        identity: &Identity,
    ) -> Result<Option<AuthorizationRecord>, StoreError> {
        // profiles.id is a UUID column; an identity that is not a UUID cannot have a row.
        let Ok(id) = Uuid::parse_str(identity.as_str()) else {
            tracing::debug!(%identity, "identity is not a profile UUID, no record");
            return Ok(None);
        };

        sqlx::query_as::<_, AuthorizationRecord>("SELECT role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                    StoreError::Decode(e.to_string())
                }
                other => StoreError::Transport(other.to_string()),
            })
    }
}

// --- Supabase REST (production) ---

/// SupabaseAuthorizationStore
///
/// Queries the hosted PostgREST endpoint: `GET {url}/rest/v1/profiles?select=role&id=eq.{id}`.
/// PostgREST always answers with a JSON array; an empty array means "not found".
#[derive(Clone)]
pub struct SupabaseAuthorizationStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseAuthorizationStore {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl AuthorizationStore for SupabaseAuthorizationStore {
    async fn fetch_record(
        &self,
        identity: &Identity,
    ) -> Result<Option<AuthorizationRecord>, StoreError> {
        let url = format!("{}/rest/v1/profiles", self.base_url);
        let id_filter = format!("eq.{}", identity);

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("select", "role"), ("id", id_filter.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // The profiles relation itself is missing; nothing to grant from.
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StoreError::Backend {
                status: status.as_u16(),
            });
        }

        let rows = response
            .json::<Vec<AuthorizationRecord>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(rows.into_iter().next())
    }
}

// --- In-memory (tests and offline demos) ---

/// InMemoryAuthorizationStore
///
/// A map-backed store used by tests. Counts every lookup so callers can assert that the
/// store was (or was not) consulted, and can be switched into a failing mode.
#[derive(Default)]
pub struct InMemoryAuthorizationStore {
    records: RwLock<HashMap<Identity, AuthorizationRecord>>,
    lookups: AtomicUsize,
    /// When true, every lookup returns a simulated transport failure.
    pub should_fail: bool,
}

impl InMemoryAuthorizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Builder-style helper for seeding a role.
    pub fn with_role(self, identity: impl Into<Identity>, role: &str) -> Self {
        self.insert(identity.into(), AuthorizationRecord::with_role(role));
        self
    }

    pub fn insert(&self, identity: Identity, record: AuthorizationRecord) {
        if let Ok(mut records) = self.records.write() {
            records.insert(identity, record);
        }
    }

    pub fn remove(&self, identity: &Identity) {
        if let Ok(mut records) = self.records.write() {
            records.remove(identity);
        }
    }

    /// Number of `fetch_record` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationStore for InMemoryAuthorizationStore {
    async fn fetch_record(
        &self,
        identity: &Identity,
    ) -> Result<Option<AuthorizationRecord>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(StoreError::Transport(
                "In-memory store: failure simulation requested".to_string(),
            ));
        }

        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(records.get(identity).cloned())
    }
}
