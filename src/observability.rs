use crate::models::Identity;
use std::sync::Arc;
use std::time::Duration;

use crate::store::StoreError;

/// LookupFailure
///
/// Why a role lookup produced no answer. Only ever handed to a [`FailureReporter`]; the
/// gate itself resolves `Denied` regardless of which variant occurred.
#[derive(Debug, thiserror::Error)]
pub enum LookupFailure {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("role lookup timed out after {0:?}")]
    TimedOut(Duration),
}

/// FailureReporter
///
/// The observability collaborator. Called synchronously from the gate, so implementations
/// must return promptly and must not panic.
pub trait FailureReporter: Send + Sync {
    fn lookup_failed(&self, identity: &Identity, failure: &LookupFailure);
}

/// ReporterState
///
/// The concrete type used to share the reporter across the application state.
pub type ReporterState = Arc<dyn FailureReporter>;

/// TracingFailureReporter
///
/// Default reporter: emits a structured `warn` event, picked up by whichever subscriber
/// `main` installed (pretty locally, JSON in production).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFailureReporter;

impl FailureReporter for TracingFailureReporter {
    fn lookup_failed(&self, identity: &Identity, failure: &LookupFailure) {
        tracing::warn!(%identity, error = %failure, "admin role lookup failed, access denied");
    }
}
