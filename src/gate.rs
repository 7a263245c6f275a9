use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{
    models::{GateState, Identity},
    observability::{LookupFailure, ReporterState},
    store::StoreState,
};

/// Upper bound for a single role lookup when no configuration overrides it.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// AuthorizationGate
///
/// Decides whether the privileged admin UI may be shown for the current session identity.
///
/// The gate is fail-closed: absent identities, missing records, non-admin or malformed
/// roles, store errors and timeouts all resolve `Denied`. Only a record whose role is
/// exactly `admin` resolves `Granted`.
///
/// Every evaluation takes a ticket from a monotonically increasing generation counter.
/// A result is only published if its ticket is still the latest one, so a slow lookup
/// for a previous identity can never overwrite the state computed for a newer one.
pub struct AuthorizationGate {
    store: StoreState,
    reporter: ReporterState,
    lookup_timeout: Duration,
    generation: AtomicU64,
    state_tx: watch::Sender<GateState>,
}

impl AuthorizationGate {
    pub fn new(store: StoreState, reporter: ReporterState, lookup_timeout: Duration) -> Self {
        let (state_tx, _) = watch::channel(GateState::Pending);
        Self {
            store,
            reporter,
            lookup_timeout,
            generation: AtomicU64::new(0),
            state_tx,
        }
    }

    /// The currently published state.
    pub fn state(&self) -> GateState {
        *self.state_tx.borrow()
    }

    /// Subscribe to published state changes (the presentation layer's view).
    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state_tx.subscribe()
    }

    /// evaluate
    ///
    /// Resolves the gate for `identity`. The returned value is the resolution for this
    /// identity; it is only published if no newer evaluation (or retirement) happened
    /// while the lookup was outstanding.
    pub async fn evaluate(&self, identity: Option<&Identity>) -> GateState {
        let ticket = self.begin(identity);
        match identity {
            // No session: short-circuit without touching the store.
            None => GateState::Denied,
            Some(identity) => self.finish(ticket, identity).await,
        }
    }

    /// retire
    ///
    /// Detaches the gate from any outstanding lookup, for when the owner goes away.
    /// Late results are discarded on arrival; the published state is left untouched.
    pub fn retire(&self) {
        self.next_ticket();
    }

    /// watch_identity
    ///
    /// Re-evaluates the gate every time the session identity changes. Each change starts
    /// a new evaluation immediately, without waiting for the previous lookup; the ticket
    /// check discards whichever results have been superseded. Repeated notifications for
    /// an unchanged identity do not trigger another lookup.
    ///
    /// The listener ends, retiring the gate, once the identity sender is dropped.
    pub fn watch_identity(
        self: &Arc<Self>,
        mut identities: watch::Receiver<Option<Identity>>,
    ) -> JoinHandle<()> {
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            let mut current = identities.borrow_and_update().clone();
            gate.spawn_evaluation(current.clone());

            while identities.changed().await.is_ok() {
                let next = identities.borrow_and_update().clone();
                if next == current {
                    continue;
                }
                tracing::debug!(from = ?current, to = ?next, "session identity changed");
                current = next;
                gate.spawn_evaluation(current.clone());
            }

            gate.retire();
        })
    }

    fn spawn_evaluation(self: &Arc<Self>, identity: Option<Identity>) {
        // The ticket is taken before spawning, so the new identity's Pending is published
        // before any older lookup gets another chance to land.
        let ticket = self.begin(identity.as_ref());
        if let Some(identity) = identity {
            let gate = Arc::clone(self);
            tokio::spawn(async move {
                gate.finish(ticket, &identity).await;
            });
        }
    }

    /// Takes a new ticket and publishes the state that holds until the lookup resolves.
    fn begin(&self, identity: Option<&Identity>) -> u64 {
        let ticket = self.next_ticket();
        let initial = match identity {
            Some(_) => GateState::Pending,
            None => GateState::Denied,
        };
        self.publish(ticket, initial);
        ticket
    }

    async fn finish(&self, ticket: u64, identity: &Identity) -> GateState {
        let resolved = self.resolve(identity).await;
        if !self.publish(ticket, resolved) {
            tracing::debug!(%identity, ?resolved, ticket, "discarding superseded gate result");
        }
        resolved
    }

    async fn resolve(&self, identity: &Identity) -> GateState {
        let lookup = self.store.fetch_record(identity);

        let failure = match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(Some(record))) if record.grants_admin() => return GateState::Granted,
            Ok(Ok(Some(record))) => {
                tracing::debug!(%identity, role = ?record.role, "role is not admin");
                return GateState::Denied;
            }
            Ok(Ok(None)) => {
                tracing::debug!(%identity, "no authorization record");
                return GateState::Denied;
            }
            Ok(Err(e)) => LookupFailure::Store(e),
            Err(_) => LookupFailure::TimedOut(self.lookup_timeout),
        };

        self.reporter.lookup_failed(identity, &failure);
        GateState::Denied
    }

    fn next_ticket(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publishes `state` if `ticket` is still the newest evaluation. The generation is
    /// checked while the channel's write lock is held, so a newer evaluation's `Pending`
    /// can never be overwritten by an older result.
    fn publish(&self, ticket: u64, state: GateState) -> bool {
        let mut applied = false;
        self.state_tx.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != ticket {
                return false;
            }
            applied = true;
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        applied
    }
}
