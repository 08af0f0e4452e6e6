//! Per-session client state: identity, endpoint affinity, single-flight flag,
//! and the compiled-plan cache.
//!
//! # State Machine
//!
//! ```text
//! +----------------+
//! |    Unbound     | session_id=None, endpoint=None, cache empty, pending=false
//! +-------+--------+
//!         | bind(id, endpoint)
//!         v
//! +----------------+   start_operation()   +----------------+
//! |     Bound      | ────────────────────▶ |    Pending     |
//! |   (idle)       | ◀──────────────────── |  (in flight)   |
//! +-------+--------+  complete_operation() +-------+--------+
//!         |                                        | start_operation() again,
//!         | reset(): explicit, BadSession,         | BadSession, timeout
//!         | delete, timeout                        v
//!         +──────────────────────────────▶  back to Unbound
//! ```
//!
//! Nothing here blocks or touches the network. `reset()` swaps in a fresh
//! cache rather than clearing the old one, so a reset state is
//! indistinguishable from a new one.

use std::sync::Arc;

use tabula_types::{CompiledQuery, Endpoint, Fingerprint, QueryKey, SessionId};
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::plan_cache::PlanCache;

/// Cache of compiled plans keyed by query fingerprint.
pub type QueryPlanCache = PlanCache<Fingerprint, Arc<CompiledQuery>>;

/// Client-side state for one server session.
///
/// Not safe for concurrent use; the single-flight flag detects misuse and
/// punishes it with a reset instead of serializing callers.
#[derive(Debug)]
pub struct SessionState {
    session_id: Option<SessionId>,
    endpoint: Option<Endpoint>,
    pending: bool,
    plans: QueryPlanCache,
    client_cache_enabled: bool,
    plan_cache_capacity: usize,
}

impl SessionState {
    /// Create an unbound state.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            session_id: None,
            endpoint: None,
            pending: false,
            plans: PlanCache::new(config.plan_cache_capacity),
            client_cache_enabled: config.client_cache_enabled,
            plan_cache_capacity: config.plan_cache_capacity,
        }
    }

    // ── Identity ─────────────────────────────────────────────────────────

    /// Record the identity the server assigned and the endpoint that issued it.
    pub fn bind(&mut self, session_id: SessionId, endpoint: Endpoint) -> &mut Self {
        if let Some(old) = &self.session_id {
            warn!("Rebinding session {} without reset, now {}", old, session_id);
        }
        info!("Session {} bound to endpoint {}", session_id, endpoint);
        self.session_id = Some(session_id);
        self.endpoint = Some(endpoint);
        self
    }

    /// Drop identity, endpoint, pending flag, and every cached plan.
    pub fn reset(&mut self) {
        if let Some(id) = &self.session_id {
            debug!(
                "Resetting session {} ({} cached plans, pending={})",
                id,
                self.plans.len(),
                self.pending
            );
        }
        self.plans = PlanCache::new(self.plan_cache_capacity);
        self.session_id = None;
        self.pending = false;
        self.endpoint = None;
    }

    /// Reset on behalf of an external timeout or cancellation.
    ///
    /// An abandoned operation leaves no proof that the pending flag and the
    /// cache still agree with the server, so the session is discarded.
    pub fn force_reset(&mut self, reason: &str) {
        warn!(
            "Force-resetting session {:?}: {}",
            self.session_id.as_ref().map(SessionId::short),
            reason
        );
        self.reset();
    }

    /// The identity to stamp on outgoing requests.
    pub fn require_bound(&self) -> Result<&SessionId, SessionError> {
        self.session_id.as_ref().ok_or(SessionError::InvalidSession)
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.session_id.is_some()
    }

    // ── Single flight ────────────────────────────────────────────────────

    /// Mark a query-bearing operation as in flight.
    ///
    /// Starting while another operation is pending resets the whole session
    /// before failing: a half-finished operation is never retried against the
    /// same identity.
    pub fn start_operation(&mut self) -> Result<&mut Self, SessionError> {
        if self.pending {
            let id = self.session_id.as_ref().map(|s| s.to_string());
            self.reset();
            warn!("Operation started on session {:?} while previous one pending", id);
            return Err(SessionError::ProtocolViolation(
                "pending previous query completion".into(),
            ));
        }
        self.pending = true;
        Ok(self)
    }

    /// Mark the in-flight operation as finished. Idempotent.
    pub fn complete_operation(&mut self) -> &mut Self {
        self.pending = false;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    // ── Plan cache ───────────────────────────────────────────────────────

    /// Cached plan for `query`, refreshing its recency on a hit.
    pub fn cache_lookup<'q>(
        &mut self,
        query: impl Into<QueryKey<'q>>,
    ) -> Option<Arc<CompiledQuery>> {
        if !self.client_cache_enabled {
            return None;
        }
        let key = Fingerprint::of(query.into());
        let hit = self.plans.get(&key).cloned();
        trace!("Plan cache {} for {:?}", if hit.is_some() { "hit" } else { "miss" }, key);
        hit
    }

    /// Store `record` under `query`'s fingerprint. No-op with caching off.
    pub fn cache_put<'q>(
        &mut self,
        query: impl Into<QueryKey<'q>>,
        record: CompiledQuery,
    ) -> &mut Self {
        if !self.client_cache_enabled {
            return self;
        }
        let key = Fingerprint::of(query.into());
        if let Some((evicted, _)) = self.plans.put(key, Arc::new(record)) {
            debug!("Plan cache full ({}), evicted {:?}", self.plans.capacity(), evicted);
        }
        self
    }

    /// Drop the cached plan for `query`, if any.
    pub fn cache_evict<'q>(&mut self, query: impl Into<QueryKey<'q>>) -> &mut Self {
        let key = Fingerprint::of(query.into());
        if self.plans.erase(&key).is_some() {
            debug!("Evicted plan {:?}", key);
        }
        self
    }

    /// True if a plan is cached for `query`. Does not refresh recency.
    pub fn contains<'q>(&self, query: impl Into<QueryKey<'q>>) -> bool {
        self.client_cache_enabled && self.plans.contains(&Fingerprint::of(query.into()))
    }

    /// Number of cached plans.
    pub fn cached_plans(&self) -> usize {
        self.plans.len()
    }

    pub fn client_cache_enabled(&self) -> bool {
        self.client_cache_enabled
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

// ============================================================================
// Tests
// ============================================================================
