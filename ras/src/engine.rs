//! The RAS engine handle: wires transport, endpoint, state and the
//! background scheduler together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use h323_messages::DisengageReason;
use h323_protocol::RasTransport;
use h323_types::{Bandwidth, EndpointId, GatekeeperId, ObjectIdentifier, TransportAddress};

use crate::admission::{Admission, AdmissionParams};
use crate::auth::AuthenticatorSet;
use crate::call::RasCall;
use crate::config::RasConfig;
use crate::disengage::DisengageOutcome;
use crate::endpoint::Endpoint;
use crate::error::RasError;
use crate::events::{EventBus, RasEvent};
use crate::metrics::RasMetrics;
use crate::registration::DiscoveryStrategy;
use crate::roster::AlternateGatekeeper;
use crate::state::{EngineState, GatekeeperIdentity, Registration, RegistrationState};

/// How long `close` waits for the scheduler task.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared engine internals. Every operation module adds an `impl` block.
pub(crate) struct EngineInner {
    pub(crate) config: RasConfig,
    pub(crate) transport: Arc<dyn RasTransport>,
    pub(crate) endpoint: Arc<dyn Endpoint>,
    pub(crate) authenticators: AuthenticatorSet,
    pub(crate) access_token: Option<(ObjectIdentifier, Option<ObjectIdentifier>)>,
    pub(crate) state: Mutex<EngineState>,
    /// Serialises registration cycles between callers and the scheduler.
    pub(crate) registering: tokio::sync::Mutex<()>,
    pub(crate) wake: Notify,
    pub(crate) stop: AtomicBool,
    pub(crate) events: EventBus,
    pub(crate) metrics: RasMetrics,
}

impl EngineInner {
    /// The state lock. Never held across an `.await`.
    pub(crate) fn lock(&self) -> MutexGuard<'_, EngineState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Our endpoint identifier and the bound gatekeeper's identifier, for
    /// call-scoped requests.
    pub(crate) fn call_context(
        &self,
    ) -> Result<(EndpointId, Option<GatekeeperId>), RasError> {
        let state = self.lock();
        self.check_revoked(&state)?;
        let endpoint_identifier = state
            .registration
            .endpoint_identifier
            .clone()
            .ok_or(RasError::NotRegistered)?;
        let gatekeeper_identifier = state.gatekeeper.as_ref().and_then(|g| g.identifier.clone());
        Ok((endpoint_identifier, gatekeeper_identifier))
    }

    /// A registration the gatekeeper took away stays lost unless the engine
    /// may re-register on its own.
    pub(crate) fn check_revoked(&self, state: &EngineState) -> Result<(), RasError> {
        if state.registration.state == RegistrationState::LostRegistration
            && !self.config.auto_reregister
        {
            return Err(RasError::RegistrationLost(
                "auto-reregister is disabled".into(),
            ));
        }
        Ok(())
    }

    /// Nudge the scheduler to recompute its deadlines.
    pub(crate) fn notify_scheduler(&self) {
        self.wake.notify_one();
    }
}

/// An H.323 endpoint's RAS client.
///
/// Owns one transport and drives discovery, registration, lease refresh,
/// call admission and failover against whichever gatekeeper it is bound to.
pub struct RasEngine {
    inner: Arc<EngineInner>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl RasEngine {
    /// Build an engine and start its scheduler. Must be called from within
    /// a Tokio runtime.
    pub fn new(
        config: RasConfig,
        transport: Arc<dyn RasTransport>,
        endpoint: Arc<dyn Endpoint>,
    ) -> Result<Self, RasError> {
        config.validate()?;
        let access_token = config.access_token_matcher()?;
        let authenticators = endpoint.authenticators();
        let inner = Arc::new(EngineInner {
            config,
            transport,
            endpoint,
            authenticators,
            access_token,
            state: Mutex::new(EngineState::default()),
            registering: tokio::sync::Mutex::new(()),
            wake: Notify::new(),
            stop: AtomicBool::new(false),
            events: EventBus::new(),
            metrics: RasMetrics::new()?,
        });

        let weak = Arc::downgrade(&inner);
        inner.transport.set_handler(Arc::new(move |message, from| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_message(message, from);
            }
        }));

        let scheduler = tokio::spawn(crate::scheduler::run(Arc::clone(&inner)));
        tracing::info!(
            local = %inner.transport.local_address(),
            "RAS engine started"
        );
        Ok(Self {
            inner,
            scheduler: Mutex::new(Some(scheduler)),
        })
    }

    // ── Gatekeeper & registration ───────────────────────────────────────

    /// Find a gatekeeper the way the configuration says to, then register.
    pub async fn connect(&self) -> Result<(), RasError> {
        let strategy = DiscoveryStrategy::from_parts(
            self.inner.config.gatekeeper_address()?,
            self.inner.config.gatekeeper_identifier()?,
        );
        self.inner.discover_and_register(strategy).await
    }

    /// Use a specific gatekeeper. With neither argument this is the same as
    /// [`discover_any`](Self::discover_any).
    pub async fn use_gatekeeper(
        &self,
        address: Option<TransportAddress>,
        identifier: Option<GatekeeperId>,
    ) -> Result<(), RasError> {
        let strategy = DiscoveryStrategy::from_parts(address, identifier);
        self.inner.discover_and_register(strategy).await
    }

    /// Broadcast discovery, then register with whoever answers.
    pub async fn discover_any(&self) -> Result<(), RasError> {
        self.inner
            .discover_and_register(DiscoveryStrategy::Broadcast)
            .await
    }

    /// Discovery only; binds the transport without registering.
    pub async fn discover(&self, strategy: DiscoveryStrategy) -> Result<GatekeeperIdentity, RasError> {
        self.inner.discover(strategy).await
    }

    /// Full registration with the bound gatekeeper.
    pub async fn register(&self) -> Result<(), RasError> {
        self.inner.register().await
    }

    /// Send URQ and forget the registration, whatever the answer.
    pub async fn unregister(&self) -> Result<(), RasError> {
        self.inner.unregister().await
    }

    // ── Call-scoped transactions ────────────────────────────────────────

    pub async fn admit(
        &self,
        call: &dyn RasCall,
        params: AdmissionParams,
    ) -> Result<Admission, RasError> {
        self.inner.admit(call, params).await
    }

    pub async fn change_bandwidth(
        &self,
        call: &dyn RasCall,
        bandwidth: Bandwidth,
    ) -> Result<Bandwidth, RasError> {
        self.inner.change_bandwidth(call, bandwidth).await
    }

    /// Best effort; never fails.
    pub async fn disengage(&self, call: &dyn RasCall, reason: DisengageReason) -> DisengageOutcome {
        self.inner.disengage(call, reason).await
    }

    // ── Observation ─────────────────────────────────────────────────────

    pub fn subscribe(&self, listener: Box<dyn Fn(&RasEvent) + Send + Sync>) {
        self.inner.events.subscribe(listener);
    }

    pub fn gatekeeper(&self) -> Option<GatekeeperIdentity> {
        self.inner.lock().gatekeeper.clone()
    }

    pub fn registration(&self) -> Registration {
        self.inner.lock().registration.clone()
    }

    pub fn is_registered(&self) -> bool {
        self.inner.lock().registration.is_registered()
    }

    /// Time until the scheduled lightweight refresh, if one is scheduled.
    pub fn next_refresh_in(&self) -> Option<Duration> {
        let at = self.inner.lock().timers.next_refresh?;
        Some(at.saturating_duration_since(Instant::now()))
    }

    pub fn pending_transactions(&self) -> usize {
        self.inner.lock().ledger.len()
    }

    /// Current alternate candidates, best first.
    pub fn alternates(&self) -> Vec<AlternateGatekeeper> {
        self.inner.lock().roster.entries().to_vec()
    }

    pub fn assigned_gatekeeper(&self) -> Option<AlternateGatekeeper> {
        self.inner.lock().assigned.clone()
    }

    pub fn metrics(&self) -> &RasMetrics {
        &self.inner.metrics
    }

    pub fn config(&self) -> &RasConfig {
        &self.inner.config
    }

    // ── Shutdown ────────────────────────────────────────────────────────

    /// Stop the scheduler, fail every pending transaction with
    /// [`RasError::NoResponse`] and close the transport. Does not unregister.
    pub async fn close(&self) {
        if self.inner.stop.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("RAS engine stopping");
        let aborted = {
            let mut state = self.inner.lock();
            state.closed = true;
            state.timers = Default::default();
            state.ledger.abort_all()
        };
        if aborted > 0 {
            tracing::debug!(aborted, "pending transactions aborted");
        }
        self.inner.notify_scheduler();

        let handle = match self.scheduler.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                tracing::warn!("scheduler did not stop within {:?}", SHUTDOWN_TIMEOUT);
            }
        }
        self.inner.transport.close();
        tracing::info!("RAS engine stopped");
    }
}

impl Drop for RasEngine {
    fn drop(&mut self) {
        self.inner.stop.store(true, Ordering::Release);
        self.inner.notify_scheduler();
    }
}

impl std::fmt::Debug for RasEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("RasEngine")
            .field("gatekeeper", &state.gatekeeper)
            .field("registration", &state.registration)
            .field("pending", &state.ledger.len())
            .finish()
    }
}
