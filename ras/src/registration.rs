//! Registration lifecycle: discovery, full and lightweight registration,
//! reject handling and unregistration.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use h323_messages::{
    GatekeeperRequest, RegistrationConfirm, RegistrationReject, RegistrationRejectReason,
    RegistrationRequest, SecurityTokens, UnregistrationRequest,
};
use h323_types::{GatekeeperId, SequenceNumber, TransportAddress};

use crate::engine::EngineInner;
use crate::error::{RasError, RejectCause};
use crate::events::RasEvent;
use crate::executor::Target;
use crate::request::Reply;
use crate::roster::AlternateGatekeeper;
use crate::state::{refresh_delay, GatekeeperIdentity, Registration, RegistrationState};

/// How to find a gatekeeper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    /// GRQ to the well-known discovery address; the first GCF wins.
    Broadcast,
    /// Bind the address and register without a GRQ.
    Direct(TransportAddress),
    /// GRQ to the discovery address naming a gatekeeper; only that
    /// gatekeeper's answer is accepted.
    Locate(GatekeeperId),
    /// GRQ sent straight to a known gatekeeper, naming its zone.
    Pinned {
        address: TransportAddress,
        identifier: GatekeeperId,
    },
}

impl DiscoveryStrategy {
    pub fn from_parts(address: Option<TransportAddress>, identifier: Option<GatekeeperId>) -> Self {
        match (address, identifier) {
            (None, None) => Self::Broadcast,
            (Some(address), None) => Self::Direct(address),
            (None, Some(identifier)) => Self::Locate(identifier),
            (Some(address), Some(identifier)) => Self::Pinned {
                address,
                identifier,
            },
        }
    }
}

/// What to do about an RRJ.
#[derive(Debug, PartialEq, Eq)]
enum RejectHandling {
    Rediscover,
    FullRegistration,
    AssignedGatekeeper,
    Security,
    Terminal,
}

fn classify(reason: &RegistrationRejectReason) -> RejectHandling {
    use RegistrationRejectReason::*;
    match reason {
        DiscoveryRequired => RejectHandling::Rediscover,
        FullRegistrationRequired => RejectHandling::FullRegistration,
        RegisterWithAssignedGk => RejectHandling::AssignedGatekeeper,
        SecurityDenial | SecurityError => RejectHandling::Security,
        _ => RejectHandling::Terminal,
    }
}

impl EngineInner {
    // ── Discovery ───────────────────────────────────────────────────────

    pub(crate) async fn discover(
        &self,
        strategy: DiscoveryStrategy,
    ) -> Result<GatekeeperIdentity, RasError> {
        let previous = {
            let mut state = self.lock();
            let previous = state.registration.state;
            state.registration.state = RegistrationState::Discovering;
            state.using_alternate = false;
            previous
        };
        let result = match strategy {
            DiscoveryStrategy::Direct(address) => self.bind_direct(address),
            DiscoveryStrategy::Broadcast => {
                self.gatekeeper_request(TransportAddress::discovery(), None)
                    .await
            }
            DiscoveryStrategy::Locate(identifier) => {
                self.gatekeeper_request(TransportAddress::discovery(), Some(identifier))
                    .await
            }
            DiscoveryStrategy::Pinned {
                address,
                identifier,
            } => self.gatekeeper_request(address, Some(identifier)).await,
        };
        let mut state = self.lock();
        if state.registration.state == RegistrationState::Discovering {
            state.registration.state = previous;
        }
        result
    }

    fn bind_direct(&self, address: TransportAddress) -> Result<GatekeeperIdentity, RasError> {
        let identity = GatekeeperIdentity {
            ras_address: address,
            identifier: None,
        };
        self.rebind(identity.clone(), false)?;
        {
            let mut state = self.lock();
            state.discovery_complete = false;
            state.discovery_required = false;
        }
        info!(gatekeeper = %address, "using gatekeeper without discovery");
        Ok(identity)
    }

    async fn gatekeeper_request(
        &self,
        to: TransportAddress,
        identifier: Option<GatekeeperId>,
    ) -> Result<GatekeeperIdentity, RasError> {
        let grq = GatekeeperRequest {
            seq: SequenceNumber::FIRST,
            ras_address: self.transport.local_address(),
            endpoint_type: self.endpoint.endpoint_type(),
            gatekeeper_identifier: identifier.clone(),
            endpoint_alias: self.endpoint.aliases(),
            supports_alt_gk: self.config.supports_alternate_gatekeepers,
            security: SecurityTokens::default(),
        };
        debug!(to = %to, identifier = ?identifier, "discovering gatekeeper");
        match self.transact(grq, Target::Address(to)).await {
            Ok(Reply::Confirm(gcf)) => {
                let identity = GatekeeperIdentity {
                    ras_address: gcf.ras_address,
                    identifier: gcf.gatekeeper_identifier.clone().or(identifier),
                };
                self.rebind(identity.clone(), false)?;
                {
                    let mut state = self.lock();
                    state.discovery_complete = true;
                    state.discovery_required = false;
                    if let Some(assigned) = &gcf.assigned_gatekeeper {
                        state.assigned = Some(AlternateGatekeeper::from(assigned));
                    }
                }
                info!(
                    gatekeeper = %identity.ras_address,
                    identifier = ?identity.identifier,
                    "gatekeeper discovered"
                );
                self.events.emit(&RasEvent::GatekeeperDiscovered {
                    address: identity.ras_address,
                    identifier: identity.identifier.as_ref().map(|id| id.to_string()),
                });
                Ok(identity)
            }
            Ok(Reply::Reject(grj)) => {
                warn!(to = %to, reason = ?grj.reason, "discovery rejected");
                Err(RasError::PermanentReject(RejectCause::Discovery(grj.reason)))
            }
            Err(RasError::NoResponse) => Err(RasError::NoGatekeeper),
            Err(err) => Err(err),
        }
    }

    /// Discovery demanded by the gatekeeper: ask the current gatekeeper
    /// again, or fall back to the configured strategy when unbound.
    async fn rediscover(&self) -> Result<GatekeeperIdentity, RasError> {
        let current = self.lock().gatekeeper.clone();
        match current {
            Some(gk) => {
                let previous = {
                    let mut state = self.lock();
                    std::mem::replace(
                        &mut state.registration.state,
                        RegistrationState::Discovering,
                    )
                };
                let result = self.gatekeeper_request(gk.ras_address, gk.identifier).await;
                self.lock().registration.state = previous;
                result
            }
            None => self.discover(self.configured_strategy()?).await,
        }
    }

    fn configured_strategy(&self) -> Result<DiscoveryStrategy, RasError> {
        Ok(DiscoveryStrategy::from_parts(
            self.config.gatekeeper_address()?,
            self.config.gatekeeper_identifier()?,
        ))
    }

    // ── Registration ────────────────────────────────────────────────────

    pub(crate) async fn discover_and_register(
        &self,
        strategy: DiscoveryStrategy,
    ) -> Result<(), RasError> {
        let _cycle = self.registering.lock().await;
        self.discover(strategy).await?;
        self.register_cycle(false).await
    }

    pub(crate) async fn register(&self) -> Result<(), RasError> {
        let _cycle = self.registering.lock().await;
        let unbound = self.lock().gatekeeper.is_none();
        if unbound {
            self.discover(self.configured_strategy()?).await?;
        }
        self.register_cycle(false).await
    }

    /// Lease refresh from the scheduler: lightweight while registered, full
    /// after the registration was lost.
    pub(crate) async fn refresh_registration(&self) -> Result<(), RasError> {
        let _cycle = self.registering.lock().await;
        let lightweight = {
            let state = self.lock();
            if state.gatekeeper.is_none() {
                return Err(RasError::NoGatekeeper);
            }
            self.check_revoked(&state)?;
            state.registration.state == RegistrationState::Registered
        };
        self.register_cycle(lightweight).await
    }

    /// The gatekeeper no longer knows us: register from scratch.
    pub(crate) async fn reregister_for_call(&self) -> Result<(), RasError> {
        {
            let mut state = self.lock();
            self.check_revoked(&state)?;
            state.full_registration_required = true;
        }
        let _cycle = self.registering.lock().await;
        let already_done = {
            let state = self.lock();
            state.registration.is_registered() && !state.full_registration_required
        };
        if already_done {
            // Someone else re-registered while we waited.
            return Ok(());
        }
        self.register_cycle(false).await
    }

    /// One registration exchange plus at most one corrective retry.
    /// Callers hold the `registering` lock.
    async fn register_cycle(&self, mut lightweight: bool) -> Result<(), RasError> {
        let mut retried = false;
        loop {
            let (discovery_required, full_required) = {
                let state = self.lock();
                (state.discovery_required, state.full_registration_required)
            };
            if discovery_required {
                self.rediscover().await?;
                lightweight = false;
            }
            if full_required {
                lightweight = false;
            }

            let request = match lightweight.then(|| self.lightweight_registration_request()) {
                Some(Some(rrq)) => rrq,
                _ => {
                    lightweight = false;
                    let identifier = self.current_gatekeeper_identifier();
                    self.full_registration_request(identifier)
                }
            };
            self.lock().registration.state = if lightweight {
                RegistrationState::LightweightReregistering
            } else {
                RegistrationState::Registering
            };
            debug!(lightweight, "registering");

            let reject = match self.make_request(request).await {
                Ok(Reply::Confirm(rcf)) => {
                    self.apply_registration_confirm(&rcf, lightweight);
                    return Ok(());
                }
                Ok(Reply::Reject(rrj)) => rrj,
                Err(err) => return Err(self.registration_failed(err)),
            };

            let cause = RejectCause::Registration(reject.reason.clone());
            warn!(reason = ?reject.reason, lightweight, "registration rejected");
            self.events.emit(&RasEvent::RegistrationRejected {
                cause: cause.clone(),
            });

            match classify(&reject.reason) {
                RejectHandling::Rediscover if !retried => {
                    self.lock().discovery_required = true;
                }
                RejectHandling::FullRegistration if !retried => {
                    self.lock().full_registration_required = true;
                }
                RejectHandling::AssignedGatekeeper if !retried => {
                    if !self.follow_assigned_gatekeeper(&reject)? {
                        self.reset_registration();
                        return Err(RasError::PermanentReject(cause));
                    }
                }
                RejectHandling::Rediscover
                | RejectHandling::FullRegistration
                | RejectHandling::AssignedGatekeeper => {
                    self.lock().registration.state = RegistrationState::Unregistered;
                    self.metrics.registered.set(0);
                    return Err(RasError::TransientReject(cause));
                }
                RejectHandling::Security => {
                    self.reset_registration();
                    return Err(RasError::SecurityDenied(format!("{:?}", reject.reason)));
                }
                RejectHandling::Terminal => {
                    self.reset_registration();
                    return Err(RasError::PermanentReject(cause));
                }
            }
            retried = true;
            lightweight = false;
        }
    }

    /// Rebind to the gatekeeper named in an RRJ `registerWithAssignedGK`.
    /// Returns `false` if the reject did not name one.
    fn follow_assigned_gatekeeper(&self, reject: &RegistrationReject) -> Result<bool, RasError> {
        let Some(info) = &reject.assigned_gatekeeper else {
            return Ok(false);
        };
        let assigned = AlternateGatekeeper::from(info);
        let identity = GatekeeperIdentity {
            ras_address: assigned.ras_address,
            identifier: assigned.identifier.clone(),
        };
        self.lock().assigned = Some(assigned);
        self.rebind(identity, false)?;
        info!(gatekeeper = %info.ras_address, "redirected to assigned gatekeeper");
        Ok(true)
    }

    /// Record an unanswered registration and hand the error back.
    fn registration_failed(&self, err: RasError) -> RasError {
        if !err.is_unreachable() {
            return err;
        }
        let had_registration = {
            let mut state = self.lock();
            let had = state.registration.endpoint_identifier.is_some();
            state.registration.state = if had {
                RegistrationState::LostRegistration
            } else {
                RegistrationState::Unregistered
            };
            had
        };
        self.metrics.registered.set(0);
        if had_registration {
            warn!(%err, "registration refresh unanswered, registration lost");
            self.events
                .emit(&RasEvent::RegistrationLost { reason: None });
        }
        err
    }

    pub(crate) fn apply_registration_confirm(&self, rcf: &RegistrationConfirm, lightweight: bool) {
        let lease = rcf
            .time_to_live
            .map(|secs| Duration::from_secs(u64::from(secs)));
        let deadband = Duration::from_secs(u64::from(self.config.lease_deadband_secs));
        {
            let mut state = self.lock();
            state.registration = Registration {
                endpoint_identifier: Some(rcf.endpoint_identifier.clone()),
                lease,
                state: RegistrationState::Registered,
            };
            let now = Instant::now();
            state.timers.next_refresh = lease
                .and_then(|l| refresh_delay(l, deadband))
                .map(|d| now + d);
            state.timers.reregister_now = false;
            state.discovery_required = false;
            state.full_registration_required = false;
            state.will_respond_to_irr = rcf.will_respond_to_irr;
            if let Some(assigned) = &rcf.assigned_gatekeeper {
                state.assigned = Some(AlternateGatekeeper::from(assigned));
            }
            if let Some(gk) = state.gatekeeper.as_mut() {
                if gk.identifier.is_none() {
                    gk.identifier = rcf.gatekeeper_identifier.clone();
                }
            }
            if state.timers.next_status.is_none() {
                if let Some(interval) = status_interval(&self.config, state.gatekeeper_irr_interval) {
                    state.timers.next_status = Some(now + interval);
                }
            }
        }
        self.metrics.registered.set(1);
        self.notify_scheduler();
        info!(
            endpoint = %rcf.endpoint_identifier,
            lease = ?lease,
            lightweight,
            "registered"
        );
        self.events.emit(&RasEvent::Registered {
            endpoint_identifier: rcf.endpoint_identifier.clone(),
            lightweight,
        });
    }

    fn current_gatekeeper_identifier(&self) -> Option<GatekeeperId> {
        self.lock()
            .gatekeeper
            .as_ref()
            .and_then(|g| g.identifier.clone())
    }

    pub(crate) fn full_registration_request(
        &self,
        gatekeeper_identifier: Option<GatekeeperId>,
    ) -> RegistrationRequest {
        let discovery_complete = self.lock().discovery_complete;
        RegistrationRequest {
            seq: SequenceNumber::FIRST,
            discovery_complete,
            call_signal_addresses: self.endpoint.call_signal_addresses(),
            ras_addresses: vec![self.transport.local_address()],
            endpoint_type: self.endpoint.endpoint_type(),
            terminal_alias: self.endpoint.aliases(),
            gatekeeper_identifier,
            endpoint_vendor: self.endpoint.vendor(),
            time_to_live: self.config.requested_time_to_live(),
            keep_alive: false,
            endpoint_identifier: None,
            supports_alt_gk: self.config.supports_alternate_gatekeepers,
            security: SecurityTokens::default(),
        }
    }

    /// Keep-alive RRQ; `None` until a gatekeeper has issued us an identifier.
    fn lightweight_registration_request(&self) -> Option<RegistrationRequest> {
        let endpoint_identifier = self.lock().registration.endpoint_identifier.clone()?;
        let mut rrq = self.full_registration_request(self.current_gatekeeper_identifier());
        rrq.keep_alive = true;
        rrq.terminal_alias = Vec::new();
        rrq.endpoint_identifier = Some(endpoint_identifier);
        Some(rrq)
    }

    /// Forget the registration and its refresh schedule.
    pub(crate) fn reset_registration(&self) {
        {
            let mut state = self.lock();
            state.registration = Registration::default();
            state.timers.next_refresh = None;
            state.timers.next_status = None;
            state.timers.reregister_now = false;
        }
        self.metrics.registered.set(0);
        self.notify_scheduler();
    }

    // ── Unregistration ──────────────────────────────────────────────────

    pub(crate) async fn unregister(&self) -> Result<(), RasError> {
        let _cycle = self.registering.lock().await;
        let (endpoint_identifier, gatekeeper_identifier) = {
            let state = self.lock();
            (
                state.registration.endpoint_identifier.clone(),
                state.gatekeeper.as_ref().and_then(|g| g.identifier.clone()),
            )
        };
        let Some(endpoint_identifier) = endpoint_identifier else {
            self.reset_registration();
            return Err(RasError::NotRegistered);
        };
        let urq = UnregistrationRequest {
            seq: SequenceNumber::FIRST,
            call_signal_addresses: self.endpoint.call_signal_addresses(),
            endpoint_alias: self.endpoint.aliases(),
            endpoint_identifier: Some(endpoint_identifier),
            gatekeeper_identifier,
            reason: None,
            alternate_gatekeepers: Vec::new(),
            security: SecurityTokens::default(),
        };
        let outcome = self.make_request(urq).await;
        self.reset_registration();
        self.events.emit(&RasEvent::Unregistered);
        match outcome {
            Ok(Reply::Confirm(_)) => {
                info!("unregistered");
                Ok(())
            }
            Ok(Reply::Reject(urj)) => {
                warn!(reason = ?urj.reason, "unregistration rejected");
                Err(RasError::PermanentReject(RejectCause::Unregistration(
                    urj.reason,
                )))
            }
            Err(err) => {
                warn!(%err, "unregistration unanswered");
                Err(err)
            }
        }
    }
}

/// Interval for unsolicited status reports: the gatekeeper's ACF request
/// takes precedence over local configuration.
pub(crate) fn status_interval(
    config: &crate::config::RasConfig,
    gatekeeper_requested: Option<Duration>,
) -> Option<Duration> {
    gatekeeper_requested
        .filter(|d| !d.is_zero())
        .or_else(|| match config.status_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RasConfig;

    #[test]
    fn strategy_from_parts() {
        let addr: TransportAddress = "192.0.2.1:1719".parse().unwrap();
        let id = GatekeeperId::new("zone").unwrap();
        assert_eq!(DiscoveryStrategy::from_parts(None, None), DiscoveryStrategy::Broadcast);
        assert_eq!(
            DiscoveryStrategy::from_parts(Some(addr), None),
            DiscoveryStrategy::Direct(addr)
        );
        assert_eq!(
            DiscoveryStrategy::from_parts(None, Some(id.clone())),
            DiscoveryStrategy::Locate(id.clone())
        );
        assert_eq!(
            DiscoveryStrategy::from_parts(Some(addr), Some(id.clone())),
            DiscoveryStrategy::Pinned {
                address: addr,
                identifier: id
            }
        );
    }

    #[test]
    fn reject_classification() {
        use RegistrationRejectReason::*;
        assert_eq!(classify(&DiscoveryRequired), RejectHandling::Rediscover);
        assert_eq!(classify(&FullRegistrationRequired), RejectHandling::FullRegistration);
        assert_eq!(classify(&RegisterWithAssignedGk), RejectHandling::AssignedGatekeeper);
        assert_eq!(classify(&SecurityDenial), RejectHandling::Security);
        assert_eq!(classify(&DuplicateAlias(Vec::new())), RejectHandling::Terminal);
        assert_eq!(classify(&InvalidCallSignalAddress), RejectHandling::Terminal);
        assert_eq!(classify(&NeededFeatureNotSupported), RejectHandling::Terminal);
    }

    #[test]
    fn gatekeeper_status_rate_wins() {
        let config = RasConfig {
            status_interval_secs: 60,
            ..RasConfig::default()
        };
        assert_eq!(
            status_interval(&config, Some(Duration::from_secs(15))),
            Some(Duration::from_secs(15))
        );
        assert_eq!(status_interval(&config, None), Some(Duration::from_secs(60)));
        assert_eq!(status_interval(&RasConfig::default(), None), None);
    }
}
