//! Mutable engine state, all behind the engine's single coarse lock.

use std::time::Duration;

use h323_types::{EndpointId, GatekeeperId, TransportAddress};
use tokio::time::Instant;

use crate::ledger::TransactionLedger;
use crate::roster::{AlternateGatekeeper, AlternateRoster};

/// The gatekeeper the transport is currently bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatekeeperIdentity {
    pub ras_address: TransportAddress,
    pub identifier: Option<GatekeeperId>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistrationState {
    #[default]
    Unregistered,
    Discovering,
    Registering,
    Registered,
    LightweightReregistering,
    LostRegistration,
}

/// Our registration with the current gatekeeper.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registration {
    pub endpoint_identifier: Option<EndpointId>,
    /// Granted lease; `None` or zero means no periodic refresh.
    pub lease: Option<Duration>,
    pub state: RegistrationState,
}

impl Registration {
    pub fn is_registered(&self) -> bool {
        matches!(
            self.state,
            RegistrationState::Registered | RegistrationState::LightweightReregistering
        ) && self.endpoint_identifier.is_some()
    }
}

/// How long after a confirm with lease `lease` the next refresh is due.
///
/// The deadband is subtracted to absorb latency, but never so much that the
/// refresh lands in the first half of the lease. Zero leases never refresh.
pub fn refresh_delay(lease: Duration, deadband: Duration) -> Option<Duration> {
    if lease.is_zero() {
        return None;
    }
    let half = lease / 2;
    let delay = lease.saturating_sub(deadband).max(half);
    Some(if delay.is_zero() { lease } else { delay })
}

/// Deadlines the background scheduler sleeps on.
#[derive(Debug, Default)]
pub struct SchedulerTimers {
    pub next_refresh: Option<Instant>,
    pub next_status: Option<Instant>,
    /// Re-register at the next wake regardless of `next_refresh`.
    pub reregister_now: bool,
}

impl SchedulerTimers {
    /// Earliest deadline, or `None` when nothing is scheduled.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.next_refresh, self.next_status) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Everything guarded by the coarse lock.
#[derive(Debug, Default)]
pub struct EngineState {
    pub gatekeeper: Option<GatekeeperIdentity>,
    pub registration: Registration,
    pub roster: AlternateRoster,
    pub assigned: Option<AlternateGatekeeper>,
    pub ledger: TransactionLedger,
    pub timers: SchedulerTimers,
    /// The bound gatekeeper was found through a GRQ/GCF exchange.
    pub discovery_complete: bool,
    /// The gatekeeper demanded a new discovery exchange before registering.
    pub discovery_required: bool,
    /// The next registration must be a full one.
    pub full_registration_required: bool,
    /// The current binding came from a failover walk, not discovery.
    pub using_alternate: bool,
    /// The gatekeeper acknowledges unsolicited IRRs.
    pub will_respond_to_irr: bool,
    /// Status report rate requested by the gatekeeper in an ACF.
    pub gatekeeper_irr_interval: Option<Duration>,
    pub closed: bool,
}
