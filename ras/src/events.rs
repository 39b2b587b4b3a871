//! Engine events for subscribers.

use std::sync::RwLock;

use h323_messages::{ServiceControlSession, UnregRequestReason};
use h323_types::{EndpointId, TransportAddress};

use crate::error::RejectCause;

/// RAS-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug)]
pub enum RasEvent {
    /// A gatekeeper answered discovery and is now bound.
    GatekeeperDiscovered {
        address: TransportAddress,
        identifier: Option<String>,
    },
    /// A registration (full or lightweight) was confirmed.
    Registered {
        endpoint_identifier: EndpointId,
        lightweight: bool,
    },
    /// A registration attempt ended in a reject.
    RegistrationRejected { cause: RejectCause },
    /// The gatekeeper dropped us, or a refresh went unanswered.
    RegistrationLost {
        reason: Option<UnregRequestReason>,
    },
    /// We unregistered.
    Unregistered,
    /// The transport was rebound to an alternate gatekeeper.
    FailedOver {
        from: Option<TransportAddress>,
        to: TransportAddress,
    },
    /// The failover walk ran out and the primary was rebound.
    PrimaryRestored { address: TransportAddress },
    /// A response failed security validation.
    AuthenticationFailed { reason: String },
    /// The gatekeeper opened, refreshed or closed a service control session.
    ServiceControl { sessions: Vec<ServiceControlSession> },
}

type Listener = Box<dyn Fn(&RasEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the emitting task; keep handlers fast and
/// never call back into the engine from one.
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: Listener) {
        let mut listeners = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.push(listener);
    }

    pub fn emit(&self, event: &RasEvent) {
        let listeners = match self.listeners.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for listener in listeners.iter() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.len())
            .finish()
    }
}
