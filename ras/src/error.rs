use std::fmt;

use h323_messages::{
    AdmissionRejectReason, BandwidthRejectReason, DisengageRejectReason, GatekeeperRejectReason,
    InfoRequestNakReason, RegistrationRejectReason, UnregRejectReason,
};
use h323_protocol::TransportError;
use h323_types::Bandwidth;
use thiserror::Error;

/// The reject a gatekeeper answered with, by transaction kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectCause {
    Discovery(GatekeeperRejectReason),
    Registration(RegistrationRejectReason),
    Unregistration(UnregRejectReason),
    Disengage(DisengageRejectReason),
    Info(InfoRequestNakReason),
}

impl fmt::Display for RejectCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery(r) => write!(f, "GRJ {r:?}"),
            Self::Registration(r) => write!(f, "RRJ {r:?}"),
            Self::Unregistration(r) => write!(f, "URJ {r:?}"),
            Self::Disengage(r) => write!(f, "DRJ {r:?}"),
            Self::Info(r) => write!(f, "INAK {r:?}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RasError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("no response from gatekeeper")]
    NoResponse,

    #[error("security denied: {0}")]
    SecurityDenied(String),

    #[error("registration lost: {0}")]
    RegistrationLost(String),

    #[error("permanent reject: {0}")]
    PermanentReject(RejectCause),

    #[error("transient reject: {0}")]
    TransientReject(RejectCause),

    #[error("call admission denied: {0:?}")]
    CallAdmissionDenied(AdmissionRejectReason),

    #[error("bandwidth change denied: {reason:?} (allowed {allowed})")]
    BandwidthDenied {
        reason: BandwidthRejectReason,
        allowed: Bandwidth,
    },

    #[error("endpoint is not registered")]
    NotRegistered,

    #[error("no gatekeeper available")]
    NoGatekeeper,

    #[error("engine is shutting down")]
    ShuttingDown,

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl RasError {
    /// Failures the failover walk may recover from by trying another gatekeeper.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::NoResponse | Self::Transport(_))
    }
}
