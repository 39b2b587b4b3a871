//! Reject and release reasons.

use h323_types::AliasAddress;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatekeeperRejectReason {
    ResourceUnavailable,
    TerminalExcluded,
    InvalidRevision,
    UndefinedReason,
    SecurityDenial,
    GenericDataReason,
    NeededFeatureNotSupported,
    SecurityError,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationRejectReason {
    DiscoveryRequired,
    InvalidRevision,
    InvalidCallSignalAddress,
    InvalidRasAddress,
    DuplicateAlias(Vec<AliasAddress>),
    InvalidTerminalType,
    UndefinedReason,
    TransportNotSupported,
    TransportQosNotSupported,
    ResourceUnavailable,
    InvalidAlias,
    SecurityDenial,
    FullRegistrationRequired,
    AdditiveRegistrationNotSupported,
    InvalidTerminalAliases,
    GenericDataReason,
    NeededFeatureNotSupported,
    SecurityError,
    RegisterWithAssignedGk,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnregRequestReason {
    ReregistrationRequired,
    TtlExpired,
    SecurityDenial,
    UndefinedReason,
    Maintenance,
    SecurityError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnregRejectReason {
    NotCurrentlyRegistered,
    CallInProgress,
    UndefinedReason,
    PermissionDenied,
    SecurityDenial,
    SecurityError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionRejectReason {
    CalledPartyNotRegistered,
    InvalidPermission,
    RequestDenied,
    UndefinedReason,
    CallerNotRegistered,
    RouteCallToGatekeeper,
    InvalidEndpointIdentifier,
    ResourceUnavailable,
    SecurityDenial,
    QosControlNotSupported,
    IncompleteAddress,
    AliasesInconsistent,
    RouteCallToScn,
    ExceedsCallCapacity,
    CollectDestination,
    CollectPin,
    GenericDataReason,
    NeededFeatureNotSupported,
    SecurityError,
}

impl AdmissionRejectReason {
    /// Causes that mean the gatekeeper no longer knows this endpoint.
    pub fn is_registration_class(&self) -> bool {
        matches!(self, Self::CallerNotRegistered | Self::InvalidEndpointIdentifier)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandwidthRejectReason {
    NotBound,
    InvalidConferenceId,
    InvalidPermission,
    InsufficientResources,
    InvalidRevision,
    UndefinedReason,
    SecurityDenial,
    SecurityError,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisengageReason {
    ForcedDrop,
    #[default]
    NormalDrop,
    UndefinedReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisengageRejectReason {
    NotRegistered,
    RequestToDropOther,
    SecurityDenial,
    SecurityError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfoRequestNakReason {
    NotRegistered,
    SecurityDenial,
    UndefinedReason,
    SecurityError,
}
