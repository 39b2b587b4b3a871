//! Registration and unregistration: RRQ / RCF / RRJ and URQ / UCF / URJ.

use h323_types::{
    AliasAddress, EndpointId, EndpointType, GatekeeperId, SequenceNumber, TransportAddress,
    VendorIdentifier,
};
use serde::{Deserialize, Serialize};

use crate::common::{AltGkInfo, AlternateGatekeeperInfo, SecurityTokens};
use crate::reasons::{RegistrationRejectReason, UnregRejectReason, UnregRequestReason};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub seq: SequenceNumber,
    pub discovery_complete: bool,
    pub call_signal_addresses: Vec<TransportAddress>,
    pub ras_addresses: Vec<TransportAddress>,
    pub endpoint_type: EndpointType,
    /// Empty on a lightweight (keep-alive) registration.
    pub terminal_alias: Vec<AliasAddress>,
    pub gatekeeper_identifier: Option<GatekeeperId>,
    pub endpoint_vendor: VendorIdentifier,
    /// Requested lease in seconds.
    pub time_to_live: Option<u32>,
    pub keep_alive: bool,
    pub endpoint_identifier: Option<EndpointId>,
    pub supports_alt_gk: bool,
    pub security: SecurityTokens,
}

impl RegistrationRequest {
    pub fn is_lightweight(&self) -> bool {
        self.keep_alive
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationConfirm {
    pub seq: SequenceNumber,
    pub call_signal_addresses: Vec<TransportAddress>,
    pub terminal_alias: Vec<AliasAddress>,
    pub gatekeeper_identifier: Option<GatekeeperId>,
    pub endpoint_identifier: EndpointId,
    pub alternate_gatekeepers: Vec<AlternateGatekeeperInfo>,
    /// Granted lease in seconds; absent or zero disables keep-alive.
    pub time_to_live: Option<u32>,
    /// The gatekeeper acknowledges unsolicited IRRs with IACK/INAK.
    pub will_respond_to_irr: bool,
    pub assigned_gatekeeper: Option<AlternateGatekeeperInfo>,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReject {
    pub seq: SequenceNumber,
    pub reason: RegistrationRejectReason,
    pub gatekeeper_identifier: Option<GatekeeperId>,
    pub alt_gk_info: Option<AltGkInfo>,
    /// Set with [`RegistrationRejectReason::RegisterWithAssignedGk`].
    pub assigned_gatekeeper: Option<AlternateGatekeeperInfo>,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregistrationRequest {
    pub seq: SequenceNumber,
    pub call_signal_addresses: Vec<TransportAddress>,
    pub endpoint_alias: Vec<AliasAddress>,
    pub endpoint_identifier: Option<EndpointId>,
    pub gatekeeper_identifier: Option<GatekeeperId>,
    pub reason: Option<UnregRequestReason>,
    /// Only meaningful on a gatekeeper-initiated URQ.
    pub alternate_gatekeepers: Vec<AlternateGatekeeperInfo>,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregistrationConfirm {
    pub seq: SequenceNumber,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregistrationReject {
    pub seq: SequenceNumber,
    pub reason: UnregRejectReason,
    pub alt_gk_info: Option<AltGkInfo>,
    pub security: SecurityTokens,
}
