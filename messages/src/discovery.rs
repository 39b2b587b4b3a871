//! Gatekeeper discovery: GRQ / GCF / GRJ.

use h323_types::{AliasAddress, EndpointType, GatekeeperId, SequenceNumber, TransportAddress};
use serde::{Deserialize, Serialize};

use crate::common::{AltGkInfo, AlternateGatekeeperInfo, SecurityTokens};
use crate::reasons::GatekeeperRejectReason;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatekeeperRequest {
    pub seq: SequenceNumber,
    /// Where the gatekeeper should send its answer.
    pub ras_address: TransportAddress,
    pub endpoint_type: EndpointType,
    /// When set, only the named gatekeeper should answer.
    pub gatekeeper_identifier: Option<GatekeeperId>,
    pub endpoint_alias: Vec<AliasAddress>,
    pub supports_alt_gk: bool,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatekeeperConfirm {
    pub seq: SequenceNumber,
    pub gatekeeper_identifier: Option<GatekeeperId>,
    pub ras_address: TransportAddress,
    pub alternate_gatekeepers: Vec<AlternateGatekeeperInfo>,
    pub assigned_gatekeeper: Option<AlternateGatekeeperInfo>,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatekeeperReject {
    pub seq: SequenceNumber,
    pub gatekeeper_identifier: Option<GatekeeperId>,
    pub reason: GatekeeperRejectReason,
    pub alt_gk_info: Option<AltGkInfo>,
    pub security: SecurityTokens,
}
