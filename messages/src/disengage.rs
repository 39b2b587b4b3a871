//! Call release reporting: DRQ / DCF / DRJ.

use h323_types::{
    CallIdentifier, CallReference, ConferenceId, EndpointId, GatekeeperId, SequenceNumber,
};
use serde::{Deserialize, Serialize};

use crate::common::{AltGkInfo, SecurityTokens, UsageInformation};
use crate::reasons::{DisengageReason, DisengageRejectReason};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisengageRequest {
    pub seq: SequenceNumber,
    pub endpoint_identifier: EndpointId,
    pub conference_id: ConferenceId,
    pub call_reference: CallReference,
    pub disengage_reason: DisengageReason,
    pub call_identifier: CallIdentifier,
    pub gatekeeper_identifier: Option<GatekeeperId>,
    pub answered_call: bool,
    pub usage: Option<UsageInformation>,
    /// Q.931 release cause.
    pub termination_cause: Option<u8>,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisengageConfirm {
    pub seq: SequenceNumber,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisengageReject {
    pub seq: SequenceNumber,
    pub reason: DisengageRejectReason,
    pub alt_gk_info: Option<AltGkInfo>,
    pub security: SecurityTokens,
}
