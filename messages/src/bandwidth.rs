//! Bandwidth change: BRQ / BCF / BRJ.

use h323_types::{
    Bandwidth, CallIdentifier, CallReference, ConferenceId, EndpointId, GatekeeperId,
    SequenceNumber,
};
use serde::{Deserialize, Serialize};

use crate::common::{AltGkInfo, SecurityTokens, UsageInformation};
use crate::reasons::BandwidthRejectReason;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthRequest {
    pub seq: SequenceNumber,
    pub endpoint_identifier: EndpointId,
    pub conference_id: ConferenceId,
    pub call_reference: CallReference,
    pub call_identifier: CallIdentifier,
    pub bandwidth: Bandwidth,
    pub answered_call: bool,
    pub gatekeeper_identifier: Option<GatekeeperId>,
    pub usage: Option<UsageInformation>,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthConfirm {
    pub seq: SequenceNumber,
    pub bandwidth: Bandwidth,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthReject {
    pub seq: SequenceNumber,
    pub reason: BandwidthRejectReason,
    pub allowed_bandwidth: Bandwidth,
    pub alt_gk_info: Option<AltGkInfo>,
    pub security: SecurityTokens,
}
