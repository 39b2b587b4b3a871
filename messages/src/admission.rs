//! Call admission: ARQ / ACF / ARJ.

use h323_types::{
    AliasAddress, Bandwidth, CallIdentifier, CallReference, ConferenceId, EndpointId,
    GatekeeperId, SequenceNumber, TransportAddress,
};
use serde::{Deserialize, Serialize};

use crate::common::{
    AltGkInfo, AlternateEndpoint, CallModel, CallType, SecurityTokens, UsageInformation,
};
use crate::reasons::AdmissionRejectReason;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRequest {
    pub seq: SequenceNumber,
    pub call_type: CallType,
    pub call_model: Option<CallModel>,
    pub endpoint_identifier: EndpointId,
    pub destination_info: Vec<AliasAddress>,
    pub dest_call_signal_address: Option<TransportAddress>,
    pub src_info: Vec<AliasAddress>,
    pub src_call_signal_address: Option<TransportAddress>,
    pub bandwidth: Bandwidth,
    pub call_reference: CallReference,
    pub conference_id: ConferenceId,
    pub call_identifier: CallIdentifier,
    /// True when admitting an incoming call.
    pub answer_call: bool,
    pub gatekeeper_identifier: Option<GatekeeperId>,
    pub usage: Option<UsageInformation>,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConfirm {
    pub seq: SequenceNumber,
    pub bandwidth: Bandwidth,
    pub call_model: CallModel,
    /// Where call signalling should go; may differ from what was asked for.
    pub dest_call_signal_address: Option<TransportAddress>,
    /// Seconds between IRRs the gatekeeper wants for this call.
    pub irr_frequency: Option<u16>,
    pub destination_info: Vec<AliasAddress>,
    pub alternate_endpoints: Vec<AlternateEndpoint>,
    pub will_respond_to_irr: bool,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionReject {
    pub seq: SequenceNumber,
    pub reason: AdmissionRejectReason,
    pub alt_gk_info: Option<AltGkInfo>,
    pub security: SecurityTokens,
}
