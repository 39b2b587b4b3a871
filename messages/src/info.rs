//! Status reporting: IRQ / IRR / IACK / INAK.

use h323_types::{
    AliasAddress, Bandwidth, CallIdentifier, CallReference, ConferenceId, EndpointId,
    EndpointType, SequenceNumber, TransportAddress,
};
use serde::{Deserialize, Serialize};

use crate::common::{AltGkInfo, CallModel, SecurityTokens, UsageInformation};
use crate::reasons::InfoRequestNakReason;

/// Gatekeeper-initiated status query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRequest {
    pub seq: SequenceNumber,
    /// [`CallReference::ALL_CALLS`] asks about every active call.
    pub call_reference: CallReference,
    pub call_identifier: Option<CallIdentifier>,
    pub reply_address: Option<TransportAddress>,
    pub security: SecurityTokens,
}

/// Status of one active call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerCallInfo {
    pub call_reference: CallReference,
    pub conference_id: ConferenceId,
    pub call_identifier: CallIdentifier,
    pub originator: bool,
    pub bandwidth: Bandwidth,
    pub call_model: CallModel,
    pub usage: Option<UsageInformation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRequestResponse {
    pub seq: SequenceNumber,
    pub endpoint_type: EndpointType,
    pub endpoint_identifier: EndpointId,
    pub ras_address: TransportAddress,
    pub call_signal_addresses: Vec<TransportAddress>,
    pub endpoint_alias: Vec<AliasAddress>,
    pub per_call_info: Vec<PerCallInfo>,
    pub unsolicited: bool,
    /// Ask the gatekeeper to acknowledge with IACK/INAK.
    pub need_response: bool,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRequestAck {
    pub seq: SequenceNumber,
    pub security: SecurityTokens,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRequestNak {
    pub seq: SequenceNumber,
    pub reason: InfoRequestNakReason,
    pub alt_gk_info: Option<AltGkInfo>,
    pub security: SecurityTokens,
}
