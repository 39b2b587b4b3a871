//! Service control (SCI / SCR) and request-in-progress (RIP).

use h323_types::{CallIdentifier, EndpointId, NonStandardData, SequenceNumber};
use serde::{Deserialize, Serialize};

use crate::common::SecurityTokens;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceControlReason {
    Open,
    Refresh,
    Close,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceControlContent {
    Url(String),
    Signal(Vec<u8>),
    NonStandard(NonStandardData),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceControlSession {
    pub session_id: u8,
    pub content: Option<ServiceControlContent>,
    pub reason: ServiceControlReason,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceControlIndication {
    pub seq: SequenceNumber,
    pub sessions: Vec<ServiceControlSession>,
    pub endpoint_identifier: Option<EndpointId>,
    pub call_identifier: Option<CallIdentifier>,
    pub security: SecurityTokens,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceControlResult {
    Started,
    Failed,
    Stopped,
    NotAvailable,
    NeededFeatureNotSupported,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceControlResponse {
    pub seq: SequenceNumber,
    pub result: Option<ServiceControlResult>,
    pub security: SecurityTokens,
}

/// Sent by a gatekeeper that needs more time before it can answer `seq`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInProgress {
    pub seq: SequenceNumber,
    pub delay_ms: u16,
    pub security: SecurityTokens,
}
