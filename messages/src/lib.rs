//! H.225.0 RAS message catalogue.
//!
//! Every RAS message is a plain structured record. Bit-level ASN.1 encoding
//! is owned by whichever [`RasCodec`](../h323_protocol/trait.RasCodec.html)
//! the transport is built with; these types only carry semantics.
//!
//! Each message carries a `seq` (the H.225 `requestSeqNum`) which responses
//! echo back so the client engine can correlate them.

pub mod admission;
pub mod bandwidth;
pub mod common;
pub mod discovery;
pub mod disengage;
pub mod info;
pub mod message;
pub mod reasons;
pub mod registration;
pub mod service;

pub use admission::{AdmissionConfirm, AdmissionReject, AdmissionRequest};
pub use bandwidth::{BandwidthConfirm, BandwidthReject, BandwidthRequest};
pub use common::{
    AltGkInfo, AlternateEndpoint, AlternateGatekeeperInfo, CallModel, CallType, SecurityTokens,
    UsageInformation,
};
pub use discovery::{GatekeeperConfirm, GatekeeperReject, GatekeeperRequest};
pub use disengage::{DisengageConfirm, DisengageReject, DisengageRequest};
pub use info::{InfoRequest, InfoRequestAck, InfoRequestNak, InfoRequestResponse, PerCallInfo};
pub use message::{MessageKind, RasMessage};
pub use reasons::{
    AdmissionRejectReason, BandwidthRejectReason, DisengageReason, DisengageRejectReason,
    GatekeeperRejectReason, InfoRequestNakReason, RegistrationRejectReason, UnregRejectReason,
    UnregRequestReason,
};
pub use registration::{
    RegistrationConfirm, RegistrationReject, RegistrationRequest, UnregistrationConfirm,
    UnregistrationReject, UnregistrationRequest,
};
pub use service::{
    RequestInProgress, ServiceControlContent, ServiceControlIndication, ServiceControlReason,
    ServiceControlResponse, ServiceControlResult, ServiceControlSession,
};
