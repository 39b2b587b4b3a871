//! Typed request/response pairing for every transaction the engine issues.
//!
//! Each request type names the confirm and reject records that may answer
//! it, so a caller only ever sees the result shape of its own transaction.

use h323_messages::{
    AdmissionConfirm, AdmissionReject, AdmissionRequest, AltGkInfo, AlternateGatekeeperInfo,
    BandwidthConfirm, BandwidthReject, BandwidthRequest, DisengageConfirm, DisengageReject,
    DisengageRequest, GatekeeperConfirm, GatekeeperReject, GatekeeperRequest, InfoRequestAck,
    InfoRequestNak, InfoRequestResponse, MessageKind, RasMessage, RegistrationConfirm,
    RegistrationReject, RegistrationRequest, UnregistrationConfirm, UnregistrationReject,
    UnregistrationRequest,
};
use h323_types::{EndpointId, GatekeeperId, SequenceNumber};

/// Transaction classes, each with its own retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestClass {
    Discovery,
    Registration,
    Unregistration,
    Admission,
    Bandwidth,
    Disengage,
    Info,
}

impl RequestClass {
    pub const ALL: [RequestClass; 7] = [
        Self::Discovery,
        Self::Registration,
        Self::Unregistration,
        Self::Admission,
        Self::Bandwidth,
        Self::Disengage,
        Self::Info,
    ];

    /// Whether `kind` can answer a request of this class.
    pub fn accepts(&self, kind: MessageKind) -> bool {
        use MessageKind::*;
        match self {
            Self::Discovery => matches!(kind, GatekeeperConfirm | GatekeeperReject),
            Self::Registration => matches!(kind, RegistrationConfirm | RegistrationReject),
            Self::Unregistration => matches!(kind, UnregistrationConfirm | UnregistrationReject),
            Self::Admission => matches!(kind, AdmissionConfirm | AdmissionReject),
            Self::Bandwidth => matches!(kind, BandwidthConfirm | BandwidthReject),
            Self::Disengage => matches!(kind, DisengageConfirm | DisengageReject),
            Self::Info => matches!(kind, InfoRequestAck | InfoRequestNak),
        }
    }
}

/// A correlated answer to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply<C, R> {
    Confirm(C),
    Reject(R),
}

/// Gatekeeper a request is being (re)sent to, plus the endpoint identifier
/// it issued us, if any.
#[derive(Clone, Debug)]
pub struct Retarget<'a> {
    pub gatekeeper_identifier: Option<&'a GatekeeperId>,
    pub endpoint_identifier: Option<&'a EndpointId>,
}

/// A request the transaction executor can run.
pub trait RasRequest: Clone + Into<RasMessage> + Send + 'static {
    type Confirm: Send + 'static;
    type Reject: Send + 'static;

    const CLASS: RequestClass;

    fn set_sequence_number(&mut self, seq: SequenceNumber);

    /// Split a correlated response into this request's typed reply. Hands the
    /// message back if it is not one of ours.
    fn match_reply(message: RasMessage) -> Result<Reply<Self::Confirm, Self::Reject>, RasMessage>;

    /// Whether a correlated reply settles the transaction. Replies that do
    /// not are ignored and the wait continues.
    fn accepts_reply(&self, _reply: &Reply<Self::Confirm, Self::Reject>) -> bool {
        true
    }

    /// Refresh gatekeeper-specific fields before sending to another gatekeeper.
    fn retarget(&mut self, _target: &Retarget<'_>) {}

    /// Alternate list carried by a reply, with its permanence.
    fn reply_alternates(
        _reply: &Reply<Self::Confirm, Self::Reject>,
    ) -> Option<(&[AlternateGatekeeperInfo], bool)> {
        None
    }
}

fn alt_gk_info(info: &Option<AltGkInfo>) -> Option<(&[AlternateGatekeeperInfo], bool)> {
    info.as_ref()
        .map(|i| (i.alternate_gatekeepers.as_slice(), i.alt_gk_is_permanent))
}

macro_rules! match_reply {
    ($message:expr, $confirm:ident, $reject:ident) => {
        match $message {
            RasMessage::$confirm(c) => Ok(Reply::Confirm(c)),
            RasMessage::$reject(r) => Ok(Reply::Reject(r)),
            other => Err(other),
        }
    };
}

impl RasRequest for GatekeeperRequest {
    type Confirm = GatekeeperConfirm;
    type Reject = GatekeeperReject;
    const CLASS: RequestClass = RequestClass::Discovery;

    fn set_sequence_number(&mut self, seq: SequenceNumber) {
        self.seq = seq;
    }

    fn match_reply(message: RasMessage) -> Result<Reply<Self::Confirm, Self::Reject>, RasMessage> {
        match_reply!(message, GatekeeperConfirm, GatekeeperReject)
    }

    /// A GRQ naming a gatekeeper is only settled by that gatekeeper.
    fn accepts_reply(&self, reply: &Reply<Self::Confirm, Self::Reject>) -> bool {
        let Some(wanted) = &self.gatekeeper_identifier else {
            return true;
        };
        let answered_by = match reply {
            Reply::Confirm(gcf) => gcf.gatekeeper_identifier.as_ref(),
            Reply::Reject(grj) => grj.gatekeeper_identifier.as_ref(),
        };
        answered_by.map_or(true, |id| id == wanted)
    }

    fn reply_alternates(
        reply: &Reply<Self::Confirm, Self::Reject>,
    ) -> Option<(&[AlternateGatekeeperInfo], bool)> {
        match reply {
            Reply::Confirm(gcf) if !gcf.alternate_gatekeepers.is_empty() => {
                Some((gcf.alternate_gatekeepers.as_slice(), false))
            }
            Reply::Confirm(_) => None,
            Reply::Reject(grj) => alt_gk_info(&grj.alt_gk_info),
        }
    }
}

impl RasRequest for RegistrationRequest {
    type Confirm = RegistrationConfirm;
    type Reject = RegistrationReject;
    const CLASS: RequestClass = RequestClass::Registration;

    fn set_sequence_number(&mut self, seq: SequenceNumber) {
        self.seq = seq;
    }

    fn match_reply(message: RasMessage) -> Result<Reply<Self::Confirm, Self::Reject>, RasMessage> {
        match_reply!(message, RegistrationConfirm, RegistrationReject)
    }

    fn retarget(&mut self, target: &Retarget<'_>) {
        self.gatekeeper_identifier = target.gatekeeper_identifier.cloned();
    }

    fn reply_alternates(
        reply: &Reply<Self::Confirm, Self::Reject>,
    ) -> Option<(&[AlternateGatekeeperInfo], bool)> {
        match reply {
            Reply::Confirm(rcf) if !rcf.alternate_gatekeepers.is_empty() => {
                Some((rcf.alternate_gatekeepers.as_slice(), false))
            }
            Reply::Confirm(_) => None,
            Reply::Reject(rrj) => alt_gk_info(&rrj.alt_gk_info),
        }
    }
}

impl RasRequest for UnregistrationRequest {
    type Confirm = UnregistrationConfirm;
    type Reject = UnregistrationReject;
    const CLASS: RequestClass = RequestClass::Unregistration;

    fn set_sequence_number(&mut self, seq: SequenceNumber) {
        self.seq = seq;
    }

    fn match_reply(message: RasMessage) -> Result<Reply<Self::Confirm, Self::Reject>, RasMessage> {
        match_reply!(message, UnregistrationConfirm, UnregistrationReject)
    }

    fn retarget(&mut self, target: &Retarget<'_>) {
        self.gatekeeper_identifier = target.gatekeeper_identifier.cloned();
        self.endpoint_identifier = target.endpoint_identifier.cloned();
    }

    fn reply_alternates(
        reply: &Reply<Self::Confirm, Self::Reject>,
    ) -> Option<(&[AlternateGatekeeperInfo], bool)> {
        match reply {
            Reply::Confirm(_) => None,
            Reply::Reject(urj) => alt_gk_info(&urj.alt_gk_info),
        }
    }
}

impl RasRequest for AdmissionRequest {
    type Confirm = AdmissionConfirm;
    type Reject = AdmissionReject;
    const CLASS: RequestClass = RequestClass::Admission;

    fn set_sequence_number(&mut self, seq: SequenceNumber) {
        self.seq = seq;
    }

    fn match_reply(message: RasMessage) -> Result<Reply<Self::Confirm, Self::Reject>, RasMessage> {
        match_reply!(message, AdmissionConfirm, AdmissionReject)
    }

    fn retarget(&mut self, target: &Retarget<'_>) {
        self.gatekeeper_identifier = target.gatekeeper_identifier.cloned();
        if let Some(id) = target.endpoint_identifier {
            self.endpoint_identifier = id.clone();
        }
    }

    fn reply_alternates(
        reply: &Reply<Self::Confirm, Self::Reject>,
    ) -> Option<(&[AlternateGatekeeperInfo], bool)> {
        match reply {
            Reply::Confirm(_) => None,
            Reply::Reject(arj) => alt_gk_info(&arj.alt_gk_info),
        }
    }
}

impl RasRequest for BandwidthRequest {
    type Confirm = BandwidthConfirm;
    type Reject = BandwidthReject;
    const CLASS: RequestClass = RequestClass::Bandwidth;

    fn set_sequence_number(&mut self, seq: SequenceNumber) {
        self.seq = seq;
    }

    fn match_reply(message: RasMessage) -> Result<Reply<Self::Confirm, Self::Reject>, RasMessage> {
        match_reply!(message, BandwidthConfirm, BandwidthReject)
    }

    fn retarget(&mut self, target: &Retarget<'_>) {
        self.gatekeeper_identifier = target.gatekeeper_identifier.cloned();
        if let Some(id) = target.endpoint_identifier {
            self.endpoint_identifier = id.clone();
        }
    }

    fn reply_alternates(
        reply: &Reply<Self::Confirm, Self::Reject>,
    ) -> Option<(&[AlternateGatekeeperInfo], bool)> {
        match reply {
            Reply::Confirm(_) => None,
            Reply::Reject(brj) => alt_gk_info(&brj.alt_gk_info),
        }
    }
}

impl RasRequest for DisengageRequest {
    type Confirm = DisengageConfirm;
    type Reject = DisengageReject;
    const CLASS: RequestClass = RequestClass::Disengage;

    fn set_sequence_number(&mut self, seq: SequenceNumber) {
        self.seq = seq;
    }

    fn match_reply(message: RasMessage) -> Result<Reply<Self::Confirm, Self::Reject>, RasMessage> {
        match_reply!(message, DisengageConfirm, DisengageReject)
    }

    fn retarget(&mut self, target: &Retarget<'_>) {
        self.gatekeeper_identifier = target.gatekeeper_identifier.cloned();
        if let Some(id) = target.endpoint_identifier {
            self.endpoint_identifier = id.clone();
        }
    }

    fn reply_alternates(
        reply: &Reply<Self::Confirm, Self::Reject>,
    ) -> Option<(&[AlternateGatekeeperInfo], bool)> {
        match reply {
            Reply::Confirm(_) => None,
            Reply::Reject(drj) => alt_gk_info(&drj.alt_gk_info),
        }
    }
}

/// Unsolicited IRR sent with `need_response`, answered by IACK/INAK.
impl RasRequest for InfoRequestResponse {
    type Confirm = InfoRequestAck;
    type Reject = InfoRequestNak;
    const CLASS: RequestClass = RequestClass::Info;

    fn set_sequence_number(&mut self, seq: SequenceNumber) {
        self.seq = seq;
    }

    fn match_reply(message: RasMessage) -> Result<Reply<Self::Confirm, Self::Reject>, RasMessage> {
        match_reply!(message, InfoRequestAck, InfoRequestNak)
    }

    fn retarget(&mut self, target: &Retarget<'_>) {
        if let Some(id) = target.endpoint_identifier {
            self.endpoint_identifier = id.clone();
        }
    }
}
