//! The RAS message envelope.

use h323_types::SequenceNumber;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::admission::{AdmissionConfirm, AdmissionReject, AdmissionRequest};
use crate::bandwidth::{BandwidthConfirm, BandwidthReject, BandwidthRequest};
use crate::common::SecurityTokens;
use crate::discovery::{GatekeeperConfirm, GatekeeperReject, GatekeeperRequest};
use crate::disengage::{DisengageConfirm, DisengageReject, DisengageRequest};
use crate::info::{InfoRequest, InfoRequestAck, InfoRequestNak, InfoRequestResponse};
use crate::registration::{
    RegistrationConfirm, RegistrationReject, RegistrationRequest, UnregistrationConfirm,
    UnregistrationReject, UnregistrationRequest,
};
use crate::service::{RequestInProgress, ServiceControlIndication, ServiceControlResponse};

macro_rules! ras_messages {
    ($($variant:ident($ty:ty) => $abbrev:literal),* $(,)?) => {
        /// Any RAS message, tagged by its kind.
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
        pub enum RasMessage {
            $($variant($ty),)*
        }

        /// Discriminant of [`RasMessage`] without the payload.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum MessageKind {
            $($variant,)*
        }

        impl RasMessage {
            pub fn kind(&self) -> MessageKind {
                match self {
                    $(Self::$variant(_) => MessageKind::$variant,)*
                }
            }

            /// The `requestSeqNum` used to correlate requests and responses.
            pub fn sequence_number(&self) -> SequenceNumber {
                match self {
                    $(Self::$variant(m) => m.seq,)*
                }
            }

            pub fn set_sequence_number(&mut self, seq: SequenceNumber) {
                match self {
                    $(Self::$variant(m) => m.seq = seq,)*
                }
            }

            pub fn abbreviation(&self) -> &'static str {
                self.kind().abbreviation()
            }

            pub fn security(&self) -> &SecurityTokens {
                match self {
                    $(Self::$variant(m) => &m.security,)*
                }
            }

            pub fn security_mut(&mut self) -> &mut SecurityTokens {
                match self {
                    $(Self::$variant(m) => &mut m.security,)*
                }
            }
        }

        impl MessageKind {
            /// The conventional three or four letter abbreviation (`RRQ`, `ACF`...).
            pub fn abbreviation(&self) -> &'static str {
                match self {
                    $(Self::$variant => $abbrev,)*
                }
            }
        }

        $(
            impl From<$ty> for RasMessage {
                fn from(message: $ty) -> Self {
                    Self::$variant(message)
                }
            }
        )*
    };
}

ras_messages! {
    GatekeeperRequest(GatekeeperRequest) => "GRQ",
    GatekeeperConfirm(GatekeeperConfirm) => "GCF",
    GatekeeperReject(GatekeeperReject) => "GRJ",
    RegistrationRequest(RegistrationRequest) => "RRQ",
    RegistrationConfirm(RegistrationConfirm) => "RCF",
    RegistrationReject(RegistrationReject) => "RRJ",
    UnregistrationRequest(UnregistrationRequest) => "URQ",
    UnregistrationConfirm(UnregistrationConfirm) => "UCF",
    UnregistrationReject(UnregistrationReject) => "URJ",
    AdmissionRequest(AdmissionRequest) => "ARQ",
    AdmissionConfirm(AdmissionConfirm) => "ACF",
    AdmissionReject(AdmissionReject) => "ARJ",
    BandwidthRequest(BandwidthRequest) => "BRQ",
    BandwidthConfirm(BandwidthConfirm) => "BCF",
    BandwidthReject(BandwidthReject) => "BRJ",
    DisengageRequest(DisengageRequest) => "DRQ",
    DisengageConfirm(DisengageConfirm) => "DCF",
    DisengageReject(DisengageReject) => "DRJ",
    InfoRequest(InfoRequest) => "IRQ",
    InfoRequestResponse(InfoRequestResponse) => "IRR",
    InfoRequestAck(InfoRequestAck) => "IACK",
    InfoRequestNak(InfoRequestNak) => "INAK",
    ServiceControlIndication(ServiceControlIndication) => "SCI",
    ServiceControlResponse(ServiceControlResponse) => "SCR",
    RequestInProgress(RequestInProgress) => "RIP",
}

impl MessageKind {
    /// Requests a gatekeeper may send to an endpoint unprompted.
    ///
    /// The endpoint must answer these rather than correlate them with
    /// one of its own pending transactions.
    pub fn is_gatekeeper_initiated(&self) -> bool {
        matches!(
            self,
            Self::UnregistrationRequest | Self::InfoRequest | Self::ServiceControlIndication
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ucf(seq: u16) -> RasMessage {
        UnregistrationConfirm {
            seq: SequenceNumber::new(seq),
            security: SecurityTokens::default(),
        }
        .into()
    }

    #[test]
    fn kind_and_abbreviation() {
        let msg = ucf(7);
        assert_eq!(msg.kind(), MessageKind::UnregistrationConfirm);
        assert_eq!(msg.kind().to_string(), "UCF");
    }

    #[test]
    fn sequence_number_is_rewritable() {
        let mut msg = ucf(7);
        msg.set_sequence_number(SequenceNumber::new(9));
        assert_eq!(msg.sequence_number().value(), 9);
    }

    #[test]
    fn gatekeeper_initiated_kinds() {
        assert!(MessageKind::UnregistrationRequest.is_gatekeeper_initiated());
        assert!(MessageKind::InfoRequest.is_gatekeeper_initiated());
        assert!(!MessageKind::AdmissionConfirm.is_gatekeeper_initiated());
    }
}
