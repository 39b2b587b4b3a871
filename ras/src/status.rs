//! Status reporting: InfoRequestResponse, solicited and unsolicited.

use tracing::{debug, warn};

use h323_messages::{
    InfoRequestNakReason, InfoRequestResponse, PerCallInfo, RasMessage, SecurityTokens,
};
use h323_types::{CallIdentifier, CallReference, SequenceNumber};

use crate::call::per_call_info;
use crate::engine::EngineInner;
use crate::error::{RasError, RejectCause};
use crate::request::Reply;

/// Which calls a status report covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CallFilter {
    All,
    Only {
        call_reference: CallReference,
        call_identifier: Option<CallIdentifier>,
    },
}

impl CallFilter {
    pub(crate) fn from_request(
        call_reference: CallReference,
        call_identifier: Option<CallIdentifier>,
    ) -> Self {
        if call_reference == CallReference::ALL_CALLS && call_identifier.is_none() {
            Self::All
        } else {
            Self::Only {
                call_reference,
                call_identifier,
            }
        }
    }

    fn matches(&self, info: &PerCallInfo) -> bool {
        match self {
            Self::All => true,
            Self::Only {
                call_identifier: Some(id),
                ..
            } => info.call_identifier == *id,
            Self::Only { call_reference, .. } => info.call_reference == *call_reference,
        }
    }
}

impl EngineInner {
    /// Build an IRR for the calls `filter` selects. `None` while unregistered.
    pub(crate) fn build_status(
        &self,
        seq: SequenceNumber,
        filter: CallFilter,
        unsolicited: bool,
    ) -> Option<InfoRequestResponse> {
        let endpoint_identifier = self.lock().registration.endpoint_identifier.clone()?;
        let per_call_info = self
            .endpoint
            .active_calls()
            .iter()
            .map(|call| per_call_info(call.as_ref()))
            .filter(|info| filter.matches(info))
            .collect();
        Some(InfoRequestResponse {
            seq,
            endpoint_type: self.endpoint.endpoint_type(),
            endpoint_identifier,
            ras_address: self.transport.local_address(),
            call_signal_addresses: self.endpoint.call_signal_addresses(),
            endpoint_alias: self.endpoint.aliases(),
            per_call_info,
            unsolicited,
            need_response: false,
            security: SecurityTokens::default(),
        })
    }

    /// Unsolicited IRR. Acknowledged as a transaction when the gatekeeper
    /// said it answers IRRs; fire-and-forget otherwise.
    pub(crate) async fn send_status_report(&self) -> Result<(), RasError> {
        let will_respond = self.lock().will_respond_to_irr;
        let Some(mut irr) = self.build_status(SequenceNumber::FIRST, CallFilter::All, true) else {
            return Err(RasError::NotRegistered);
        };
        let calls = irr.per_call_info.len();

        if !will_respond {
            irr.seq = self.lock().ledger.allocate();
            let mut message = RasMessage::from(irr);
            self.authenticators.prepare(&mut message);
            self.transport.send(&message)?;
            self.metrics.transmissions.with_label_values(&["IRR"]).inc();
            debug!(calls, "status report sent");
            return Ok(());
        }

        irr.need_response = true;
        match self.make_request(irr).await? {
            Reply::Confirm(_) => {
                debug!(calls, "status report acknowledged");
                Ok(())
            }
            Reply::Reject(nak) => {
                warn!(reason = ?nak.reason, "status report refused");
                if nak.reason == InfoRequestNakReason::NotRegistered {
                    self.lock().timers.reregister_now = true;
                    self.notify_scheduler();
                }
                Err(RasError::TransientReject(RejectCause::Info(nak.reason)))
            }
        }
    }
}
