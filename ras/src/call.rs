//! The call-control layer's view of one call, as the admission, bandwidth
//! and disengage issuers need it.

use h323_messages::{CallModel, PerCallInfo, UsageInformation};
use h323_types::{Bandwidth, CallIdentifier, CallReference, ConferenceId};

/// What a call-scoped transaction ended with, reported back to the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallRasOutcome {
    Admitted { bandwidth: Bandwidth },
    AdmissionFailed(String),
    BandwidthChanged(Bandwidth),
    BandwidthFailed(String),
    /// `confirmed` is false when the gatekeeper rejected or never answered.
    Disengaged { confirmed: bool },
}

pub trait RasCall: Send + Sync {
    fn call_identifier(&self) -> CallIdentifier;
    fn conference_id(&self) -> ConferenceId;
    fn call_reference(&self) -> CallReference;

    /// We placed the call (as opposed to answering it).
    fn is_originator(&self) -> bool;

    fn bandwidth(&self) -> Bandwidth;
    fn set_bandwidth(&self, bandwidth: Bandwidth);

    fn usage(&self) -> UsageInformation {
        UsageInformation::default()
    }

    fn call_model(&self) -> CallModel {
        CallModel::Direct
    }

    fn on_ras_outcome(&self, _outcome: &CallRasOutcome) {}
}

/// Status summary of a call for an InfoRequestResponse.
pub fn per_call_info(call: &dyn RasCall) -> PerCallInfo {
    let usage = call.usage();
    PerCallInfo {
        call_reference: call.call_reference(),
        conference_id: call.conference_id(),
        call_identifier: call.call_identifier(),
        originator: call.is_originator(),
        bandwidth: call.bandwidth(),
        call_model: call.call_model(),
        usage: (!usage.is_empty()).then_some(usage),
    }
}
