//! A call that records what the engine told it.

use std::sync::Mutex;

use h323_messages::UsageInformation;
use h323_ras::{CallRasOutcome, RasCall};
use h323_types::{Bandwidth, CallIdentifier, CallReference, ConferenceId};

pub struct NullCall {
    call_identifier: CallIdentifier,
    conference_id: ConferenceId,
    call_reference: CallReference,
    originator: bool,
    bandwidth: Mutex<Bandwidth>,
    usage: Mutex<UsageInformation>,
    outcomes: Mutex<Vec<CallRasOutcome>>,
}

impl NullCall {
    /// An outgoing call with fresh random identifiers.
    pub fn outgoing(call_reference: u16, bandwidth: Bandwidth) -> Self {
        Self {
            call_identifier: CallIdentifier::random(),
            conference_id: ConferenceId::random(),
            call_reference: CallReference::new(call_reference),
            originator: true,
            bandwidth: Mutex::new(bandwidth),
            usage: Mutex::new(UsageInformation::default()),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    pub fn incoming(call_reference: u16, bandwidth: Bandwidth) -> Self {
        Self {
            originator: false,
            ..Self::outgoing(call_reference, bandwidth)
        }
    }

    pub fn set_usage(&self, usage: UsageInformation) {
        if let Ok(mut current) = self.usage.lock() {
            *current = usage;
        }
    }

    /// Every outcome reported so far, oldest first.
    pub fn outcomes(&self) -> Vec<CallRasOutcome> {
        self.outcomes.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl RasCall for NullCall {
    fn call_identifier(&self) -> CallIdentifier {
        self.call_identifier
    }

    fn conference_id(&self) -> ConferenceId {
        self.conference_id
    }

    fn call_reference(&self) -> CallReference {
        self.call_reference
    }

    fn is_originator(&self) -> bool {
        self.originator
    }

    fn bandwidth(&self) -> Bandwidth {
        self.bandwidth.lock().map(|b| *b).unwrap_or_default()
    }

    fn set_bandwidth(&self, bandwidth: Bandwidth) {
        if let Ok(mut current) = self.bandwidth.lock() {
            *current = bandwidth;
        }
    }

    fn usage(&self) -> UsageInformation {
        self.usage.lock().map(|u| u.clone()).unwrap_or_default()
    }

    fn on_ras_outcome(&self, outcome: &CallRasOutcome) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push(outcome.clone());
        }
    }
}
