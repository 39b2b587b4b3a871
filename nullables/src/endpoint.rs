//! A configurable local endpoint.

use std::sync::{Arc, Mutex};

use h323_ras::{AuthenticatorSet, Endpoint, RasCall};
use h323_types::{AliasAddress, TransportAddress};

/// An [`Endpoint`] whose aliases, signalling addresses and call list are
/// set directly by the test.
pub struct NullEndpoint {
    aliases: Vec<AliasAddress>,
    call_signal_addresses: Vec<TransportAddress>,
    calls: Mutex<Vec<Arc<dyn RasCall>>>,
    authenticators: AuthenticatorSet,
}

impl NullEndpoint {
    pub fn new(aliases: Vec<AliasAddress>, call_signal_addresses: Vec<TransportAddress>) -> Self {
        Self {
            aliases,
            call_signal_addresses,
            calls: Mutex::new(Vec::new()),
            authenticators: AuthenticatorSet::empty(),
        }
    }

    pub fn with_authenticators(mut self, authenticators: AuthenticatorSet) -> Self {
        self.authenticators = authenticators;
        self
    }

    pub fn add_call(&self, call: Arc<dyn RasCall>) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }
}

impl Endpoint for NullEndpoint {
    fn aliases(&self) -> Vec<AliasAddress> {
        self.aliases.clone()
    }

    fn call_signal_addresses(&self) -> Vec<TransportAddress> {
        self.call_signal_addresses.clone()
    }

    fn active_calls(&self) -> Vec<Arc<dyn RasCall>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn authenticators(&self) -> AuthenticatorSet {
        self.authenticators.clone()
    }
}
