use std::sync::Arc;

use h323_types::{AliasAddress, EndpointType, TransportAddress, VendorIdentifier};

use crate::auth::AuthenticatorSet;
use crate::call::RasCall;

/// The local endpoint the engine registers on behalf of.
pub trait Endpoint: Send + Sync {
    fn aliases(&self) -> Vec<AliasAddress>;

    /// Q.931 call signalling addresses advertised in RRQ.
    fn call_signal_addresses(&self) -> Vec<TransportAddress>;

    fn endpoint_type(&self) -> EndpointType {
        EndpointType::Terminal
    }

    fn vendor(&self) -> VendorIdentifier {
        VendorIdentifier::default()
    }

    /// Calls reported in unsolicited and requested status responses.
    fn active_calls(&self) -> Vec<Arc<dyn RasCall>> {
        Vec::new()
    }

    /// Built once when the engine starts.
    fn authenticators(&self) -> AuthenticatorSet {
        AuthenticatorSet::empty()
    }
}
