//! Fundamental types for the H.323 RAS stack.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! transport addresses, alias addresses, gatekeeper/endpoint identifiers,
//! call identifiers, bandwidth, timestamps and security tokens.

pub mod address;
pub mod alias;
pub mod bandwidth;
pub mod endpoint;
pub mod error;
pub mod identifiers;
pub mod time;
pub mod token;

pub use address::{TransportAddress, DISCOVERY_MULTICAST, RAS_DISCOVERY_PORT, RAS_PORT};
pub use alias::AliasAddress;
pub use bandwidth::Bandwidth;
pub use endpoint::{EndpointType, VendorIdentifier};
pub use error::TypesError;
pub use identifiers::{
    CallIdentifier, CallReference, ConferenceId, EndpointId, GatekeeperId, SequenceNumber,
};
pub use time::Timestamp;
pub use token::{ClearToken, CryptoToken, NonStandardData, ObjectIdentifier};
