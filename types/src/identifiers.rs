//! Identifiers: gatekeeper and endpoint IDs, sequence numbers, call and
//! conference GUIDs, call reference values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Textual identifier of a gatekeeper (its zone name).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GatekeeperId(String);

impl GatekeeperId {
    pub fn new(id: impl Into<String>) -> Result<Self, TypesError> {
        let id = id.into();
        if id.is_empty() || id.len() > 128 {
            return Err(TypesError::InvalidIdentifier(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GatekeeperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque endpoint identifier issued by the gatekeeper in a RegistrationConfirm.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointId(String);

impl EndpointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// RAS request sequence number (`requestSeqNum`, 1..=65535 on the wire).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(u16);

impl SequenceNumber {
    pub const FIRST: Self = Self(1);

    /// Build a sequence number; zero is not a valid wire value and maps to 1.
    pub fn new(value: u16) -> Self {
        Self(value.max(1))
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// The following sequence number, wrapping from 65535 back to 1.
    pub fn next(&self) -> Self {
        match self.0.wrapping_add(1) {
            0 => Self::FIRST,
            n => Self(n),
        }
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! guid_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name([u8; 16]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 16]);

            pub fn new(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            /// Generate a fresh random GUID.
            pub fn random() -> Self {
                Self(rand::random::<[u8; 16]>())
            }

            pub fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 16]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }
    };
}

guid_type!(
    /// Globally unique call identifier (`callIdentifier`).
    CallIdentifier
);
guid_type!(
    /// Globally unique conference identifier (`conferenceID`).
    ConferenceId
);

/// Q.931 call reference value, unique per endpoint for the life of a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallReference(u16);

impl CallReference {
    /// Call reference value meaning "no particular call" in an IRQ.
    pub const ALL_CALLS: Self = Self(0);

    pub fn new(value: u16) -> Self {
        Self(value & 0x7fff)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}
