//! Security and access tokens carried in RAS messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Timestamp, TypesError};

/// An ASN.1 object identifier in dotted form, e.g. `1.3.6.1.4.1.17090.0.5`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectIdentifier(String);

impl ObjectIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ObjectIdentifier {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.split('.').count() >= 2
            && s.split('.').all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()));
        if !valid {
            return Err(TypesError::InvalidOid(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-standard payload tagged by its own object identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonStandardData {
    pub oid: ObjectIdentifier,
    pub data: Vec<u8>,
}

/// H.235 `ClearToken`: an OID-tagged token with an optional non-standard payload.
///
/// Gatekeepers use these to hand out access tokens in AdmissionConfirm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearToken {
    pub token_oid: ObjectIdentifier,
    pub timestamp: Option<Timestamp>,
    pub sender_id: Option<String>,
    pub non_standard: Option<NonStandardData>,
}

impl ClearToken {
    pub fn new(token_oid: ObjectIdentifier) -> Self {
        Self {
            token_oid,
            timestamp: None,
            sender_id: None,
            non_standard: None,
        }
    }
}

/// H.235 Annex D style hashed crypto token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoToken {
    pub sender_id: String,
    pub timestamp: Timestamp,
    pub random: u32,
    /// HMAC over the token fields and the request sequence number.
    pub digest: Vec<u8>,
}
