//! Alias addresses an endpoint is known by (E.164 numbers, H.323 IDs, URLs...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{TransportAddress, TypesError};

/// Characters allowed in an E.164 dialed-digits alias.
const DIALED_DIGIT_CHARS: &str = "0123456789#*,";

/// An alias address as carried in RAS messages.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AliasAddress {
    DialedDigits(String),
    H323Id(String),
    Url(String),
    Email(String),
    Transport(TransportAddress),
}

impl AliasAddress {
    /// Build an E.164 alias, rejecting characters outside `0-9 # * ,`.
    pub fn dialed_digits(digits: impl Into<String>) -> Result<Self, TypesError> {
        let digits = digits.into();
        if digits.is_empty() || !digits.chars().all(|c| DIALED_DIGIT_CHARS.contains(c)) {
            return Err(TypesError::InvalidAlias(digits));
        }
        Ok(Self::DialedDigits(digits))
    }

    pub fn h323_id(id: impl Into<String>) -> Self {
        Self::H323Id(id.into())
    }

    pub fn is_dialed_digits(&self) -> bool {
        matches!(self, Self::DialedDigits(_))
    }
}

impl fmt::Display for AliasAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DialedDigits(d) => write!(f, "{d}"),
            Self::H323Id(id) => write!(f, "{id}"),
            Self::Url(url) => write!(f, "url:{url}"),
            Self::Email(mail) => write!(f, "email:{mail}"),
            Self::Transport(addr) => write!(f, "ip:{addr}"),
        }
    }
}

impl FromStr for AliasAddress {
    type Err = TypesError;

    /// Parse an alias. Explicit `e164:`, `h323id:`, `url:`, `email:` and
    /// `ip:` prefixes select the kind; otherwise all-digit strings are E.164
    /// and everything else is an H.323 ID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(TypesError::InvalidAlias(String::new()));
        }
        if let Some((prefix, rest)) = s.split_once(':') {
            match prefix {
                "e164" => return Self::dialed_digits(rest),
                "h323id" => return Ok(Self::h323_id(rest)),
                "url" => return Ok(Self::Url(rest.to_string())),
                "email" => return Ok(Self::Email(rest.to_string())),
                "ip" => return rest.parse().map(Self::Transport),
                _ => {}
            }
        }
        if s.chars().all(|c| DIALED_DIGIT_CHARS.contains(c)) {
            return Ok(Self::DialedDigits(s.to_string()));
        }
        Ok(Self::H323Id(s.to_string()))
    }
}
