//! Structures shared by several RAS messages.

use h323_types::{
    AliasAddress, ClearToken, CryptoToken, GatekeeperId, Timestamp, TransportAddress,
};
use serde::{Deserialize, Serialize};

/// `tokens` and `cryptoTokens` fields present on every RAS message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityTokens {
    pub clear: Vec<ClearToken>,
    pub crypto: Vec<CryptoToken>,
}

impl SecurityTokens {
    pub fn is_empty(&self) -> bool {
        self.clear.is_empty() && self.crypto.is_empty()
    }
}

/// One entry of a gatekeeper-pushed alternate list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateGatekeeperInfo {
    pub ras_address: TransportAddress,
    pub gatekeeper_identifier: Option<GatekeeperId>,
    /// The endpoint must register with this alternate before using it.
    pub need_to_register: bool,
    /// Lower values are tried first.
    pub priority: u8,
}

/// `altGKInfo` carried by rejects: an alternate list plus its permanence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltGkInfo {
    pub alternate_gatekeepers: Vec<AlternateGatekeeperInfo>,
    pub alt_gk_is_permanent: bool,
}

/// Alternate endpoint offered in an AdmissionConfirm for client-side fallback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateEndpoint {
    pub call_signal_addresses: Vec<TransportAddress>,
    pub aliases: Vec<AliasAddress>,
    pub tokens: Vec<ClearToken>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallModel {
    #[default]
    Direct,
    GatekeeperRouted,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallType {
    #[default]
    PointToPoint,
    OneToN,
    NToOne,
    NToN,
}

/// `RasUsageInformation`: call timing for accounting.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInformation {
    pub alerting_time: Option<Timestamp>,
    pub connect_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    /// Q.931 release-complete cause value.
    pub termination_cause: Option<u8>,
}

impl UsageInformation {
    pub fn is_empty(&self) -> bool {
        self.alerting_time.is_none()
            && self.connect_time.is_none()
            && self.end_time.is_none()
            && self.termination_cause.is_none()
    }
}
