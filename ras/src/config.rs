//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use h323_types::{GatekeeperId, ObjectIdentifier, TransportAddress};

use crate::request::RequestClass;
use crate::RasError;

/// Timeout and transmission budget for one request class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// How long to wait for an answer after each transmission.
    pub timeout_ms: u64,
    /// Number of transmissions per gatekeeper, the first send included.
    pub retries: u32,
}

impl RetryPolicy {
    pub const fn new(timeout_ms: u64, retries: u32) -> Self {
        Self {
            timeout_ms,
            retries,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Worst-case time spent on one gatekeeper.
    pub fn budget(&self) -> Duration {
        self.timeout().saturating_mul(self.retries)
    }
}

/// Longest per-attempt timeout a policy may ask for (one hour).
pub const MAX_TIMEOUT_MS: u64 = 60 * 60 * 1000;

/// Per-class retry policies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_discovery_policy")]
    pub discovery: RetryPolicy,
    #[serde(default = "default_ras_policy")]
    pub registration: RetryPolicy,
    #[serde(default = "default_ras_policy")]
    pub unregistration: RetryPolicy,
    #[serde(default = "default_ras_policy")]
    pub admission: RetryPolicy,
    #[serde(default = "default_ras_policy")]
    pub bandwidth: RetryPolicy,
    #[serde(default = "default_ras_policy")]
    pub disengage: RetryPolicy,
    #[serde(default = "default_ras_policy")]
    pub info: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            discovery: default_discovery_policy(),
            registration: default_ras_policy(),
            unregistration: default_ras_policy(),
            admission: default_ras_policy(),
            bandwidth: default_ras_policy(),
            disengage: default_ras_policy(),
            info: default_ras_policy(),
        }
    }
}

/// Which gatekeeper to use. Both fields empty means broadcast discovery.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatekeeperConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
}

/// The `(token OID, payload OID)` pair that identifies an access token in an
/// AdmissionConfirm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenOids {
    pub token_oid: String,
    /// When absent, the whole non-standard payload of any token carrying
    /// `token_oid` is taken.
    #[serde(default)]
    pub payload_oid: Option<String>,
}

/// Configuration for a RAS engine.
///
/// Can be loaded from a TOML file via [`RasConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RasConfig {
    #[serde(default)]
    pub gatekeeper: GatekeeperConfig,

    /// Re-register automatically when the gatekeeper drops the registration.
    #[serde(default = "default_true")]
    pub auto_reregister: bool,

    /// Lease requested in RRQ, in seconds. Zero asks for no expiry.
    #[serde(default = "default_time_to_live")]
    pub time_to_live_secs: u32,

    /// Requested leases are never shorter than this.
    #[serde(default = "default_min_lease")]
    pub min_lease_secs: u32,

    /// Refresh this long before the granted lease runs out.
    #[serde(default = "default_deadband")]
    pub lease_deadband_secs: u32,

    /// Interval between unsolicited IRRs. Zero disables them unless a
    /// gatekeeper asks for a rate in an AdmissionConfirm.
    #[serde(default)]
    pub status_interval_secs: u32,

    /// Advertise support for alternate gatekeepers.
    #[serde(default = "default_true")]
    pub supports_alternate_gatekeepers: bool,

    #[serde(default)]
    pub access_token_oids: Option<AccessTokenOids>,

    #[serde(default)]
    pub retries: RetryConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_time_to_live() -> u32 {
    300
}

fn default_min_lease() -> u32 {
    30
}

fn default_deadband() -> u32 {
    10
}

fn default_discovery_policy() -> RetryPolicy {
    RetryPolicy::new(5_000, 2)
}

fn default_ras_policy() -> RetryPolicy {
    RetryPolicy::new(3_000, 2)
}

// ── Impl ───────────────────────────────────────────────────────────────

impl RasConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, RasError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RasError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, RasError> {
        let config: Self = toml::from_str(s).map_err(|e| RasError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, RasError> {
        toml::to_string_pretty(self).map_err(|e| RasError::Config(e.to_string()))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), RasError> {
        for class in RequestClass::ALL {
            let policy = self.policy(class);
            if policy.retries == 0 || policy.timeout_ms == 0 {
                return Err(RasError::Config(format!(
                    "{class:?} policy needs at least one transmission and a non-zero timeout"
                )));
            }
            if policy.timeout_ms > MAX_TIMEOUT_MS {
                return Err(RasError::Config(format!(
                    "{class:?} timeout of {}ms exceeds the {MAX_TIMEOUT_MS}ms limit",
                    policy.timeout_ms
                )));
            }
        }
        self.gatekeeper_address()?;
        self.gatekeeper_identifier()?;
        self.access_token_matcher()?;
        Ok(())
    }

    pub fn policy(&self, class: RequestClass) -> RetryPolicy {
        match class {
            RequestClass::Discovery => self.retries.discovery,
            RequestClass::Registration => self.retries.registration,
            RequestClass::Unregistration => self.retries.unregistration,
            RequestClass::Admission => self.retries.admission,
            RequestClass::Bandwidth => self.retries.bandwidth,
            RequestClass::Disengage => self.retries.disengage,
            RequestClass::Info => self.retries.info,
        }
    }

    /// Lease to request in an RRQ, raised to the configured floor.
    pub fn requested_time_to_live(&self) -> Option<u32> {
        match self.time_to_live_secs {
            0 => None,
            ttl => Some(ttl.max(self.min_lease_secs)),
        }
    }

    pub fn gatekeeper_address(&self) -> Result<Option<TransportAddress>, RasError> {
        self.gatekeeper
            .address
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().map_err(|e| RasError::Config(format!("{e}"))))
            .transpose()
    }

    pub fn gatekeeper_identifier(&self) -> Result<Option<GatekeeperId>, RasError> {
        self.gatekeeper
            .identifier
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| GatekeeperId::new(s).map_err(|e| RasError::Config(format!("{e}"))))
            .transpose()
    }

    pub(crate) fn access_token_matcher(
        &self,
    ) -> Result<Option<(ObjectIdentifier, Option<ObjectIdentifier>)>, RasError> {
        let Some(oids) = &self.access_token_oids else {
            return Ok(None);
        };
        let parse = |s: &str| {
            s.parse::<ObjectIdentifier>()
                .map_err(|e| RasError::Config(format!("access token: {e}")))
        };
        let token = parse(&oids.token_oid)?;
        let payload = oids.payload_oid.as_deref().map(parse).transpose()?;
        Ok(Some((token, payload)))
    }
}

impl Default for RasConfig {
    fn default() -> Self {
        Self {
            gatekeeper: GatekeeperConfig::default(),
            auto_reregister: default_true(),
            time_to_live_secs: default_time_to_live(),
            min_lease_secs: default_min_lease(),
            lease_deadband_secs: default_deadband(),
            status_interval_secs: 0,
            supports_alternate_gatekeepers: default_true(),
            access_token_oids: None,
            retries: RetryConfig::default(),
        }
    }
}
