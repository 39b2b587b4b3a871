//! Call bandwidth in H.225 units of 100 bit/s.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bandwidth as carried in ARQ/ACF/BRQ/BCF (units of 100 bit/s, both directions).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Bandwidth(u32);

impl Bandwidth {
    pub const ZERO: Self = Self(0);

    /// Build from raw H.225 units (100 bit/s).
    pub fn from_units(units: u32) -> Self {
        Self(units)
    }

    /// Build from kilobits per second.
    pub fn from_kbps(kbps: u32) -> Self {
        Self(kbps.saturating_mul(10))
    }

    pub fn units(&self) -> u32 {
        self.0
    }

    pub fn kbps(&self) -> u32 {
        self.0 / 10
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}kbps", self.kbps())
    }
}
