//! Endpoint descriptor carried in discovery and registration requests.

use serde::{Deserialize, Serialize};

/// The kind of H.323 entity registering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointType {
    #[default]
    Terminal,
    Gateway,
    Mcu,
}

/// Vendor identification (`endpointVendor`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VendorIdentifier {
    /// T.35 country code.
    pub t35_country_code: u8,
    pub manufacturer_code: u16,
    pub product_id: String,
    pub version_id: String,
}

impl Default for VendorIdentifier {
    fn default() -> Self {
        Self {
            t35_country_code: 0xb5,
            manufacturer_code: 0,
            product_id: "h323-ras".to_string(),
            version_id: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
