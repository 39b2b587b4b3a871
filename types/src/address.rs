//! RAS transport addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::TypesError;

/// Well-known UDP port for gatekeeper discovery (GRQ).
pub const RAS_DISCOVERY_PORT: u16 = 1718;

/// Well-known UDP port for unicast RAS traffic.
pub const RAS_PORT: u16 = 1719;

/// Multicast group gatekeepers listen on for discovery.
pub const DISCOVERY_MULTICAST: Ipv4Addr = Ipv4Addr::new(224, 0, 1, 41);

/// A transport address a RAS or call-signalling channel listens on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportAddress(SocketAddr);

impl TransportAddress {
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    pub fn from_ip(ip: IpAddr, port: u16) -> Self {
        Self(SocketAddr::new(ip, port))
    }

    /// The address gatekeeper discovery requests are sent to.
    pub fn discovery() -> Self {
        Self::from_ip(IpAddr::V4(DISCOVERY_MULTICAST), RAS_DISCOVERY_PORT)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }

    pub fn ip(&self) -> IpAddr {
        self.0.ip()
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }

    /// Whether the address is unspecified (`0.0.0.0` / `::`) and therefore
    /// cannot be used as a destination.
    pub fn is_unspecified(&self) -> bool {
        self.0.ip().is_unspecified()
    }
}

impl fmt::Display for TransportAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SocketAddr> for TransportAddress {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl FromStr for TransportAddress {
    type Err = TypesError;

    /// Parse `host:port`, or a bare IP which gets the default RAS port.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(Self(addr));
        }
        s.parse::<IpAddr>()
            .map(|ip| Self::from_ip(ip, RAS_PORT))
            .map_err(|_| TypesError::InvalidAddress(s.to_string()))
    }
}
