//! UDP transport for the RAS client engine.
//!
//! [`UdpTransport`] owns one tokio socket. Outbound messages are encoded with
//! a pluggable [`h323_protocol::RasCodec`] and written without awaiting; a
//! background task decodes inbound datagrams and hands them to the engine.

pub mod error;
pub mod udp;

pub use error::NetworkError;
pub use udp::UdpTransport;
