//! Protocol version management.

/// H.225.0 protocol identifier advertised by this stack (version 4).
pub const H225_PROTOCOL_IDENTIFIER: &str = "0.0.8.2250.0.4";

/// Version byte prefixed to every frame produced by [`crate::BincodeCodec`].
pub const CODEC_VERSION: u8 = 1;

/// Minimum frame version [`crate::BincodeCodec`] still decodes.
pub const MIN_CODEC_VERSION: u8 = 1;

/// Check if a peer's frame version is decodable.
pub fn is_compatible(peer_version: u8) -> bool {
    (MIN_CODEC_VERSION..=CODEC_VERSION).contains(&peer_version)
}
