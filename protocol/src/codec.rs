//! Message codec: serialization of RAS records to datagrams.
//!
//! The real H.225.0 ASN.1 PER codec lives outside this workspace; anything
//! implementing [`RasCodec`] can be plugged into a transport.

use h323_messages::RasMessage;

use crate::version::{is_compatible, CODEC_VERSION};
use crate::ProtocolError;

/// Maximum RAS datagram size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Turns RAS records into bytes and back.
pub trait RasCodec: Send + Sync {
    fn encode(&self, message: &RasMessage) -> Result<Vec<u8>, ProtocolError>;
    fn decode(&self, data: &[u8]) -> Result<RasMessage, ProtocolError>;
}

/// Version-prefixed bincode framing, used between components of this
/// workspace and in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeCodec;

impl RasCodec for BincodeCodec {
    fn encode(&self, message: &RasMessage) -> Result<Vec<u8>, ProtocolError> {
        let body =
            bincode::serialize(message).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        let size = body.len() + 1;
        if size > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size,
                max: MAX_MESSAGE_SIZE,
            });
        }
        let mut frame = Vec::with_capacity(size);
        frame.push(CODEC_VERSION);
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    fn decode(&self, data: &[u8]) -> Result<RasMessage, ProtocolError> {
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: data.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let (&version, body) = data
            .split_first()
            .ok_or_else(|| ProtocolError::Malformed("empty datagram".into()))?;
        if !is_compatible(version) {
            return Err(ProtocolError::UnsupportedVersion(version));
        }
        bincode::deserialize(body).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}
