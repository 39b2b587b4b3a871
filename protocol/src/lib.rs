//! Wire protocol seams: the codec that turns RAS records into datagrams and
//! the transport the client engine sends them over.

pub mod codec;
pub mod error;
pub mod transport;
pub mod version;

pub use codec::{BincodeCodec, RasCodec, MAX_MESSAGE_SIZE};
pub use error::{ProtocolError, TransportError};
pub use transport::{InboundHandler, RasTransport};
pub use version::{CODEC_VERSION, H225_PROTOCOL_IDENTIFIER};
