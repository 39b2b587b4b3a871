use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unsupported codec version: {0}")]
    UnsupportedVersion(u8),

    #[error("message too large: {size} > {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("malformed message: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no remote gatekeeper bound")]
    NotBound,

    #[error("transport closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),

    #[error("codec error: {0}")]
    Codec(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
