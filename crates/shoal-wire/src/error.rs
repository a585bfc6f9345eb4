use shoal_core::RemoteError;
use thiserror::Error;

/// Transport and serialization failures for server exchanges.
#[derive(Debug, Error)]
pub enum WireError {
    /// Underlying socket I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Request/response encoding failed.
    #[error("failed to encode json payload: {0}")]
    Encode(String),
    /// Request/response decoding failed.
    #[error("failed to decode json payload: {0}")]
    Decode(String),
    /// Exchange exceeded configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Frame size exceeded maximum allowed payload.
    #[error("frame too large: {size} > {max}")]
    FrameTooLarge { size: usize, max: usize },
    /// Server closed the connection mid-exchange.
    #[error("server disconnected")]
    Disconnected,
    /// Operation requires an open connection.
    #[error("not connected")]
    NotConnected,
    /// Server rejected the submitted credentials.
    #[error("handshake rejected: {0}")]
    HandshakeRejected(RemoteError),
    /// Server acknowledged the handshake with an unknown payload.
    #[error("unexpected handshake reply: {0}")]
    UnexpectedHandshake(String),
}
