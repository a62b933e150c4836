use std::net::SocketAddr;

/// Errors that can occur in Art-Net transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the UDP socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// An I/O error occurred on the socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The datagram is shorter than the Art-Net packet prefix.
    #[error("packet too short ({len} bytes, need at least {min})")]
    TooShort { len: usize, min: usize },

    /// The datagram does not start with `"Art-Net\0"`.
    #[error("invalid packet id (expected \"Art-Net\\0\")")]
    InvalidId,
}

pub type Result<T> = std::result::Result<T, TransportError>;
