//! General RTMP relay error type.

use crate::chunk::{ChunkReadError, ChunkWriteError};
use crate::command::CommandError;
use crate::handshake::Direction;

/// RTMP relay error.
#[derive(Debug, thiserror::Error)]
pub enum RtmpError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// One leg of the opaque handshake relay failed.
    #[error("{direction} handshake error: {source}")]
    Handshake {
        /// The direction the failing leg was copying in.
        direction: Direction,
        /// The underlying IO error.
        source: std::io::Error,
    },
    /// Chunk read error.
    #[error("chunk read error: {0}")]
    ChunkRead(#[from] ChunkReadError),
    /// Chunk write error.
    #[error("chunk write error: {0}")]
    ChunkWrite(#[from] ChunkWriteError),
    /// Command error.
    #[error("command error: {0}")]
    Command(#[from] CommandError),
}

impl RtmpError {
    /// Returns true if the error indicates that a peer has closed the connection.
    pub fn is_peer_closed(&self) -> bool {
        match self {
            Self::Io(err) | Self::Handshake { source: err, .. } => matches!(
                err.kind(),
                std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
