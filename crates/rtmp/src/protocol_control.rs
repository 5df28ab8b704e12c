//! Protocol control messages.
//!
//! The relay only interprets Set Chunk Size; all other protocol control
//! messages pass through untouched.

use byteorder::{BigEndian, ByteOrder};

use crate::chunk::ChunkReadError;

/// Set Chunk Size message (5.4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetChunkSize {
    /// The new chunk size.
    pub chunk_size: u32,
}

impl SetChunkSize {
    /// Reads a [`SetChunkSize`] from a message payload.
    ///
    /// The payload must be exactly 4 bytes and the size must fit in 31 bits
    /// and be non-zero, per 5.4.1.
    pub fn read(payload: &[u8]) -> Result<Self, ChunkReadError> {
        if payload.len() != 4 {
            return Err(ChunkReadError::InvalidSetChunkSizePayload(payload.len()));
        }

        let chunk_size = BigEndian::read_u32(payload);
        if chunk_size == 0 || chunk_size > 0x7FFFFFFF {
            return Err(ChunkReadError::InvalidChunkSize(chunk_size));
        }

        Ok(Self { chunk_size })
    }
}
