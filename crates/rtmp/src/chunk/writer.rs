use std::io;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use super::define::{Chunk, ChunkMessageHeader, ChunkType, INIT_CHUNK_SIZE};
use super::error::ChunkWriteError;

/// A chunk writer.
///
/// Re-encodes reassembled messages into a stream of chunks. The message is
/// written with the header format and chunk stream id its first chunk
/// arrived with, only the length field reflects the (possibly rewritten)
/// payload, and the data is re-split at the currently negotiated chunk size
/// with type 3 continuation headers.
pub struct ChunkWriter {
    chunk_size: usize,
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self {
            chunk_size: INIT_CHUNK_SIZE,
        }
    }
}

impl ChunkWriter {
    /// Set the chunk size.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size;
    }

    /// Internal function to write the basic header.
    #[inline]
    fn write_basic_header(io: &mut impl io::Write, fmt: ChunkType, csid: u32) -> Result<(), ChunkWriteError> {
        let fmt = fmt as u8;

        if csid >= 64 + 255 {
            io.write_u8((fmt << 6) | 1)?;
            let csid = csid - 64;

            let div = csid / 256;
            let rem = csid % 256;

            io.write_u8(rem as u8)?;
            io.write_u8(div as u8)?;
        } else if csid >= 64 {
            io.write_u8(fmt << 6)?;
            io.write_u8((csid - 64) as u8)?;
        } else {
            io.write_u8((fmt << 6) | csid as u8)?;
        }

        Ok(())
    }

    /// Internal function to write the message header for the chunk's format.
    #[inline]
    fn write_message_header(
        io: &mut impl io::Write,
        fmt: ChunkType,
        message_header: &ChunkMessageHeader,
    ) -> Result<(), ChunkWriteError> {
        let timestamp = if message_header.is_extended_timestamp() {
            0xFFFFFF
        } else {
            message_header.timestamp
        };

        match fmt {
            ChunkType::Type0 => {
                io.write_u24::<BigEndian>(timestamp)?;
                io.write_u24::<BigEndian>(message_header.msg_length)?;
                io.write_u8(message_header.msg_type_id.into())?;
                io.write_u32::<LittleEndian>(message_header.msg_stream_id)?;
            }
            ChunkType::Type1 => {
                io.write_u24::<BigEndian>(timestamp)?;
                io.write_u24::<BigEndian>(message_header.msg_length)?;
                io.write_u8(message_header.msg_type_id.into())?;
            }
            ChunkType::Type2 => {
                io.write_u24::<BigEndian>(timestamp)?;
            }
            ChunkType::Type3 => {}
        }

        if message_header.is_extended_timestamp() {
            Self::write_extended_timestamp(io, message_header.timestamp)?;
        }

        Ok(())
    }

    /// Internal function to write the extended timestamp.
    #[inline]
    fn write_extended_timestamp(io: &mut impl io::Write, timestamp: u32) -> Result<(), ChunkWriteError> {
        io.write_u32::<BigEndian>(timestamp)?;

        Ok(())
    }

    /// Write a chunk into some writer.
    pub fn write_chunk(&self, io: &mut impl io::Write, mut chunk_info: Chunk) -> Result<(), ChunkWriteError> {
        let fmt = chunk_info.basic_header.format;
        chunk_info.message_header.msg_length = chunk_info.payload.len() as u32;

        Self::write_basic_header(io, fmt, chunk_info.basic_header.chunk_stream_id)?;
        Self::write_message_header(io, fmt, &chunk_info.message_header)?;

        loop {
            let cur_payload_size = if chunk_info.payload.len() > self.chunk_size {
                self.chunk_size
            } else {
                chunk_info.payload.len()
            };

            let payload_bytes = chunk_info.payload.split_to(cur_payload_size);
            io.write_all(&payload_bytes[..])?;

            if chunk_info.payload.is_empty() {
                break;
            }

            Self::write_basic_header(io, ChunkType::Type3, chunk_info.basic_header.chunk_stream_id)?;

            if chunk_info.message_header.is_extended_timestamp() {
                Self::write_extended_timestamp(io, chunk_info.message_header.timestamp)?;
            }
        }

        Ok(())
    }
}
