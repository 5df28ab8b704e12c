use bytes::Bytes;

use crate::messages::MessageType;

/// The chunk stream id clients send the command flow on.
pub const COMMAND_CHUNK_STREAM_ID: u32 = 3;

/// The default chunk size is 128 bytes.
/// 5.4.1 "The maximum chunk size defaults to 128 bytes ..."
pub const INIT_CHUNK_SIZE: usize = 128;

#[derive(Debug, PartialEq, Eq, Clone, Copy, num_derive::FromPrimitive, Hash)]
#[repr(u8)]
/// A chunk type represents the format of the chunk header.
pub enum ChunkType {
    /// Chunk type 0 - 5.3.1.2.1
    Type0 = 0,
    /// Chunk type 1 - 5.3.1.2.2
    Type1 = 1,
    /// Chunk type 2 - 5.3.1.2.3
    Type2 = 2,
    /// Chunk type 3 - 5.3.1.2.4
    Type3 = 3,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
/// A chunk basic header.
pub struct ChunkBasicHeader {
    /// The format of the chunk header.
    ///
    /// The relay re-emits every message with the format its first chunk
    /// arrived in, so this is kept around rather than normalized to type 0.
    pub format: ChunkType, // 2 bits

    /// The chunk stream id.
    pub chunk_stream_id: u32, // 6 bits (1 or 2 extra bytes when >= 64)
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
/// A chunk message header.
pub struct ChunkMessageHeader {
    /// The timestamp (type 0) or timestamp delta (types 1 and 2) of the
    /// message, already resolved from the extended timestamp field when one
    /// was present.
    pub timestamp: u32,
    /// The length of the message payload.
    pub msg_length: u32, // 3 bytes
    /// The type of the message.
    pub msg_type_id: MessageType, // 1 byte
    /// The stream id of the message.
    pub msg_stream_id: u32, // 4 bytes, little endian
    /// Whether the wire encoding used the extended timestamp field.
    pub was_extended_timestamp: bool,
}

impl ChunkMessageHeader {
    /// Whether this header is written with the extended timestamp field.
    #[inline]
    pub fn is_extended_timestamp(&self) -> bool {
        self.was_extended_timestamp || self.timestamp >= 0xFFFFFF
    }
}

/// A complete RTMP message together with the header of the first chunk it
/// was carried in.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Chunk {
    /// The basic header of the chunk.
    pub basic_header: ChunkBasicHeader,
    /// The message header of the chunk.
    pub message_header: ChunkMessageHeader,
    /// The reassembled message payload.
    pub payload: Bytes,
}

impl Chunk {
    /// Helper function to create a new chunk with a type 0 header.
    pub fn new(chunk_stream_id: u32, timestamp: u32, msg_type_id: MessageType, msg_stream_id: u32, payload: Bytes) -> Self {
        Self {
            basic_header: ChunkBasicHeader {
                chunk_stream_id,
                format: ChunkType::Type0,
            },
            message_header: ChunkMessageHeader {
                timestamp,
                msg_length: payload.len() as u32,
                msg_type_id,
                msg_stream_id,
                was_extended_timestamp: false,
            },
            payload,
        }
    }
}
