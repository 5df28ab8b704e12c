use std::collections::HashMap;
use std::io;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use bytes::{Buf, BytesMut};

use super::define::{Chunk, ChunkBasicHeader, ChunkMessageHeader, ChunkType, INIT_CHUNK_SIZE};
use super::error::ChunkReadError;
use crate::messages::MessageType;

/// A chunk reader.
///
/// Incrementally decodes chunks out of a read buffer and reassembles them
/// into complete messages. The buffer is only consumed once an entire chunk
/// (header and data section) is available, so the caller can feed partial
/// network reads and retry.
///
/// The control phase of a publish session runs on a single chunk stream, so
/// only one message may be in flight at a time. A chunk for a different
/// chunk stream id while a message is partially reassembled is rejected
/// with [`ChunkReadError::MultiChunkStream`].
pub struct ChunkReader {
    chunk_size: usize,
    previous_headers: HashMap<u32, ChunkMessageHeader>,
    partial: Option<PartialMessage>,
}

/// Reassembly state for a fragmented message.
struct PartialMessage {
    basic_header: ChunkBasicHeader,
    message_header: ChunkMessageHeader,
    buffer: BytesMut,
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self {
            chunk_size: INIT_CHUNK_SIZE,
            previous_headers: HashMap::new(),
            partial: None,
        }
    }
}

impl ChunkReader {
    /// Set the chunk size.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size;
    }

    /// Returns true if a message is partially reassembled.
    pub fn is_reassembling(&self) -> bool {
        self.partial.is_some()
    }

    /// Read the next complete message out of `buffer`.
    ///
    /// Returns `Ok(None)` when the buffer does not hold enough data yet; any
    /// complete chunks that were consumed stay consumed, the incomplete tail
    /// is left in the buffer.
    pub fn read_chunk(&mut self, buffer: &mut BytesMut) -> Result<Option<Chunk>, ChunkReadError> {
        loop {
            let mut cursor = io::Cursor::new(&buffer[..]);
            match self.read_chunk_inner(&mut cursor) {
                Ok(complete) => {
                    let consumed = cursor.position() as usize;
                    buffer.advance(consumed);

                    if let Some(chunk) = complete {
                        return Ok(Some(chunk));
                    }
                    // A chunk of a fragmented message was consumed, the rest
                    // may already be buffered.
                }
                Err(ChunkReadError::Io(err)) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(err) => return Err(err),
            }
        }
    }

    fn read_chunk_inner(&mut self, cursor: &mut io::Cursor<&[u8]>) -> Result<Option<Chunk>, ChunkReadError> {
        let basic_header = Self::read_basic_header(cursor)?;

        if let Some(partial) = &self.partial {
            if partial.basic_header.chunk_stream_id != basic_header.chunk_stream_id {
                return Err(ChunkReadError::MultiChunkStream);
            }
        }

        let message_header = self.read_message_header(cursor, &basic_header)?;
        self.previous_headers.insert(basic_header.chunk_stream_id, message_header);

        // The data section length is governed by the header that started the
        // message, headers on continuation chunks only update the
        // inheritance state.
        let msg_length = match &self.partial {
            Some(partial) => partial.message_header.msg_length as usize,
            None => message_header.msg_length as usize,
        };
        let buffered = self.partial.as_ref().map_or(0, |partial| partial.buffer.len());
        let n = (msg_length - buffered).min(self.chunk_size);

        let start = cursor.position() as usize;
        if cursor.get_ref().len() - start < n {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        cursor.set_position((start + n) as u64);

        let mut partial = self.partial.take().unwrap_or_else(|| PartialMessage {
            basic_header,
            message_header,
            buffer: BytesMut::with_capacity(msg_length),
        });
        partial.buffer.extend_from_slice(&cursor.get_ref()[start..start + n]);

        if partial.buffer.len() == msg_length {
            Ok(Some(Chunk {
                basic_header: partial.basic_header,
                message_header: partial.message_header,
                payload: partial.buffer.freeze(),
            }))
        } else {
            self.partial = Some(partial);
            Ok(None)
        }
    }

    fn read_basic_header(cursor: &mut io::Cursor<&[u8]>) -> Result<ChunkBasicHeader, ChunkReadError> {
        let byte = cursor.read_u8()?;

        let format = match byte >> 6 {
            0 => ChunkType::Type0,
            1 => ChunkType::Type1,
            2 => ChunkType::Type2,
            _ => ChunkType::Type3,
        };

        let chunk_stream_id = match byte & 0x3F {
            0 => 64 + cursor.read_u8()? as u32,
            1 => {
                let first = cursor.read_u8()? as u32;
                let second = cursor.read_u8()? as u32;
                64 + first + second * 256
            }
            csid => csid as u32,
        };

        Ok(ChunkBasicHeader { format, chunk_stream_id })
    }

    fn read_message_header(
        &self,
        cursor: &mut io::Cursor<&[u8]>,
        basic_header: &ChunkBasicHeader,
    ) -> Result<ChunkMessageHeader, ChunkReadError> {
        let previous = || {
            self.previous_headers
                .get(&basic_header.chunk_stream_id)
                .copied()
                .ok_or(ChunkReadError::MissingPreviousChunkHeader(basic_header.chunk_stream_id))
        };

        match basic_header.format {
            ChunkType::Type0 => {
                let timestamp = cursor.read_u24::<BigEndian>()?;
                let msg_length = cursor.read_u24::<BigEndian>()?;
                let msg_type_id = MessageType(cursor.read_u8()?);
                let msg_stream_id = cursor.read_u32::<LittleEndian>()?;
                let (timestamp, was_extended_timestamp) = Self::resolve_extended_timestamp(cursor, timestamp)?;

                Ok(ChunkMessageHeader {
                    timestamp,
                    msg_length,
                    msg_type_id,
                    msg_stream_id,
                    was_extended_timestamp,
                })
            }
            ChunkType::Type1 => {
                let previous = previous()?;
                let timestamp = cursor.read_u24::<BigEndian>()?;
                let msg_length = cursor.read_u24::<BigEndian>()?;
                let msg_type_id = MessageType(cursor.read_u8()?);
                let (timestamp, was_extended_timestamp) = Self::resolve_extended_timestamp(cursor, timestamp)?;

                Ok(ChunkMessageHeader {
                    timestamp,
                    msg_length,
                    msg_type_id,
                    msg_stream_id: previous.msg_stream_id,
                    was_extended_timestamp,
                })
            }
            ChunkType::Type2 => {
                let previous = previous()?;
                let timestamp = cursor.read_u24::<BigEndian>()?;
                let (timestamp, was_extended_timestamp) = Self::resolve_extended_timestamp(cursor, timestamp)?;

                Ok(ChunkMessageHeader {
                    timestamp,
                    was_extended_timestamp,
                    ..previous
                })
            }
            ChunkType::Type3 => {
                let mut header = previous()?;

                // Messages whose header carried the extended timestamp
                // repeat the 4 extended bytes on every type 3 chunk.
                if header.was_extended_timestamp {
                    header.timestamp = cursor.read_u32::<BigEndian>()?;
                }

                Ok(header)
            }
        }
    }

    fn resolve_extended_timestamp(cursor: &mut io::Cursor<&[u8]>, timestamp: u32) -> Result<(u32, bool), ChunkReadError> {
        if timestamp == 0xFFFFFF {
            Ok((cursor.read_u32::<BigEndian>()?, true))
        } else {
            Ok((timestamp, false))
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    fn read_all(reader: &mut ChunkReader, bytes: &[u8]) -> Vec<Chunk> {
        let mut buffer = BytesMut::from(bytes);
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.read_chunk(&mut buffer).unwrap() {
            chunks.push(chunk);
        }
        assert!(buffer.is_empty());
        chunks
    }

    #[test]
    fn test_read_small_chunk() {
        let mut reader = ChunkReader::default();

        #[rustfmt::skip]
        let chunks = read_all(&mut reader, &[
            3, // chunk basic header - fmt: 0, csid: 3
            0x00, 0x00, 0x00, // timestamp
            0x00, 0x00, 0x04, // message length (4 bytes)
            0x14, // message type id (20, AMF0 command)
            0x00, 0x00, 0x00, 0x00, // message stream id
            0x01, 0x02, 0x03, 0x04, // payload
        ]);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].basic_header.format, ChunkType::Type0);
        assert_eq!(chunks[0].basic_header.chunk_stream_id, 3);
        assert_eq!(chunks[0].message_header.msg_type_id, MessageType::COMMAND_AMF0);
        assert_eq!(chunks[0].payload, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_read_fragmented_message() {
        let mut reader = ChunkReader::default();

        #[rustfmt::skip]
        let mut bytes = vec![
            3, // fmt: 0, csid: 3
            0x00, 0x00, 0x00, // timestamp
            0x00, 0x00, 0x81, // message length (129 bytes)
            0x14, // message type id
            0x00, 0x00, 0x00, 0x00, // message stream id
        ];
        bytes.extend(std::iter::repeat_n(0xAA, 128));
        bytes.push((0x03 << 6) | 3); // fmt: 3, csid: 3
        bytes.push(0xBB); // final payload byte

        let chunks = read_all(&mut reader, &bytes);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].payload.len(), 129);
        assert_eq!(chunks[0].payload[127], 0xAA);
        assert_eq!(chunks[0].payload[128], 0xBB);
        assert!(!reader.is_reassembling());
    }

    #[test]
    fn test_read_partial_buffer() {
        let mut reader = ChunkReader::default();

        #[rustfmt::skip]
        let bytes = [
            3, // fmt: 0, csid: 3
            0x00, 0x00, 0x00, // timestamp
            0x00, 0x00, 0x04, // message length
            0x14, // message type id
            0x00, 0x00, 0x00, 0x00, // message stream id
            0x01, 0x02, 0x03, 0x04, // payload
        ];

        let mut buffer = BytesMut::new();
        for byte in &bytes[..bytes.len() - 1] {
            buffer.extend_from_slice(&[*byte]);
            assert!(reader.read_chunk(&mut buffer).unwrap().is_none());
        }

        buffer.extend_from_slice(&bytes[bytes.len() - 1..]);
        let chunk = reader.read_chunk(&mut buffer).unwrap().expect("message complete");
        assert_eq!(chunk.payload, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_read_extended_csid() {
        let mut reader = ChunkReader::default();

        #[rustfmt::skip]
        let chunks = read_all(&mut reader, &[
            0, // fmt: 0, csid: 0 (one extra byte)
            0x0A, // extended csid (64 + 10)
            0x00, 0x00, 0x00,
            0x00, 0x00, 0x01,
            0x09,
            0x00, 0x00, 0x00, 0x00,
            0xFF,
            1, // fmt: 0, csid: 1 (two extra bytes)
            0x0A, 0x01, // extended csid (64 + 10 + 256)
            0x00, 0x00, 0x00,
            0x00, 0x00, 0x01,
            0x09,
            0x00, 0x00, 0x00, 0x00,
            0xFE,
        ]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].basic_header.chunk_stream_id, 74);
        assert_eq!(chunks[1].basic_header.chunk_stream_id, 330);
    }

    #[test]
    fn test_read_extended_timestamp() {
        let mut reader = ChunkReader::default();

        #[rustfmt::skip]
        let mut bytes = vec![
            3, // fmt: 0, csid: 3
            0xFF, 0xFF, 0xFF, // timestamp marker
            0x00, 0x00, 0x81, // message length (129 bytes)
            0x09, // message type id
            0x00, 0x00, 0x00, 0x00, // message stream id
            0x01, 0x00, 0x00, 0x00, // extended timestamp
        ];
        bytes.extend(std::iter::repeat_n(0x00, 128));
        bytes.push((0x03 << 6) | 3); // fmt: 3, csid: 3
        bytes.extend([0x01, 0x00, 0x00, 0x00]); // extended timestamp repeated
        bytes.push(0x42);

        let chunks = read_all(&mut reader, &bytes);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].message_header.timestamp, 0x01000000);
        assert!(chunks[0].message_header.was_extended_timestamp);
        assert_eq!(chunks[0].payload.len(), 129);
        assert_eq!(chunks[0].payload[128], 0x42);
    }

    #[test]
    fn test_read_format_inheritance() {
        let mut reader = ChunkReader::default();

        #[rustfmt::skip]
        let chunks = read_all(&mut reader, &[
            3, // fmt: 0, csid: 3
            0x00, 0x00, 0x01, // timestamp
            0x00, 0x00, 0x02, // message length
            0x14, // message type id
            0x05, 0x00, 0x00, 0x00, // message stream id (5)
            0x01, 0x02, // payload
            (0x01 << 6) | 3, // fmt: 1, csid: 3
            0x00, 0x00, 0x10, // timestamp delta
            0x00, 0x00, 0x01, // message length
            0x09, // message type id
            0xFF, // payload
            (0x02 << 6) | 3, // fmt: 2, csid: 3
            0x00, 0x00, 0x20, // timestamp delta
            0xFE, // payload
            (0x03 << 6) | 3, // fmt: 3, csid: 3
            0xFD, // payload
        ]);

        assert_eq!(chunks.len(), 4);

        assert_eq!(chunks[1].message_header.msg_stream_id, 5);
        assert_eq!(chunks[1].message_header.msg_type_id, MessageType::VIDEO);
        assert_eq!(chunks[1].message_header.timestamp, 0x10);

        assert_eq!(chunks[2].message_header.msg_length, 1);
        assert_eq!(chunks[2].message_header.msg_type_id, MessageType::VIDEO);
        assert_eq!(chunks[2].message_header.timestamp, 0x20);

        assert_eq!(chunks[3].message_header.timestamp, 0x20);
        assert_eq!(chunks[3].payload, vec![0xFD]);
    }

    #[test]
    fn test_read_missing_previous_header() {
        let mut reader = ChunkReader::default();
        let mut buffer = BytesMut::from(
            &[
                (0x01 << 6) | 3, // fmt: 1, csid: 3 with no previous chunk
                0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x09, 0xFF,
            ][..],
        );

        assert!(matches!(
            reader.read_chunk(&mut buffer),
            Err(ChunkReadError::MissingPreviousChunkHeader(3))
        ));
    }

    #[test]
    fn test_read_multi_chunk_stream_rejected() {
        let mut reader = ChunkReader::default();

        #[rustfmt::skip]
        let mut bytes = vec![
            3, // fmt: 0, csid: 3
            0x00, 0x00, 0x00,
            0x00, 0x00, 0x81, // message length (129, fragmented)
            0x14,
            0x00, 0x00, 0x00, 0x00,
        ];
        bytes.extend(std::iter::repeat_n(0x00, 128));
        // a chunk on csid 4 while csid 3 is mid-message
        bytes.extend([
            4, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x09, 0x00, 0x00, 0x00, 0x00, 0xFF,
        ]);

        let mut buffer = BytesMut::from(&bytes[..]);
        assert!(matches!(reader.read_chunk(&mut buffer), Err(ChunkReadError::MultiChunkStream)));
    }

    #[test]
    fn test_read_honors_chunk_size() {
        let mut reader = ChunkReader::default();
        reader.set_chunk_size(4096);

        #[rustfmt::skip]
        let mut bytes = vec![
            3, // fmt: 0, csid: 3
            0x00, 0x00, 0x00,
            0x00, 0x0B, 0xB8, // message length (3000 bytes)
            0x14,
            0x00, 0x00, 0x00, 0x00,
        ];
        bytes.extend(std::iter::repeat_n(0x55, 3000));

        let chunks = read_all(&mut reader, &bytes);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].payload.len(), 3000);
    }
}
