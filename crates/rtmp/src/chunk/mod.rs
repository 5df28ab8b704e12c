mod define;
mod error;
mod reader;
mod writer;

pub use self::define::{COMMAND_CHUNK_STREAM_ID, Chunk, ChunkBasicHeader, ChunkMessageHeader, ChunkType, INIT_CHUNK_SIZE};
pub use self::error::{ChunkReadError, ChunkWriteError};
pub use self::reader::ChunkReader;
pub use self::writer::ChunkWriter;
