use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ChunkReadError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unsupported multi chunk stream during the control phase")]
    MultiChunkStream,
    #[error("missing previous chunk header: {0}")]
    MissingPreviousChunkHeader(u32),
    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(u32),
    #[error("invalid set chunk size payload length: {0}")]
    InvalidSetChunkSizePayload(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum ChunkWriteError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
