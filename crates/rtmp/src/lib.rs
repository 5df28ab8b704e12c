//! RTMP chunk stream relay with publish command rewriting.
//!
//! This crate implements the protocol half of an RTMP forward proxy: the
//! opaque 3073 byte handshake relay, an incremental chunk codec for the
//! client to server control phase, an AMF0 command rewriter that replaces
//! the application name, stream key and play url of a publish session, and
//! the relay session that drives all of it over a pair of byte streams.
//!
//! The inbound side of a session is always plaintext RTMP. Whatever the
//! outbound side is wrapped in (TCP, SOCKS5, TLS) is the caller's business,
//! both endpoints only need to implement [`tokio::io::AsyncRead`] and
//! [`tokio::io::AsyncWrite`].
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]

pub mod chunk;
pub mod command;
pub mod error;
pub mod handshake;
pub mod messages;
pub mod protocol_control;
pub mod session;

pub use chunk::{Chunk, ChunkReader, ChunkWriter};
pub use command::{Command, RewriteOutcome, RewriteRules};
pub use error::RtmpError;
pub use handshake::{Direction, RTMP_HANDSHAKE_SIZE};
pub use messages::MessageType;
pub use session::RelaySession;
