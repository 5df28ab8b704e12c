//! The opaque RTMP handshake relay.
//!
//! The relay never interprets the handshake. Both peers exchange
//! C0+C1+C2 / S0+S1+S2 through it byte-exact, so the origin is free to run
//! simple or complex handshake verification against the client's bytes.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The number of handshake bytes each peer sends: a 1 byte version followed
/// by the 1536 byte C1/S1 and C2/S2 packets.
pub const RTMP_HANDSHAKE_SIZE: u64 = 1 + 1536 + 1536;

/// The direction a relay leg copies in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to server.
    ClientToServer,
    /// Server to client.
    ServerToClient,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::ClientToServer => write!(f, "client to server"),
            Direction::ServerToClient => write!(f, "server to client"),
        }
    }
}

/// Copy exactly `len` bytes from `reader` to `writer`.
///
/// Bytes are forwarded as they arrive. The handshake packets of both peers
/// depend on each other, so buffering a full direction before writing would
/// deadlock the exchange.
pub(crate) async fn copy_exact<R, W>(reader: &mut R, writer: &mut W, len: u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; 4096];
    let mut remaining = len as usize;

    while remaining > 0 {
        let to_read = buf.len().min(remaining);
        let n = reader.read(&mut buf[..to_read]).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }

        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
        remaining -= n;
    }

    Ok(())
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copy_exact() {
        let (mut near, mut far) = tokio::io::duplex(64);

        let handle = tokio::spawn(async move {
            let mut sink = io::Cursor::new(Vec::new());
            copy_exact(&mut far, &mut sink, 100).await.map(|()| sink.into_inner())
        });

        // drip-feed across several writes
        for chunk in vec![0xABu8; 100].chunks(7) {
            near.write_all(chunk).await.unwrap();
        }

        let sink = handle.await.unwrap().unwrap();
        assert_eq!(sink, vec![0xAB; 100]);
    }

    #[tokio::test]
    async fn test_copy_exact_short_read() {
        let (mut near, mut far) = tokio::io::duplex(64);

        let handle = tokio::spawn(async move {
            let mut sink = io::Cursor::new(Vec::new());
            copy_exact(&mut far, &mut sink, 100).await
        });

        near.write_all(&[0u8; 10]).await.unwrap();
        drop(near);

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
