//! The relay session.
//!
//! Drives one client connection against one server connection through the
//! three phases of a proxied publish session: the opaque handshake relay,
//! the control phase with command rewriting, and the raw relay that follows
//! the publish command.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::chunk::{Chunk, ChunkReader, ChunkWriter};
use crate::command::{Command, RewriteOutcome, RewriteRules};
use crate::error::RtmpError;
use crate::handshake::{self, Direction, RTMP_HANDSHAKE_SIZE};
use crate::messages::MessageType;
use crate::protocol_control::SetChunkSize;

/// A relay session between one client and one server connection.
///
/// The session owns both connections for its whole lifetime. Dropping it
/// (or letting [`run`](RelaySession::run) return) closes both exactly once.
pub struct RelaySession<C, S> {
    client_read: ReadHalf<C>,
    client_write: WriteHalf<C>,
    server_read: ReadHalf<S>,
    server_write: WriteHalf<S>,
    control: ControlRelay,
}

/// The client to server control phase: reassemble, rewrite, re-chunk.
struct ControlRelay {
    rules: RewriteRules,
    chunk_reader: ChunkReader,
    chunk_writer: ChunkWriter,
    read_buf: BytesMut,
    write_buf: Vec<u8>,
}

impl<C, S> RelaySession<C, S>
where
    C: AsyncRead + AsyncWrite,
    S: AsyncRead + AsyncWrite,
{
    /// Create a new session over a client and a server connection.
    pub fn new(client: C, server: S, rules: RewriteRules) -> Self {
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);

        Self {
            client_read,
            client_write,
            server_read,
            server_write,
            control: ControlRelay {
                rules,
                chunk_reader: ChunkReader::default(),
                chunk_writer: ChunkWriter::default(),
                read_buf: BytesMut::new(),
                write_buf: Vec::new(),
            },
        }
    }

    /// Relay the opaque handshake, 3073 bytes in each direction.
    ///
    /// Both legs run concurrently, the packets of the two peers depend on
    /// each other. The first leg to fail aborts the exchange.
    pub async fn handshake(&mut self) -> Result<(), RtmpError> {
        let client_to_server = async {
            handshake::copy_exact(&mut self.client_read, &mut self.server_write, RTMP_HANDSHAKE_SIZE)
                .await
                .map_err(|source| RtmpError::Handshake {
                    direction: Direction::ClientToServer,
                    source,
                })
        };
        let server_to_client = async {
            handshake::copy_exact(&mut self.server_read, &mut self.client_write, RTMP_HANDSHAKE_SIZE)
                .await
                .map_err(|source| RtmpError::Handshake {
                    direction: Direction::ServerToClient,
                    source,
                })
        };

        tokio::try_join!(client_to_server, server_to_client)?;

        tracing::debug!("handshake relayed");
        Ok(())
    }

    /// Run the relay to completion.
    ///
    /// The client to server direction is parsed and rewritten until the
    /// publish command has been forwarded, the server to client direction is
    /// copied verbatim throughout. When either leg finishes (EOF or error)
    /// both connections are shut down, which unblocks the other leg.
    pub async fn run(mut self) -> Result<(), RtmpError> {
        let result = tokio::select! {
            r = self.control.run(&mut self.client_read, &mut self.server_write) => r,
            r = relay_verbatim(&mut self.server_read, &mut self.client_write) => r,
        };

        let _ = self.server_write.shutdown().await;
        let _ = self.client_write.shutdown().await;

        result
    }
}

/// Copy one direction verbatim until EOF.
async fn relay_verbatim<R, W>(reader: &mut R, writer: &mut W) -> Result<(), RtmpError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tokio::io::copy(reader, writer).await.map(drop).map_err(RtmpError::Io)
}

impl ControlRelay {
    async fn run<R, W>(&mut self, src: &mut R, dst: &mut W) -> Result<(), RtmpError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            while let Some(chunk) = self.chunk_reader.read_chunk(&mut self.read_buf)? {
                let outcome = self.forward_message(chunk)?;
                dst.write_all(&self.write_buf).await?;
                self.write_buf.clear();

                if outcome == RewriteOutcome::Publish && !self.rules.force_handle {
                    tracing::debug!("publish forwarded, relaying raw");

                    // Anything already buffered past the publish command
                    // belongs to the raw phase.
                    dst.write_all(&self.read_buf).await?;
                    self.read_buf.clear();
                    dst.flush().await?;

                    tokio::io::copy(src, dst).await?;
                    return Ok(());
                }
            }

            dst.flush().await?;

            if src.read_buf(&mut self.read_buf).await? == 0 {
                // EOF in the middle of a message is not a clean close
                if self.chunk_reader.is_reassembling() || !self.read_buf.is_empty() {
                    return Err(RtmpError::Io(io::ErrorKind::UnexpectedEof.into()));
                }
                return Ok(());
            }
        }
    }

    /// Rewrite one reassembled message and queue it for the server.
    fn forward_message(&mut self, mut chunk: Chunk) -> Result<RewriteOutcome, RtmpError> {
        match chunk.message_header.msg_type_id {
            MessageType::SET_CHUNK_SIZE => {
                let msg = SetChunkSize::read(&chunk.payload)?;
                tracing::debug!(chunk_size = msg.chunk_size, "set chunk size");

                // Honored for our own reassembly and re-chunking, forwarded
                // unchanged.
                self.chunk_reader.set_chunk_size(msg.chunk_size as usize);
                self.chunk_writer.set_chunk_size(msg.chunk_size as usize);
                self.chunk_writer.write_chunk(&mut self.write_buf, chunk)?;

                Ok(RewriteOutcome::Forwarded)
            }
            MessageType::COMMAND_AMF0 => {
                let mut command = Command::read(&chunk.payload)?;
                let outcome = self.rules.apply(&mut command)?;

                chunk.payload = command.write()?.into();
                self.chunk_writer.write_chunk(&mut self.write_buf, chunk)?;

                Ok(outcome)
            }
            _ => {
                self.chunk_writer.write_chunk(&mut self.write_buf, chunk)?;
                Ok(RewriteOutcome::Forwarded)
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use bytes::Bytes;
    use rtmpproxy_amf0::{Amf0Encoder, Amf0Object, Amf0Value};
    use tokio::io::DuplexStream;

    use super::*;
    use crate::chunk::COMMAND_CHUNK_STREAM_ID;

    fn rules() -> RewriteRules {
        RewriteRules {
            app_name: "live".to_string(),
            stream_name: "newkey".to_string(),
            play_url: "origin.example:1935".to_string(),
            flash_ver: None,
            rtmp_type: None,
            force_handle: false,
        }
    }

    struct TestPeers {
        client: DuplexStream,
        server: DuplexStream,
        session: tokio::task::JoinHandle<Result<(), RtmpError>>,
    }

    /// Wire up a session over in-memory streams and relay the handshake.
    async fn start_session(rules: RewriteRules) -> TestPeers {
        let (client, proxy_client_end) = tokio::io::duplex(64 * 1024);
        let (server, proxy_server_end) = tokio::io::duplex(64 * 1024);

        let session = tokio::spawn(async move {
            let mut session = RelaySession::new(proxy_client_end, proxy_server_end, rules);
            session.handshake().await?;
            session.run().await
        });

        let mut peers = TestPeers { client, server, session };

        let c: Vec<u8> = (0..RTMP_HANDSHAKE_SIZE).map(|i| i as u8).collect();
        let s: Vec<u8> = (0..RTMP_HANDSHAKE_SIZE).map(|i| (i as u8).wrapping_add(7)).collect();

        peers.client.write_all(&c).await.unwrap();
        peers.server.write_all(&s).await.unwrap();

        let mut seen_c = vec![0u8; c.len()];
        peers.server.read_exact(&mut seen_c).await.unwrap();
        assert_eq!(seen_c, c, "client handshake bytes must arrive byte-exact");

        let mut seen_s = vec![0u8; s.len()];
        peers.client.read_exact(&mut seen_s).await.unwrap();
        assert_eq!(seen_s, s, "server handshake bytes must arrive byte-exact");

        peers
    }

    fn encode_command(name: &str, transaction_id: f64, args: &[Amf0Value]) -> Bytes {
        let mut payload = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut payload);
        encoder.encode_string(name).unwrap();
        encoder.encode_number(transaction_id).unwrap();
        for arg in args {
            encoder.encode_value(arg).unwrap();
        }
        payload.into()
    }

    async fn write_message(io: &mut DuplexStream, writer: &ChunkWriter, msg_type_id: MessageType, payload: Bytes) {
        let mut buf = Vec::new();
        writer
            .write_chunk(&mut buf, Chunk::new(COMMAND_CHUNK_STREAM_ID, 0, msg_type_id, 0, payload))
            .unwrap();
        io.write_all(&buf).await.unwrap();
    }

    async fn read_message(io: &mut DuplexStream, reader: &mut ChunkReader, buf: &mut BytesMut) -> Chunk {
        loop {
            if let Some(chunk) = reader.read_chunk(buf).expect("chunk stream intact") {
                return chunk;
            }
            assert_ne!(io.read_buf(buf).await.unwrap(), 0, "unexpected eof");
        }
    }

    #[tokio::test]
    async fn test_publish_flow_rewritten() {
        let mut peers = start_session(rules()).await;

        let client_writer = ChunkWriter::default();
        let mut server_reader = ChunkReader::default();
        let mut server_buf = BytesMut::new();

        // connect with fields pointing at the wrong place
        let connect_object: Amf0Object = vec![
            ("app".to_string(), Amf0Value::String("wrong".to_string())),
            ("flashVer".to_string(), Amf0Value::String("FMLE/3.0".to_string())),
            ("tcUrl".to_string(), Amf0Value::String("rtmp://x/y".to_string())),
        ]
        .into();
        write_message(
            &mut peers.client,
            &client_writer,
            MessageType::COMMAND_AMF0,
            encode_command("connect", 1.0, &[Amf0Value::Object(connect_object)]),
        )
        .await;

        let chunk = read_message(&mut peers.server, &mut server_reader, &mut server_buf).await;
        assert_eq!(chunk.message_header.msg_type_id, MessageType::COMMAND_AMF0);
        assert_eq!(chunk.message_header.msg_length as usize, chunk.payload.len());

        let connect = Command::read(&chunk.payload).unwrap();
        assert_eq!(connect.name, "connect");
        assert_eq!(connect.transaction_id, 1.0);
        let object = connect.args[0].as_object().unwrap();
        assert_eq!(object.get("app"), Some(&Amf0Value::String("live".to_string())));
        assert_eq!(
            object.get("swfUrl"),
            Some(&Amf0Value::String("origin.example:1935".to_string()))
        );
        assert_eq!(
            object.get("tcUrl"),
            Some(&Amf0Value::String("origin.example:1935".to_string()))
        );
        assert_eq!(object.get("flashVer"), Some(&Amf0Value::String("FMLE/3.0".to_string())));

        // a command the relay does not recognize passes through untouched
        let create_stream = encode_command("createStream", 4.0, &[Amf0Value::Null]);
        write_message(
            &mut peers.client,
            &client_writer,
            MessageType::COMMAND_AMF0,
            create_stream.clone(),
        )
        .await;
        let chunk = read_message(&mut peers.server, &mut server_reader, &mut server_buf).await;
        assert_eq!(chunk.payload, create_stream);

        // publish with a key long enough to be fragmented at the default
        // chunk size of 128
        let old_key = "o".repeat(150);
        write_message(
            &mut peers.client,
            &client_writer,
            MessageType::COMMAND_AMF0,
            encode_command(
                "publish",
                5.0,
                &[
                    Amf0Value::Null,
                    Amf0Value::String(old_key),
                    Amf0Value::String("live".to_string()),
                ],
            ),
        )
        .await;

        let chunk = read_message(&mut peers.server, &mut server_reader, &mut server_buf).await;
        let publish = Command::read(&chunk.payload).unwrap();
        assert_eq!(publish.name, "publish");
        assert_eq!(publish.args[1], Amf0Value::String("newkey".to_string()));

        // everything after publish is relayed raw, in order
        let media = [(0..=255u8).collect::<Vec<u8>>(), vec![0x42; 1000]].concat();
        peers.client.write_all(&media).await.unwrap();
        assert!(server_buf.is_empty());
        let mut seen = vec![0u8; media.len()];
        peers.server.read_exact(&mut seen).await.unwrap();
        assert_eq!(seen, media);

        // the server to client direction is verbatim the whole time
        peers.server.write_all(b"onStatus-blob").await.unwrap();
        let mut seen = [0u8; 13];
        peers.client.read_exact(&mut seen).await.unwrap();
        assert_eq!(&seen, b"onStatus-blob");

        // client hangs up, the session winds down cleanly
        drop(peers.client);
        peers.session.await.unwrap().unwrap();

        let mut rest = Vec::new();
        peers.server.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_set_chunk_size_mid_control() {
        let mut peers = start_session(rules()).await;

        let mut client_writer = ChunkWriter::default();
        let mut server_reader = ChunkReader::default();
        let mut server_buf = BytesMut::new();

        // typeId 1, 4096
        let mut buf = Vec::new();
        client_writer
            .write_chunk(
                &mut buf,
                Chunk::new(
                    2,
                    0,
                    MessageType::SET_CHUNK_SIZE,
                    0,
                    Bytes::from_static(&[0x00, 0x00, 0x10, 0x00]),
                ),
            )
            .unwrap();
        peers.client.write_all(&buf).await.unwrap();
        client_writer.set_chunk_size(4096);

        let chunk = read_message(&mut peers.server, &mut server_reader, &mut server_buf).await;
        assert_eq!(chunk.message_header.msg_type_id, MessageType::SET_CHUNK_SIZE);
        assert_eq!(chunk.payload, Bytes::from_static(&[0x00, 0x00, 0x10, 0x00]));
        server_reader.set_chunk_size(4096);

        // a ~3000 byte connect that fits a single chunk at the new size
        let connect_object: Amf0Object = vec![
            ("app".to_string(), Amf0Value::String("wrong".to_string())),
            ("pad".to_string(), Amf0Value::String("p".repeat(2900))),
        ]
        .into();
        write_message(
            &mut peers.client,
            &client_writer,
            MessageType::COMMAND_AMF0,
            encode_command("connect", 1.0, &[Amf0Value::Object(connect_object)]),
        )
        .await;

        let chunk = read_message(&mut peers.server, &mut server_reader, &mut server_buf).await;
        let connect = Command::read(&chunk.payload).unwrap();
        let object = connect.args[0].as_object().unwrap();
        assert_eq!(object.get("app"), Some(&Amf0Value::String("live".to_string())));
        assert_eq!(object.get("pad"), Some(&Amf0Value::String("p".repeat(2900))));

        drop(peers.client);
        peers.session.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_force_handle_keeps_parsing() {
        let mut rules = rules();
        rules.force_handle = true;
        let mut peers = start_session(rules).await;

        let client_writer = ChunkWriter::default();
        let mut server_reader = ChunkReader::default();
        let mut server_buf = BytesMut::new();

        write_message(
            &mut peers.client,
            &client_writer,
            MessageType::COMMAND_AMF0,
            encode_command("publish", 5.0, &[Amf0Value::Null, Amf0Value::String("oldkey".to_string())]),
        )
        .await;
        let chunk = read_message(&mut peers.server, &mut server_reader, &mut server_buf).await;
        assert_eq!(
            Command::read(&chunk.payload).unwrap().args[1],
            Amf0Value::String("newkey".to_string())
        );

        // still parsing: FCUnpublish after publish gets rewritten too
        write_message(
            &mut peers.client,
            &client_writer,
            MessageType::COMMAND_AMF0,
            encode_command("FCUnpublish", 6.0, &[Amf0Value::Null, Amf0Value::String("oldkey".to_string())]),
        )
        .await;
        let chunk = read_message(&mut peers.server, &mut server_reader, &mut server_buf).await;
        assert_eq!(
            Command::read(&chunk.payload).unwrap().args[1],
            Amf0Value::String("newkey".to_string())
        );

        drop(peers.client);
        peers.session.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_handshake_server_hangs_up() {
        let (mut client, proxy_client_end) = tokio::io::duplex(8 * 1024);
        let (mut server, proxy_server_end) = tokio::io::duplex(8 * 1024);

        let session = tokio::spawn(async move {
            let mut session = RelaySession::new(proxy_client_end, proxy_server_end, rules());
            session.handshake().await
        });

        client.write_all(&vec![3u8; RTMP_HANDSHAKE_SIZE as usize]).await.unwrap();
        server.write_all(&[3u8; 100]).await.unwrap();
        server.shutdown().await.unwrap();

        let err = session.await.unwrap().unwrap_err();
        match err {
            RtmpError::Handshake { direction, source } => {
                assert_eq!(direction, Direction::ServerToClient);
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            err => panic!("unexpected error: {err}"),
        }
    }

    #[tokio::test]
    async fn test_client_eof_mid_message_is_an_error() {
        let mut peers = start_session(rules()).await;

        // a chunk header announcing 100 bytes, followed by only 10
        #[rustfmt::skip]
        let mut partial = vec![
            3, // fmt: 0, csid: 3
            0x00, 0x00, 0x00, // timestamp
            0x00, 0x00, 0x64, // message length (100)
            0x14, // message type id
            0x00, 0x00, 0x00, 0x00, // message stream id
        ];
        partial.extend([0u8; 10]);

        peers.client.write_all(&partial).await.unwrap();
        drop(peers.client);

        let err = peers.session.await.unwrap().unwrap_err();
        assert!(matches!(err, RtmpError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }
}
