//! Proxy error taxonomy.

use rtmpproxy_rtmp::RtmpError;

/// Errors surfaced by the proxy core.
///
/// Startup and configuration errors are fatal to the process, everything
/// else terminates only the session it happened in.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The proxy url has no usable host.
    #[error("invalid proxy address: {0}")]
    InvalidProxy(String),
    /// The proxy url scheme is not `socks5`.
    #[error("unsupported proxy scheme: {0}")]
    InvalidProxyScheme(String),
    /// The proxy url carries userinfo that cannot be used for
    /// username/password authentication.
    #[error("invalid proxy username or password")]
    InvalidProxyAuth,
    /// The SOCKS5 tunnel could not be established.
    #[error("failed to create proxy dialer: {0}")]
    CreateProxyDialer(#[source] tokio_socks::Error),
    /// The remote url scheme is not `rtmp` or `rtmps`.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    /// The remote url does not carry an app name and a stream name.
    #[error("failed to extract params from {0}")]
    ExtractParams(String),
    /// The remote url does not parse.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    /// The TCP connection to the remote server failed.
    #[error("failed to connect to remote server: {0}")]
    ConnectRemoteServer(#[source] std::io::Error),
    /// The remote hostname is not usable for SNI.
    #[error("invalid tls server name: {0}")]
    InvalidServerName(String),
    /// The TLS client handshake with the remote server failed.
    #[error("failed to establish tls: {0}")]
    EstablishTls(#[source] std::io::Error),
    /// The relay itself failed.
    #[error(transparent)]
    Rtmp(#[from] RtmpError),
    /// An interceptor hook rejected the session.
    #[error("interceptor {hook} failed: {source}")]
    Hook {
        /// The name of the hook that failed.
        hook: &'static str,
        /// The error the interceptor returned.
        #[source]
        source: anyhow::Error,
    },
}
