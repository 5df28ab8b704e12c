//! Session configuration.

use url::Url;

/// The mutable configuration a session runs with.
///
/// One base config is built from the command line at startup. Every session
/// gets its own clone, which is handed to each interceptor hook by mutable
/// reference; whatever an interceptor changes before
/// `before_establish_tcp_connection` returns is what the session dials.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Local TCP listen address.
    pub listen_addr: String,
    /// The RTMP(S) target url, with scheme and port normalized.
    ///
    /// May start out empty when a plugin supplies the target per session.
    pub remote_url: Option<Url>,
    /// Optional SOCKS5 proxy url for the outbound leg.
    pub proxy_url: Option<Url>,
    /// Skip TLS certificate verification on the outbound leg.
    pub insecure_skip_verify: bool,
    /// Keep parsing and rewriting commands after publish.
    pub force_handle: bool,
    /// Override for the `flashVer` key of the connect command.
    pub flash_ver: Option<String>,
    /// Value for the `rtmpType` key of the connect command.
    pub rtmp_type: Option<String>,
}
