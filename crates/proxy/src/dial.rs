//! Dialer factory for the outbound leg.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;
use url::Url;

use crate::error::Error;

const DEFAULT_SOCKS_PORT: u16 = 1080;

/// A byte stream to the remote server, whatever it is tunneled through.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

/// Dials the remote server, either directly or through a SOCKS5 proxy.
///
/// Stateless, sessions may share one or build their own from their config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Dialer {
    /// Plain TCP.
    #[default]
    Direct,
    /// Tunnel through a SOCKS5 proxy, optionally authenticated.
    Socks5 {
        /// `host:port` of the proxy.
        proxy_addr: String,
        /// Username and password, when the proxy url carries userinfo.
        auth: Option<(String, String)>,
    },
}

impl Dialer {
    /// Build a dialer from an optional `socks5://[user:pass@]host:port` url.
    pub fn from_proxy_url(proxy: Option<&str>) -> Result<Self, Error> {
        let Some(raw) = proxy.filter(|raw| !raw.is_empty()) else {
            return Ok(Self::Direct);
        };

        let url = Url::parse(raw).map_err(|_| Error::InvalidProxy(raw.to_string()))?;

        if url.scheme() != "socks5" {
            return Err(Error::InvalidProxyScheme(url.scheme().to_string()));
        }

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| Error::InvalidProxy(raw.to_string()))?;
        let port = url.port().unwrap_or(DEFAULT_SOCKS_PORT);
        let proxy_addr = format!("{host}:{port}");

        // The userinfo is taken from the raw string: the url parser cannot
        // represent the difference between no password and an empty one.
        let auth = match raw_userinfo(raw) {
            Some(userinfo) => {
                let (username, password) = match userinfo.split_once(':') {
                    Some((_, "")) => return Err(Error::InvalidProxyAuth),
                    Some((username, password)) => (username, password),
                    None => (userinfo, ""),
                };
                if username.is_empty() {
                    return Err(Error::InvalidProxyAuth);
                }
                Some((username.to_string(), password.to_string()))
            }
            None => None,
        };

        Ok(Self::Socks5 { proxy_addr, auth })
    }

    /// Dial `addr` (`host:port`).
    pub async fn dial(&self, addr: &str) -> Result<Box<dyn AsyncStream>, Error> {
        match self {
            Self::Direct => {
                tracing::debug!(%addr, "dialing remote server");
                let stream = TcpStream::connect(addr).await.map_err(Error::ConnectRemoteServer)?;
                Ok(Box::new(stream))
            }
            Self::Socks5 { proxy_addr, auth } => {
                tracing::debug!(%addr, proxy = %proxy_addr, "dialing remote server through socks5");
                let stream = match auth {
                    Some((username, password)) => {
                        Socks5Stream::connect_with_password(proxy_addr.as_str(), addr, username, password).await
                    }
                    None => Socks5Stream::connect(proxy_addr.as_str(), addr).await,
                }
                .map_err(Error::CreateProxyDialer)?;
                Ok(Box::new(stream))
            }
        }
    }
}

/// The userinfo part of a url, straight from the raw string.
fn raw_userinfo(raw: &str) -> Option<&str> {
    let (_, rest) = raw.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    authority.rsplit_once('@').map(|(userinfo, _)| userinfo)
}
