//! Remote url parsing.

use url::Url;

use crate::config::SessionConfig;
use crate::error::Error;

const SCHEME_RTMP: &str = "rtmp";
const SCHEME_RTMPS: &str = "rtmps";

const DEFAULT_RTMP_PORT: u16 = 1935;
const DEFAULT_RTMPS_PORT: u16 = 443;

/// Parse an RTMP(S) link and make the port explicit.
///
/// Returns the normalized url and whether the outbound leg uses TLS.
pub fn parse_link(link: &str) -> Result<(Url, bool), Error> {
    let mut url = Url::parse(link)?;

    // the url parser lowercases the scheme
    let use_tls = match url.scheme() {
        SCHEME_RTMPS => true,
        SCHEME_RTMP => false,
        scheme => return Err(Error::UnsupportedScheme(scheme.to_string())),
    };

    if url.port().is_none() {
        let port = if use_tls { DEFAULT_RTMPS_PORT } else { DEFAULT_RTMP_PORT };
        url.set_port(Some(port)).map_err(|()| Error::ExtractParams(link.to_string()))?;
    }

    Ok((url, use_tls))
}

/// The app name, stream name and play url of a remote target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkParams {
    /// First path segment.
    pub app_name: String,
    /// Second path segment, with the raw query appended verbatim. Some
    /// providers put per-stream tokens there.
    pub stream_name: String,
    /// The `host:port` of the target, used for `swfUrl`/`tcUrl`.
    pub play_url: String,
}

/// Extract the [`LinkParams`] out of a parsed remote url.
pub fn link_params(url: &Url) -> Result<LinkParams, Error> {
    let mut tail = url.path().to_string();
    if let Some(query) = url.query() {
        tail.push('?');
        tail.push_str(query);
    }

    let mut parts = tail.trim_matches('/').split('/').filter(|part| !part.is_empty());
    let (Some(app_name), Some(stream_name)) = (parts.next(), parts.next()) else {
        return Err(Error::ExtractParams(url.to_string()));
    };

    Ok(LinkParams {
        app_name: app_name.to_string(),
        stream_name: stream_name.to_string(),
        play_url: host_port(url)?,
    })
}

fn host_port(url: &Url) -> Result<String, Error> {
    let host = url.host_str().ok_or_else(|| Error::ExtractParams(url.to_string()))?;
    match url.port() {
        Some(port) => Ok(format!("{host}:{port}")),
        None => Ok(host.to_string()),
    }
}

/// Where one session connects to, derived from the session config after the
/// interceptor had its say.
#[derive(Debug, Clone)]
pub struct RemoteTarget {
    /// `host:port` to dial.
    pub addr: String,
    /// The hostname for SNI, without port or brackets.
    pub host: String,
    /// True iff the scheme is `rtmps`.
    pub use_tls: bool,
    /// The rewrite inputs.
    pub params: LinkParams,
}

impl RemoteTarget {
    /// Resolve the remote target of a session.
    pub fn resolve(config: &SessionConfig) -> Result<Self, Error> {
        let url = config
            .remote_url
            .as_ref()
            .ok_or_else(|| Error::ExtractParams("remote url is not set".to_string()))?;

        // Re-normalize, an interceptor may have swapped the url out.
        let (url, use_tls) = parse_link(url.as_str())?;
        let params = link_params(&url)?;

        let host = url
            .host_str()
            .ok_or_else(|| Error::ExtractParams(url.to_string()))?
            .trim_matches(['[', ']'])
            .to_string();

        Ok(Self {
            addr: params.play_url.clone(),
            host,
            use_tls,
            params,
        })
    }
}
