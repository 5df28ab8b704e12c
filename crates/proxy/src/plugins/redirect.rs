//! A plugin that pins each session to a remote target from its own
//! configuration instead of the `--remote` flag.
//!
//! The portable core of provider-specific plugins: whatever resolves the
//! ingest endpoint and stream key (a control API, a config file) ends up
//! doing exactly this with the result.

use std::sync::Arc;

use async_trait::async_trait;
use serde_derive::Deserialize;
use url::Url;

use super::{Interceptor, Plugin, PluginError};
use crate::config::SessionConfig;
use crate::dial::Dialer;
use crate::link;

#[derive(Debug, Deserialize)]
struct Config {
    /// The RTMP(S) url sessions are pointed at.
    remote: String,
    /// Optional SOCKS5 proxy override.
    #[serde(default)]
    proxy: Option<String>,
}

pub(super) struct RedirectPlugin;

impl Plugin for RedirectPlugin {
    fn name(&self) -> &'static str {
        "redirect"
    }

    fn configure(&self, config: &[u8], base: &mut SessionConfig) -> Result<Arc<dyn Interceptor>, PluginError> {
        let config: Config = serde_json::from_slice(config)?;

        // Validate at startup, not on the first session.
        let (remote_url, _) = link::parse_link(&config.remote).map_err(|err| PluginError::Rejected(err.to_string()))?;
        let proxy_url = config
            .proxy
            .as_deref()
            .map(|proxy| {
                Dialer::from_proxy_url(Some(proxy)).map_err(|err| PluginError::Rejected(err.to_string()))?;
                Url::parse(proxy).map_err(|err| PluginError::Rejected(err.to_string()))
            })
            .transpose()?;

        base.remote_url = Some(remote_url.clone());
        if proxy_url.is_some() {
            base.proxy_url = proxy_url.clone();
        }

        Ok(Arc::new(RedirectInterceptor { remote_url, proxy_url }))
    }
}

struct RedirectInterceptor {
    remote_url: Url,
    proxy_url: Option<Url>,
}

#[async_trait]
impl Interceptor for RedirectInterceptor {
    async fn before_establish_tcp_connection(&self, config: &mut SessionConfig) -> anyhow::Result<()> {
        config.remote_url = Some(self.remote_url.clone());
        if let Some(proxy_url) = &self.proxy_url {
            config.proxy_url = Some(proxy_url.clone());
        }
        Ok(())
    }
}
