//! The interceptor plugin registry.
//!
//! Plugins are compiled in and register themselves into the [`Registry`] at
//! startup; `--plugin name:{json}` picks one by name and hands it its JSON
//! configuration. The configured plugin returns an [`Interceptor`] whose
//! hooks run at four points of every session's lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SessionConfig;

#[cfg(feature = "plugin-redirect")]
mod redirect;

/// Plugin infrastructure errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("plugin {0} is already registered")]
    AlreadyRegistered(&'static str),
    #[error("plugin {0} is not available or not registered")]
    NotFound(String),
    #[error("invalid plugin format, use name:{{\"key\":\"value\"}}")]
    InvalidSpec,
    #[error("invalid plugin config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("{0}")]
    Rejected(String),
}

/// Session lifecycle hooks.
///
/// Hooks run on the session's own task and may block on external IO.
/// Sessions run concurrently, so an interceptor synchronizes its own state.
/// Every hook gets the session's mutable config; mutations made before
/// `before_establish_tcp_connection` returns steer that session's dial.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Called once, after the registry resolves and before the listener
    /// opens.
    async fn application_start(&self, _config: &mut SessionConfig) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called per session, before the remote server is dialed.
    async fn before_establish_tcp_connection(&self, _config: &mut SessionConfig) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called per session, after the opaque handshake relay completed.
    async fn after_rtmp_handshake(&self, _config: &mut SessionConfig) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called per session, after both connections are closed. Runs on every
    /// exit path, including failed ones.
    async fn after_close_tcp_connection(&self, _config: &mut SessionConfig) -> anyhow::Result<()> {
        Ok(())
    }
}

/// The no-op interceptor used when no plugin is configured.
pub struct DefaultInterceptor;

#[async_trait]
impl Interceptor for DefaultInterceptor {}

/// A named plugin factory.
pub trait Plugin: Send + Sync {
    /// The unique plugin name.
    fn name(&self) -> &'static str;

    /// Parse and validate the JSON configuration and build the interceptor.
    ///
    /// The base config may be adjusted here, before the listener opens.
    fn configure(&self, config: &[u8], base: &mut SessionConfig) -> Result<Arc<dyn Interceptor>, PluginError>;
}

/// The plugin registry.
///
/// Populated once at startup, read-only afterwards.
pub struct Registry {
    plugins: HashMap<&'static str, Box<dyn Plugin>>,
}

impl Registry {
    /// Build the registry of compiled-in plugins.
    pub fn builtin() -> Result<Self, PluginError> {
        let mut registry = Self {
            plugins: HashMap::new(),
        };

        registry.register(Box::new(test::TestPlugin))?;
        #[cfg(feature = "plugin-redirect")]
        registry.register(Box::new(redirect::RedirectPlugin))?;

        Ok(registry)
    }

    /// Register a plugin. Duplicate names are refused.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<(), PluginError> {
        let name = plugin.name();
        if self.plugins.contains_key(name) {
            return Err(PluginError::AlreadyRegistered(name));
        }

        self.plugins.insert(name, plugin);
        Ok(())
    }

    /// Look up a plugin by name.
    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.get(name).map(Box::as_ref)
    }

    /// Parse a `name:{json}` spec and configure the named plugin.
    pub fn configure(&self, spec: &str, base: &mut SessionConfig) -> Result<Arc<dyn Interceptor>, PluginError> {
        let (name, config) = spec.split_once(':').ok_or(PluginError::InvalidSpec)?;
        let plugin = self.get(name).ok_or_else(|| PluginError::NotFound(name.to_string()))?;

        tracing::info!(plugin = name, "loading plugin");
        plugin.configure(config.as_bytes(), base)
    }
}
