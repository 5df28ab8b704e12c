//! The acceptor and the per-session driver.

use std::sync::Arc;

use rtmpproxy_rtmp::{RelaySession, RewriteRules};
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use crate::config::SessionConfig;
use crate::dial::{AsyncStream, Dialer};
use crate::error::Error;
use crate::link::RemoteTarget;
use crate::plugins::Interceptor;
use crate::tls;

/// Accept client connections forever.
///
/// Accept errors are logged and the loop keeps going. Every connection gets
/// its own task and its own clone of the base config; sessions are never
/// joined.
pub async fn serve(listener: TcpListener, base: SessionConfig, interceptor: Arc<dyn Interceptor>) {
    loop {
        let (client, addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::error!("failed to accept connection: {err}");
                continue;
            }
        };

        tracing::info!(%addr, "accepted connection");

        let base = base.clone();
        let interceptor = interceptor.clone();
        tokio::spawn(
            async move {
                if let Err(err) = run_session(client, base, interceptor).await {
                    tracing::error!("session error: {err}");
                }
            }
            .instrument(tracing::info_span!("session", addr = %addr)),
        );
    }
}

/// Run one session to completion.
///
/// `after_close_tcp_connection` runs on every exit path, also when the
/// session itself failed.
pub(crate) async fn run_session(
    client: TcpStream,
    mut config: SessionConfig,
    interceptor: Arc<dyn Interceptor>,
) -> Result<(), Error> {
    let result = drive_session(client, &mut config, interceptor.as_ref()).await;

    if let Err(source) = interceptor.after_close_tcp_connection(&mut config).await {
        let err = Error::Hook {
            hook: "after_close_tcp_connection",
            source,
        };
        match result {
            // the first error wins, the cleanup failure is only logged
            Err(first) => {
                tracing::error!("{err}");
                return Err(first);
            }
            Ok(()) => return Err(err),
        }
    }

    result
}

async fn drive_session(client: TcpStream, config: &mut SessionConfig, interceptor: &dyn Interceptor) -> Result<(), Error> {
    interceptor
        .before_establish_tcp_connection(config)
        .await
        .map_err(|source| Error::Hook {
            hook: "before_establish_tcp_connection",
            source,
        })?;

    let target = RemoteTarget::resolve(config)?;
    let dialer = Dialer::from_proxy_url(config.proxy_url.as_ref().map(url::Url::as_str))?;

    let server = dialer.dial(&target.addr).await?;
    let server: Box<dyn AsyncStream> = if target.use_tls {
        Box::new(tls::establish_tls(server, &target.host, config.insecure_skip_verify).await?)
    } else {
        server
    };
    tracing::info!(addr = %target.addr, tls = target.use_tls, "connected to remote server");

    let rules = RewriteRules {
        app_name: target.params.app_name,
        stream_name: target.params.stream_name,
        play_url: target.params.play_url,
        flash_ver: config.flash_ver.clone(),
        rtmp_type: config.rtmp_type.clone(),
        force_handle: config.force_handle,
    };

    let mut session = RelaySession::new(client, server, rules);
    session.handshake().await?;

    interceptor
        .after_rtmp_handshake(config)
        .await
        .map_err(|source| Error::Hook {
            hook: "after_rtmp_handshake",
            source,
        })?;

    session.run().await?;

    tracing::info!("session finished");
    Ok(())
}
