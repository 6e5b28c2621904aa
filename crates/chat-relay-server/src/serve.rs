use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result, anyhow};
use chat_relay_session::{Relay, RelayConfig};
use chat_relay_transport::{tcp::serve_tcp, websocket::serve_ws};
use tokio::{net::TcpListener, select};
use tracing::{info, warn};

pub async fn run(args: crate::cli::ServeArgs) -> Result<()> {
    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    let ws_listener = match args.ws_listen {
        Some(addr) => Some(
            TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind websocket listener {addr}"))?,
        ),
        None => None,
    };

    let server = Server::new(&args.relay_config(), listener, ws_listener);
    info!("relay listening on {}", server.local_addr()?);
    server
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
}

pub struct Server {
    relay: Arc<Relay>,
    listener: TcpListener,
    ws_listener: Option<TcpListener>,
}

impl Server {
    pub fn new(config: &RelayConfig, listener: TcpListener, ws_listener: Option<TcpListener>) -> Self {
        Self {
            relay: Arc::new(Relay::new(config)),
            listener,
            ws_listener,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` resolves or the shared log fails.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Self {
            relay,
            listener,
            ws_listener,
        } = self;

        if let Some(ws) = &ws_listener {
            info!("websocket endpoint on ws://{}/ws", ws.local_addr()?);
        }
        let websocket = {
            let relay = Arc::clone(&relay);
            async move {
                match ws_listener {
                    Some(listener) => serve_ws(listener, relay).await,
                    None => std::future::pending().await,
                }
            }
        };

        let result = select! {
            () = shutdown => Ok(()),
            err = relay.wait_fatal() => Err(anyhow!(err).context("shared log failure")),
            () = serve_tcp(listener, Arc::clone(&relay)) => Ok(()),
            res = websocket => res.context("websocket server failed"),
        };

        relay.shutdown().await;
        result
    }
}
