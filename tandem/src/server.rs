//! Server lifecycle management
//!
//! One axum task serves REST and the WebSocket upgrade. The media relay's
//! death future is supervised alongside it: a dead relay worker takes the
//! whole process down so an external supervisor can restart both together.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use tandem_core::relay::MediaRelay;
use tandem_core::{Config, SessionService};

pub struct TandemServer {
    config: Config,
    service: Arc<SessionService>,
    relay: Arc<dyn MediaRelay>,
}

impl TandemServer {
    pub fn new(
        config: Config,
        service: Arc<SessionService>,
        relay: Arc<dyn MediaRelay>,
    ) -> Self {
        Self {
            config,
            service,
            relay,
        }
    }

    /// Serve until a shutdown signal, an unexpected server exit, or relay
    /// worker death. Relay death exits non-zero.
    pub async fn start(self) -> anyhow::Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut http_handle = self.start_http_server(shutdown_rx);
        info!("All components started");

        let mut relay_died = false;
        tokio::select! {
            _ = &mut http_handle => {
                error!("HTTP server stopped unexpectedly");
            }
            () = self.relay.died() => {
                error!("Media relay worker died");
                relay_died = true;
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
            }
        }

        let _ = shutdown_tx.send(true);

        if !http_handle.is_finished()
            && tokio::time::timeout(Duration::from_secs(10), http_handle)
                .await
                .is_err()
        {
            warn!("HTTP server did not drain within 10s");
        }

        let open = self.service.connection_count();
        if open > 0 {
            info!("Dropping {} signaling connection(s)", open);
        }

        if relay_died {
            anyhow::bail!("media relay worker died");
        }
        info!("Tandem server shut down");
        Ok(())
    }

    /// Start the HTTP server with graceful shutdown support
    fn start_http_server(&self, shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let http_address = self.config.http_address();
        let router = tandem_api::create_router(Arc::clone(&self.service));

        tokio::spawn(async move {
            let http_addr: std::net::SocketAddr = match http_address.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    error!("Invalid HTTP address '{}': {}", http_address, e);
                    return;
                }
            };

            let listener = match tokio::net::TcpListener::bind(http_addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!("Failed to bind HTTP address {}: {}", http_addr, e);
                    return;
                }
            };

            info!("HTTP server listening on {}", http_addr);

            let mut rx = shutdown_rx;
            let graceful = async move {
                let _ = rx.changed().await;
            };

            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(graceful)
                .await
            {
                error!("HTTP server error: {}", e);
            }

            info!("HTTP server shut down gracefully");
        })
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
