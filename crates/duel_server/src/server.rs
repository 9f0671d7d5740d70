//! TCP listener: accepts connections and hands them to the matchmaker.

use crate::config::ServerConfig;
use crate::connection::{Connection, ConnectionId};
use crate::error::{ServerError, ServerErrorKind};
use crate::matchmaker::Matchmaker;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};

/// A bound listener plus the configuration every connection and session
/// inherits.
///
/// The matchmaker is created when serving starts and torn down when
/// serving stops, so each `Server` has its own waiting queue.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Binds the configured address.
    ///
    /// Failure here is fatal to startup and nothing else.
    #[instrument(skip_all, fields(addr = %config.listen_addr()))]
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|e| {
            ServerError::new(ServerErrorKind::Bind {
                addr: config.listen_addr().clone(),
                reason: e.message,
            })
        })?;
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            ServerError::new(ServerErrorKind::Bind {
                addr: addr.clone(),
                reason: e.to_string(),
            })
        })?;
        info!(addr = %addr, "Listening");
        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    /// Address actually bound, useful when the configured port is 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until an accept error.
    pub async fn serve(self) -> Result<(), ServerError> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serves until `shutdown` resolves or accepting fails.
    ///
    /// On return the matchmaker has stopped and closed every connection
    /// still waiting for a partner. Sessions already running are left to
    /// finish on their own.
    #[instrument(skip_all)]
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let (matchmaker, handle) = Matchmaker::new(Arc::clone(&self.config));
        let matchmaker = matchmaker.spawn();
        let mut next_id: ConnectionId = 0;
        tokio::pin!(shutdown);

        let result = loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting");
                    break Ok(());
                }
                accepted = self.listener.accept() => accepted,
            };
            let (stream, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    break Err(ServerError::new(ServerErrorKind::Accept(e.to_string())));
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                debug!(error = %e, "Could not disable Nagle");
            }

            next_id += 1;
            info!(connection_id = next_id, %peer, "Accepted connection");
            let connection = Connection::spawn(next_id, stream, peer.to_string(), &self.config);
            if let Err(e) = handle.enqueue(connection).await {
                warn!("Matchmaker gone, dropping connection");
                e.connection.close();
                break Ok(());
            }
        };

        drop(handle);
        if let Err(e) = matchmaker.await {
            warn!(error = %e, "Matchmaker task failed");
        }
        result
    }
}
