//! TCP listener for the chat relay.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use super::context::ServerContext;
use super::session::handle_connection;
use crate::config::ServerConfig;
use crate::{RelayError, Result};

/// Relay server that accepts TCP connections and runs a chat session for
/// each one.
pub struct RelayServer {
    listener: TcpListener,
    semaphore: Arc<Semaphore>,
    max_connections: usize,
}

impl RelayServer {
    /// Bind to the host and port in `config`.
    ///
    /// Port 0 asks the OS for a free port; see [`RelayServer::local_addr`].
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;

        info!("Chat relay listening on {}", local_addr);

        Ok(Self {
            listener,
            semaphore: Arc::new(Semaphore::new(config.max_connections)),
            max_connections: config.max_connections,
        })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Get the maximum number of connections allowed.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Get the number of available connection slots.
    pub fn available_connections(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get the number of active connections.
    pub fn active_connections(&self) -> usize {
        self.max_connections - self.semaphore.available_permits()
    }

    /// Accept a new connection.
    ///
    /// Waits for a free connection slot before accepting, so clients beyond
    /// the limit queue in the OS backlog until someone disconnects.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit)> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RelayError::Io(std::io::Error::other("semaphore closed")))?;

        let (stream, addr) = self.listener.accept().await?;
        debug!("Accepted connection from {}", addr);

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Serve clients until `shutdown` completes.
    ///
    /// On shutdown every connected client is told the server is going away;
    /// sessions already running are left to finish on their own.
    pub async fn run_until<F>(self, context: ServerContext, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    context.shutdown().await;
                    return Ok(());
                }
                accepted = self.accept() => match accepted {
                    Ok((stream, addr, permit)) => {
                        let context = context.clone();
                        tokio::spawn(async move {
                            handle_connection(context, stream, addr).await;
                            // Releases the connection slot
                            drop(permit);
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
            }
        }
    }

    /// Serve clients until Ctrl-C.
    pub async fn run_until_ctrl_c(self, context: ServerContext) -> Result<()> {
        self.run_until(context, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}

/// A permit that represents an active connection slot.
///
/// When this permit is dropped, the connection slot is released.
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
