//! DNS-over-TCP test server.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::ServerError;
use crate::responder::Responder;

use super::ServerTask;
use super::stream::serve_connection;

/// Serves length-prefixed queries over TCP, one task per connection.
pub struct TcpServer {
    local_addr: SocketAddr,
    task: ServerTask,
}

impl TcpServer {
    /// Bind `addr` (usually port 0) and start serving `responder`.
    pub async fn bind(addr: SocketAddr, responder: Responder) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await.map_err(ServerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ServerError::Bind)?;

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let task = ServerTask::spawn(shutdown, serve(listener, responder, token));

        debug!(%local_addr, "tcp server listening");
        Ok(Self { local_addr, task })
    }

    /// The bound address of this server.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections, drain in-flight ones, and wait for the
    /// serving loop to exit.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        self.task.shutdown().await
    }
}

async fn serve(
    listener: TcpListener,
    responder: Responder,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    trace!(%peer, "accepted tcp connection");
                    let responder = responder.clone();
                    let token = shutdown.clone();
                    connections.spawn(async move {
                        if let Err(error) = serve_connection(stream, responder, token).await {
                            debug!(%error, %peer, "tcp connection ended with error");
                        }
                    });
                }
                Err(error) => warn!(%error, "failed to accept tcp connection"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    // drain in-flight connections before tearing the listener down
    while connections.join_next().await.is_some() {}
    Ok(())
}
