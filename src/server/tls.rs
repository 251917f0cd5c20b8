//! DNS-over-TLS test server.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::ServerError;
use crate::responder::Responder;

use super::ServerTask;
use super::stream::serve_connection;

/// [`TcpServer`](super::tcp::TcpServer) semantics behind a TLS handshake.
///
/// Certificate provisioning is the caller's problem: `bind` takes a fully
/// configured [`rustls::ServerConfig`].
pub struct TlsServer {
    local_addr: SocketAddr,
    task: ServerTask,
}

impl TlsServer {
    /// Bind `addr` (usually port 0) and start serving `responder` behind
    /// the supplied TLS configuration.
    pub async fn bind(
        addr: SocketAddr,
        config: rustls::ServerConfig,
        responder: Responder,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await.map_err(ServerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ServerError::Bind)?;
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let task = ServerTask::spawn(shutdown, serve(listener, acceptor, responder, token));

        debug!(%local_addr, "tls server listening");
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
    acceptor: TlsAcceptor,
    responder: Responder,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    trace!(%peer, "accepted tls connection");
                    let acceptor = acceptor.clone();
                    let responder = responder.clone();
                    let token = shutdown.clone();
                    connections.spawn(async move {
                        let stream = match acceptor.accept(stream).await {
                            Ok(stream) => stream,
                            Err(error) => {
                                warn!(%error, %peer, "tls handshake failed");
                                return;
                            }
                        };
                        if let Err(error) = serve_connection(stream, responder, token).await {
                            debug!(%error, %peer, "tls connection ended with error");
                        }
                    });
                }
                Err(error) => warn!(%error, "failed to accept tls connection"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    while connections.join_next().await.is_some() {}
    Ok(())
}
