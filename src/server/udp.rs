//! DNS-over-UDP test server.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tokio_util::udp::UdpFramed;
use tracing::{debug, warn};

use crate::codec::DnsCodec;
use crate::error::ServerError;
use crate::responder::Responder;

use super::ServerTask;

/// Serves one query per received datagram, answering to the datagram's
/// source address.
pub struct UdpServer {
    local_addr: SocketAddr,
    task: ServerTask,
}

impl UdpServer {
    /// Bind `addr` (usually port 0) and start serving `responder`.
    pub async fn bind(addr: SocketAddr, responder: Responder) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind(addr).await.map_err(ServerError::Bind)?;
        let local_addr = socket.local_addr().map_err(ServerError::Bind)?;

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let task = ServerTask::spawn(shutdown, serve(socket, responder, token));

        debug!(%local_addr, "udp server listening");
        Ok(Self { local_addr, task })
    }

    /// The bound address of this server.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop receiving datagrams and wait for the serving loop to exit.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        self.task.shutdown().await
    }
}

async fn serve(
    socket: UdpSocket,
    responder: Responder,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let mut framed = UdpFramed::new(socket, DnsCodec::datagram());

    loop {
        let incoming = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            incoming = framed.next() => incoming,
        };

        match incoming {
            Some(Ok((query, src))) => {
                let response = responder.respond(&query);
                if let Err(error) = framed.send((response, src)).await {
                    warn!(%error, %src, "failed to send udp response");
                }
            }
            // undecodable datagrams are dropped by the codec, so an error
            // here is a receive failure; keep serving
            Some(Err(error)) => {
                warn!(%error, "udp receive error");
            }
            None => return Ok(()),
        }
    }
}
