//! DNS-over-HTTPS test server.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::serve::Listener;
use hickory_proto::op::Message;
use http::{HeaderMap, Method, StatusCode, header};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::ServerError;
use crate::responder::Responder;

use super::ServerTask;

const MIME_APPLICATION_DNS: &str = "application/dns-message";

/// Serves the RFC 8484 POST flavor of DNS-over-HTTPS.
///
/// Requests on any path are accepted; the method must be POST and the
/// content type must be `application/dns-message`, otherwise the request is
/// rejected with 400 before the responder is consulted.
pub struct HttpsServer {
    local_addr: SocketAddr,
    task: ServerTask,
}

impl HttpsServer {
    /// Bind `addr` (usually port 0) and start serving `responder` behind
    /// the supplied TLS configuration. ALPN is forced to h2 + http/1.1.
    pub async fn bind(
        addr: SocketAddr,
        mut config: rustls::ServerConfig,
        responder: Responder,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await.map_err(ServerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ServerError::Bind)?;

        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
        let acceptor = TlsAcceptor::from(Arc::new(config));
        let app = Router::new().fallback(serve_query).with_state(responder);

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let task = ServerTask::spawn(shutdown, async move {
            axum::serve(TlsListener { listener, acceptor }, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .map_err(ServerError::Serve)
        });

        debug!(%local_addr, "https server listening");
        Ok(Self { local_addr, task })
    }

    /// The bound address of this server.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL for this server.
    pub fn url(&self) -> String {
        format!("https://{}", self.local_addr)
    }

    /// Stop accepting connections, drain in-flight ones, and wait for the
    /// serving loop to exit.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        self.task.shutdown().await
    }
}

async fn serve_query(
    State(responder): State<Responder>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    if content_type != Some(MIME_APPLICATION_DNS) {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let query = match Message::from_vec(&body) {
        Ok(query) => query,
        Err(error) => {
            debug!(%error, "undecodable doh query");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let response = responder.respond(&query);
    match response.to_vec() {
        Ok(buffer) => ([(header::CONTENT_TYPE, MIME_APPLICATION_DNS)], buffer).into_response(),
        Err(error) => {
            error!(%error, "failed to encode doh response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// TCP listener that completes a TLS handshake before handing the stream
/// to the HTTP stack. Failed handshakes are logged and discarded.
struct TlsListener {
    listener: TcpListener,
    acceptor: TlsAcceptor,
}

impl Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(error) => {
                    warn!(%error, "failed to accept https connection");
                    continue;
                }
            };
            match self.acceptor.accept(stream).await {
                Ok(stream) => return (stream, peer),
                Err(error) => warn!(%error, %peer, "tls handshake failed"),
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.listener.local_addr()
    }
}
