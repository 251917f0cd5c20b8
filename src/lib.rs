//! Programmable DNS servers for exercising DNS client implementations.
//!
//! A [`RecordStore`] holds the records under test, a [`Responder`] resolves
//! queries against it, and the [`server`] module serves the responder over
//! UDP, TCP, TLS, and HTTPS.

pub mod codec;
pub mod error;
pub mod responder;
pub mod server;
pub mod store;

pub use self::error::ServerError;
pub use self::responder::Responder;
pub use self::server::https::HttpsServer;
pub use self::server::tcp::TcpServer;
pub use self::server::tls::TlsServer;
pub use self::server::udp::UdpServer;
pub use self::store::RecordStore;
