//! Transport servers for the fixture: one listening endpoint each, serving
//! a shared [`Responder`](crate::Responder).

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ServerError;

pub mod https;
mod stream;
pub mod tcp;
pub mod tls;
pub mod udp;

/// A spawned accept loop plus the token that stops it.
///
/// Shutdown cancels the token and then awaits the loop, so by the time
/// `shutdown` returns, in-flight work has drained and the listening socket
/// is gone. No response is written after that point.
struct ServerTask {
    shutdown: CancellationToken,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl ServerTask {
    fn spawn<F>(shutdown: CancellationToken, future: F) -> Self
    where
        F: Future<Output = Result<(), ServerError>> + Send + 'static,
    {
        Self {
            shutdown,
            handle: tokio::spawn(future),
        }
    }

    async fn shutdown(self) -> Result<(), ServerError> {
        self.shutdown.cancel();
        self.handle.await?
    }
}
