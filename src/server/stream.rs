//! Framed connection loop shared by the TCP and TLS servers.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crate::codec::{CodecError, DnsCodec};
use crate::error::ServerError;
use crate::responder::Responder;

/// Read length-prefixed queries off `stream` and write back responses until
/// the peer closes, a codec error occurs, or `shutdown` fires.
pub(crate) async fn serve_connection<IO>(
    stream: IO,
    responder: Responder,
    shutdown: CancellationToken,
) -> Result<(), ServerError>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, DnsCodec::stream());

    loop {
        let incoming = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            incoming = framed.next() => incoming,
        };

        match incoming {
            Some(Ok(query)) => {
                let response = responder.respond(&query);
                framed.send(response).await?;
            }
            Some(Err(CodecError::Io(error))) => return Err(ServerError::Recv(error)),
            Some(Err(error)) => return Err(error.into()),
            None => return Ok(()),
        }
    }
}
