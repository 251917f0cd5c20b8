use std::io;

use hickory_proto::ProtoError;
use tokio::task::JoinError;

use crate::codec::CodecError;

/// Transport-layer failures. Resolution outcomes never surface here; they
/// are carried in the response code of the message itself.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("dns protocol error: {0}")]
    Protocol(#[from] ProtoError),

    #[error("failed to bind listener: {0}")]
    Bind(#[source] io::Error),

    #[error("server io error: {0}")]
    Serve(#[source] io::Error),

    #[error("send io error: {0}")]
    Send(#[source] io::Error),

    #[error("recv io error: {0}")]
    Recv(#[source] io::Error),

    #[error("server task panicked: {0}")]
    Task(#[from] JoinError),
}

impl From<CodecError> for ServerError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(err) => ServerError::Send(err),
            CodecError::Protocol(err) => ServerError::Protocol(err),
        }
    }
}
