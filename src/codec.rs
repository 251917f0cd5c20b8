//! Wire codec for standard DNS messages defined in RFC 1035.

use bytes::{Buf, BufMut, BytesMut};
use hickory_proto::ProtoError;
use hickory_proto::op::{Header, Message, MessageType, ResponseCode};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, trace};

/// Largest response the fixture will emit on a datagram transport.
const MAX_DATAGRAM_PAYLOAD: u16 = 4096;

/// Codec translating between raw bytes and [`Message`]s, in either the bare
/// framing (one datagram or HTTP body per message) or the two-byte
/// length-prefixed framing used on stream transports.
#[derive(Debug, Clone)]
pub struct DnsCodec {
    length_delimited: bool,
    max_response_size: u16,
}

impl DnsCodec {
    /// Codec for datagram transports: one buffer is one message.
    pub fn datagram() -> Self {
        Self {
            length_delimited: false,
            max_response_size: MAX_DATAGRAM_PAYLOAD,
        }
    }

    /// Codec for stream transports: messages carry a two-byte length prefix.
    pub fn stream() -> Self {
        Self {
            length_delimited: true,
            max_response_size: u16::MAX,
        }
    }

    fn parse_length(&mut self, src: &mut BytesMut) -> Option<usize> {
        if src.len() < 2 {
            // Not enough data to read the length marker
            return None;
        }

        let mut length_bytes = [0u8; 2];
        length_bytes.copy_from_slice(&src[..2]);
        let length = u16::from_be_bytes(length_bytes) as usize;

        if src.len() < (length + 2) {
            src.reserve((length + 2) - src.len());
            // Not enough data to read the entire message
            return None;
        }
        trace!("decode len={length}");
        src.advance(2);
        Some(length)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid dns message: {0}")]
    Protocol(#[source] ProtoError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Decoder for DnsCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let length = if self.length_delimited {
            match self.parse_length(src) {
                Some(length) => length,
                None => return Ok(None),
            }
        } else {
            src.len()
        };

        if length == 0 {
            return Ok(None);
        }

        trace!("decode buffer={}", src.len());

        let mut decoder = BinDecoder::new(&src[..length]);
        let result = Message::read(&mut decoder);
        // the frame is consumed whether or not it parsed
        src.advance(length);
        match result {
            Ok(message) => Ok(Some(message)),
            Err(error) if !self.length_delimited => {
                debug!(%error, "failed to decode message, dropping");
                Ok(None)
            }
            Err(error) => Err(CodecError::Protocol(error)),
        }
    }
}

impl Encoder<Message> for DnsCodec {
    type Error = CodecError;

    fn encode(&mut self, response: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let id = response.id();
        trace!(
            id,
            response_code = %response.response_code(),
            "encoding response",
        );

        let mut buffer = Vec::with_capacity(512);
        {
            let mut encoder = BinEncoder::new(&mut buffer);
            encoder.set_max_size(self.max_response_size);
            response.emit(&mut encoder)
        }
        .or_else(|error| {
            error!(%error, "error encoding message, sending servfail");
            encode_fallback_servfail(id, &mut buffer)
        })
        .map_err(CodecError::Protocol)?;

        if self.length_delimited {
            dst.reserve(buffer.len() + 2);
            dst.put_u16(buffer.len() as u16);
        } else {
            dst.reserve(buffer.len());
        }
        dst.put(&*buffer);
        Ok(())
    }
}

/// Bare SERVFAIL header for responses that failed to encode.
fn encode_fallback_servfail(id: u16, buffer: &mut Vec<u8>) -> Result<(), ProtoError> {
    buffer.clear();
    let mut encoder = BinEncoder::new(buffer);
    encoder.set_max_size(512);
    let mut header = Header::new();
    header.set_id(id);
    header.set_message_type(MessageType::Response);
    header.set_response_code(ResponseCode::ServFail);
    header.emit(&mut encoder)?;
    Ok(())
}
