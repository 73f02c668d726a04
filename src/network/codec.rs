//! Frame codec: a 4-byte big-endian length prefix followed by a bincode
//! payload.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::LengthDelimitedCodec;

use crate::NetworkError;

/// Length-prefixed framing capped at `max_frame_length` bytes.
pub fn frame_codec(max_frame_length: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .max_frame_length(max_frame_length)
        .new_codec()
}

pub fn encode_frame<T: Serialize>(message: &T) -> std::result::Result<Bytes, NetworkError> {
    let payload = bincode::serialize(message)?;
    Ok(Bytes::from(payload))
}

pub fn decode_frame<T: DeserializeOwned>(frame: &[u8]) -> std::result::Result<T, NetworkError> {
    Ok(bincode::deserialize(frame)?)
}
