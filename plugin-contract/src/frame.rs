use crate::rpc::RpcMessage;

/// Length-prefixed framing for `RpcMessage`.
///
/// Format: `[4-byte big-endian length][bincode-encoded message]`.
#[derive(Debug)]
pub struct MessageFrame {
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("message of {len} bytes exceeds the {max} byte frame limit")]
    TooLarge { len: usize, max: usize },
}

impl MessageFrame {
    pub fn from_message(msg: &RpcMessage) -> Result<Self, FrameError> {
        let data = bincode::encode_to_vec(msg, bincode::config::standard())?;
        Ok(Self { data })
    }

    pub fn to_message(&self) -> Result<RpcMessage, FrameError> {
        let (msg, _len) = bincode::decode_from_slice(&self.data, bincode::config::standard())?;
        Ok(msg)
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let len = self.data.len();
        let mut buf = Vec::with_capacity(4 + len);
        buf.extend_from_slice(&(len as u32).to_be_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Parse the 4-byte big-endian length prefix, validating it against
    /// `max_len` before the caller reads that many bytes off the wire.
    pub fn decode_len(prefix: [u8; 4], max_len: usize) -> Result<usize, FrameError> {
        let len = u32::from_be_bytes(prefix) as usize;
        if len > max_len {
            return Err(FrameError::TooLarge { len, max: max_len });
        }
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{GetManifestRequest, RpcMessage};

    #[test]
    fn frame_round_trips() {
        let msg = RpcMessage::GetManifest(GetManifestRequest { api_version: "v1".into() });
        let frame = MessageFrame::from_message(&msg).unwrap();
        let encoded = frame.encode();
        assert_eq!(encoded.len(), 4 + frame.data.len());

        let len_prefix: [u8; 4] = encoded[0..4].try_into().unwrap();
        let len = MessageFrame::decode_len(len_prefix, usize::MAX).unwrap();
        assert_eq!(len, frame.data.len());

        let decoded = frame.to_message().unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let err = MessageFrame::decode_len([0, 1, 0, 0], 1024);
        assert!(matches!(err, Err(FrameError::TooLarge { .. })));
    }
}
