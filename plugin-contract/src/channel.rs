use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::frame::{FrameError, MessageFrame};
use crate::rpc::RpcMessage;

/// Largest single frame the transport accepts, guarding against a
/// confused or hostile peer sending an unbounded length prefix.
const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// A single RPC channel over TCP, framed with [`MessageFrame`]. Used on
/// both sides of the wire: the host dials a plugin's printed address, a
/// plugin server wraps an accepted connection.
pub struct Channel {
    stream: TcpStream,
    call_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("RPC call timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl Channel {
    pub async fn dial(addr: &str, call_timeout: Duration) -> Result<Self, std::io::Error> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self { stream, call_timeout })
    }

    /// Wrap an already-accepted stream, as a plugin server does with each
    /// incoming connection. Uses a generous default call timeout since
    /// the server side waits on the host's pace, not its own deadline.
    #[must_use]
    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream, call_timeout: Duration::from_secs(300) }
    }

    pub async fn send(&mut self, msg: &RpcMessage) -> Result<(), ChannelError> {
        let frame = MessageFrame::from_message(msg)?;
        let encoded = frame.encode();
        timeout(self.call_timeout, self.stream.write_all(&encoded))
            .await
            .map_err(|_| ChannelError::Timeout(self.call_timeout))??;
        self.stream.flush().await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<RpcMessage, ChannelError> {
        let mut len_buf = [0u8; 4];
        timeout(self.call_timeout, self.stream.read_exact(&mut len_buf))
            .await
            .map_err(|_| ChannelError::Timeout(self.call_timeout))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    ChannelError::ConnectionClosed
                } else {
                    ChannelError::Io(e)
                }
            })?;

        let len = MessageFrame::decode_len(len_buf, MAX_FRAME_BYTES)?;

        let mut data = vec![0u8; len];
        timeout(self.call_timeout, self.stream.read_exact(&mut data))
            .await
            .map_err(|_| ChannelError::Timeout(self.call_timeout))??;

        let frame = MessageFrame { data };
        Ok(frame.to_message()?)
    }

    /// Send a request and wait for the paired response, within this
    /// channel's call timeout.
    pub async fn request(&mut self, msg: &RpcMessage) -> Result<RpcMessage, ChannelError> {
        self.send(msg).await?;
        self.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{GetManifestRequest, GetManifestResponse};
    use crate::manifest::Manifest;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn request_round_trips_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut channel = Channel::from_stream(stream);
            let request = channel.recv().await.unwrap();
            assert!(matches!(request, RpcMessage::GetManifest(_)));
            let manifest = Manifest {
                name: "demo".into(),
                version: "0.1.0".into(),
                api_version: "v1".into(),
                capabilities: vec![],
                safety: None,
            };
            channel
                .send(&RpcMessage::GetManifestOk(GetManifestResponse { manifest }))
                .await
                .unwrap();
        });

        let mut client = Channel::dial(&addr.to_string(), Duration::from_secs(5)).await.unwrap();
        let response = client
            .request(&RpcMessage::GetManifest(GetManifestRequest { api_version: "v1".into() }))
            .await
            .unwrap();
        assert!(matches!(response, RpcMessage::GetManifestOk(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_before_allocating() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let len = (MAX_FRAME_BYTES as u32 + 1).to_be_bytes();
            stream.write_all(&len).await.unwrap();
        });

        let mut client = Channel::dial(&addr.to_string(), Duration::from_secs(5)).await.unwrap();
        let result = client.recv().await;
        assert!(matches!(result, Err(ChannelError::Frame(FrameError::TooLarge { .. }))));
        server.await.unwrap();
    }
}
