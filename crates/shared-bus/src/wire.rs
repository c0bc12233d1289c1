//! # Framed Transport
//!
//! One bincode value per length-delimited frame (u32 BE length prefix).
//! Generic over the byte stream so tests can run over `tokio::io::duplex`.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Largest accepted frame.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame encode error: {0}")]
    Encode(String),

    #[error("Frame decode error: {0}")]
    Decode(String),

    /// Peer closed the connection where a frame was required.
    #[error("Connection closed")]
    Closed,
}

/// A framed, typed connection.
pub struct FramedConnection<S = TcpStream> {
    inner: Framed<S, LengthDelimitedCodec>,
}

impl FramedConnection<TcpStream> {
    pub async fn connect(addr: &str) -> Result<Self, WireError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

impl<S> FramedConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(MAX_FRAME_LEN)
            .new_codec();
        Self {
            inner: Framed::new(stream, codec),
        }
    }

    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), WireError> {
        let bytes = bincode::serialize(message).map_err(|e| WireError::Encode(e.to_string()))?;
        self.inner.send(Bytes::from(bytes)).await?;
        Ok(())
    }

    /// Next frame, or `None` on clean EOF.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>, WireError> {
        match self.inner.next().await {
            None => Ok(None),
            Some(frame) => {
                let frame = frame?;
                bincode::deserialize(&frame)
                    .map(Some)
                    .map_err(|e| WireError::Decode(e.to_string()))
            }
        }
    }

    /// Like `recv` but EOF is an error.
    pub async fn expect<T: DeserializeOwned>(&mut self) -> Result<T, WireError> {
        self.recv().await?.ok_or(WireError::Closed)
    }

    /// Send one request and read one response.
    pub async fn call<Req: Serialize, Resp: DeserializeOwned>(
        &mut self,
        request: &Req,
    ) -> Result<Resp, WireError> {
        self.send(request).await?;
        self.expect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::rpc::{OrdererRequest, OrdererResponse};
    use shared_types::StatusCode;

    #[tokio::test]
    async fn test_request_response_over_duplex() {
        let (a, b) = tokio::io::duplex(4096);
        let mut client = FramedConnection::new(a);
        let mut server = FramedConnection::new(b);

        let server_task = tokio::spawn(async move {
            let req: OrdererRequest = server.expect().await.unwrap();
            assert_eq!(
                req,
                OrdererRequest::ChannelHeight {
                    channel_id: "c1".into()
                }
            );
            server
                .send(&OrdererResponse::Height {
                    status: StatusCode::Ok,
                    height: 7,
                })
                .await
                .unwrap();
        });

        let resp: OrdererResponse = client
            .call(&OrdererRequest::ChannelHeight {
                channel_id: "c1".into(),
            })
            .await
            .unwrap();
        assert_eq!(
            resp,
            OrdererResponse::Height {
                status: StatusCode::Ok,
                height: 7
            }
        );
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_eof_is_none_and_expect_is_closed() {
        let (a, b) = tokio::io::duplex(64);
        let mut reader = FramedConnection::new(a);
        drop(b);
        assert!(reader.recv::<OrdererRequest>().await.unwrap().is_none());
        assert!(matches!(
            reader.expect::<OrdererRequest>().await,
            Err(WireError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_garbage_frame_is_decode_error() {
        let (a, b) = tokio::io::duplex(64);
        let mut reader = FramedConnection::new(a);
        let mut writer = Framed::new(b, LengthDelimitedCodec::new());
        writer.send(Bytes::from_static(&[0xff, 0xff, 0xff])).await.unwrap();
        assert!(matches!(
            reader.recv::<OrdererRequest>().await,
            Err(WireError::Decode(_))
        ));
    }
}
