use {
    super::bytesio_errors::{BytesIOError, BytesIOErrorValue},
    async_trait::async_trait,
    bytes::{Bytes, BytesMut},
    futures::{SinkExt, StreamExt},
    std::time::Duration,
    tokio::{net::TcpStream, time::timeout},
    tokio_util::codec::{BytesCodec, Framed},
};

/// Transport used by the publisher session.
#[async_trait]
pub trait TNetIO: Send {
    async fn write(&mut self, bytes: Bytes) -> Result<(), BytesIOError>;
    async fn flush(&mut self) -> Result<(), BytesIOError>;
    /// Resolves with whatever the peer sent next. Cancel safe.
    async fn read(&mut self) -> Result<BytesMut, BytesIOError>;
}

pub struct TcpIO {
    stream: Framed<TcpStream, BytesCodec>,
}

impl TcpIO {
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: Framed::new(stream, BytesCodec::new()),
        }
    }

    pub async fn connect(host: &str, port: u16, duration: Duration) -> Result<Self, BytesIOError> {
        let stream = timeout(duration, TcpStream::connect((host, port))).await??;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl TNetIO for TcpIO {
    async fn write(&mut self, bytes: Bytes) -> Result<(), BytesIOError> {
        self.stream.feed(bytes).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), BytesIOError> {
        SinkExt::<Bytes>::flush(&mut self.stream).await?;
        Ok(())
    }

    async fn read(&mut self) -> Result<BytesMut, BytesIOError> {
        match self.stream.next().await {
            Some(Ok(data)) => Ok(data),
            Some(Err(err)) => Err(BytesIOError {
                value: BytesIOErrorValue::IOError(err),
            }),
            None => Err(BytesIOError {
                value: BytesIOErrorValue::ConnectionClosed,
            }),
        }
    }
}
