use std::io;

#[derive(Debug, thiserror::Error)]
pub enum BytesIOErrorValue {
    #[error("not enough bytes")]
    NotEnoughBytes,
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("io error: {0}")]
    IOError(#[source] io::Error),
    #[error("time out error")]
    TimeoutError(tokio::time::error::Elapsed),
}

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct BytesIOError {
    pub value: BytesIOErrorValue,
}

impl BytesIOError {
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.value, BytesIOErrorValue::ConnectionClosed)
    }
}

impl From<BytesIOErrorValue> for BytesIOError {
    fn from(val: BytesIOErrorValue) -> Self {
        Self { value: val }
    }
}

impl From<io::Error> for BytesIOError {
    fn from(error: io::Error) -> Self {
        Self {
            value: BytesIOErrorValue::IOError(error),
        }
    }
}

impl From<tokio::time::error::Elapsed> for BytesIOError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        Self {
            value: BytesIOErrorValue::TimeoutError(error),
        }
    }
}
