use crate::bytesio::bytes_errors::{BytesReadError, BytesWriteError};

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct EventMessagesError {
    pub value: EventMessagesErrorValue,
}

#[derive(Debug, thiserror::Error)]
pub enum EventMessagesErrorValue {
    #[error("bytes write error: {0}")]
    BytesWriteError(BytesWriteError),
    #[error("bytes read error: {0}")]
    BytesReadError(BytesReadError),
}

impl From<BytesWriteError> for EventMessagesError {
    fn from(error: BytesWriteError) -> Self {
        Self {
            value: EventMessagesErrorValue::BytesWriteError(error),
        }
    }
}

impl From<BytesReadError> for EventMessagesError {
    fn from(error: BytesReadError) -> Self {
        Self {
            value: EventMessagesErrorValue::BytesReadError(error),
        }
    }
}
