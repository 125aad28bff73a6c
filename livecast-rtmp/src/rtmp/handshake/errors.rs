use {
    crate::bytesio::{
        bytes_errors::{BytesReadError, BytesWriteError},
        bytesio_errors::BytesIOError,
    },
    std::time::SystemTimeError,
};

#[derive(Debug, thiserror::Error)]
pub enum HandshakeErrorValue {
    #[error("bytes read error: {0}")]
    BytesReadError(BytesReadError),
    #[error("bytes write error: {0}")]
    BytesWriteError(BytesWriteError),
    #[error("system time error: {0}")]
    SysTimeError(SystemTimeError),
    #[error("s0 version not correct: {0}")]
    S0VersionNotCorrect(u8),
    #[error("net io error: {0}")]
    BytesIOError(BytesIOError),
}

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct HandshakeError {
    pub value: HandshakeErrorValue,
}

impl From<HandshakeErrorValue> for HandshakeError {
    fn from(val: HandshakeErrorValue) -> Self {
        Self { value: val }
    }
}

impl From<BytesReadError> for HandshakeError {
    fn from(error: BytesReadError) -> Self {
        Self {
            value: HandshakeErrorValue::BytesReadError(error),
        }
    }
}

impl From<BytesWriteError> for HandshakeError {
    fn from(error: BytesWriteError) -> Self {
        Self {
            value: HandshakeErrorValue::BytesWriteError(error),
        }
    }
}

impl From<SystemTimeError> for HandshakeError {
    fn from(error: SystemTimeError) -> Self {
        Self {
            value: HandshakeErrorValue::SysTimeError(error),
        }
    }
}

impl From<BytesIOError> for HandshakeError {
    fn from(error: BytesIOError) -> Self {
        Self {
            value: HandshakeErrorValue::BytesIOError(error),
        }
    }
}
