use crate::bytesio::bytes_errors::{BytesReadError, BytesWriteError};

#[derive(Debug, thiserror::Error)]
pub enum UnpackErrorValue {
    #[error("bytes read error: {0}")]
    BytesReadError(BytesReadError),
    #[error("cannot parse chunk stream, too many headers without a type 0 start")]
    CannotParse,
    #[error("message size {size} exceeds maximum {max}")]
    MessageTooLarge { size: usize, max: usize },
}

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct UnpackError {
    pub value: UnpackErrorValue,
}

impl From<UnpackErrorValue> for UnpackError {
    fn from(val: UnpackErrorValue) -> Self {
        Self { value: val }
    }
}

impl From<BytesReadError> for UnpackError {
    fn from(error: BytesReadError) -> Self {
        Self {
            value: UnpackErrorValue::BytesReadError(error),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PackErrorValue {
    #[error("chunk stream id {0} cannot be encoded")]
    InvalidChunkStreamId(u32),
    #[error("message of {0} bytes does not fit a 24 bit length")]
    MessageTooLarge(usize),
    #[error("bytes writer error: {0}")]
    BytesWriteError(BytesWriteError),
}

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct PackError {
    pub value: PackErrorValue,
}

impl From<PackErrorValue> for PackError {
    fn from(val: PackErrorValue) -> Self {
        Self { value: val }
    }
}

impl From<BytesWriteError> for PackError {
    fn from(error: BytesWriteError) -> Self {
        Self {
            value: PackErrorValue::BytesWriteError(error),
        }
    }
}
