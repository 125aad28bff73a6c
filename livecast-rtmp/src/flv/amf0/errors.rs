use {
    crate::bytesio::bytes_errors::{BytesReadError, BytesWriteError},
    std::string,
};

#[derive(Debug, thiserror::Error)]
pub enum Amf0ReadErrorValue {
    #[error("encountered unknown marker: {marker}")]
    UnknownMarker { marker: u8 },
    #[error("parser string error: {0}")]
    StringParseError(#[source] string::FromUtf8Error),
    #[error("bytes read error :{0}")]
    BytesReadError(BytesReadError),
    #[error("wrong type")]
    WrongType,
    #[error("objects nested deeper than {0} levels")]
    NestingTooDeep(usize),
}

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct Amf0ReadError {
    pub value: Amf0ReadErrorValue,
}

impl From<Amf0ReadErrorValue> for Amf0ReadError {
    fn from(val: Amf0ReadErrorValue) -> Self {
        Self { value: val }
    }
}

impl From<string::FromUtf8Error> for Amf0ReadError {
    fn from(error: string::FromUtf8Error) -> Self {
        Self {
            value: Amf0ReadErrorValue::StringParseError(error),
        }
    }
}

impl From<BytesReadError> for Amf0ReadError {
    fn from(error: BytesReadError) -> Self {
        Self {
            value: Amf0ReadErrorValue::BytesReadError(error),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Amf0WriteErrorValue {
    #[error("normal string too long: {0} bytes")]
    NormalStringTooLong(usize),
    #[error("bytes write error: {0}")]
    BytesWriteError(BytesWriteError),
    #[error("value cannot be written standalone")]
    NotWritable,
}

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct Amf0WriteError {
    pub value: Amf0WriteErrorValue,
}

impl From<Amf0WriteErrorValue> for Amf0WriteError {
    fn from(val: Amf0WriteErrorValue) -> Self {
        Self { value: val }
    }
}

impl From<BytesWriteError> for Amf0WriteError {
    fn from(error: BytesWriteError) -> Self {
        Self {
            value: Amf0WriteErrorValue::BytesWriteError(error),
        }
    }
}
