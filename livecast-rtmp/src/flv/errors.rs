use crate::{bytesio::bytes_errors::BytesWriteError, h264::errors::H264Error};

#[derive(Debug, thiserror::Error)]
pub enum FlvPackErrorValue {
    #[error("bytes write error: {0}")]
    BytesWriteError(#[source] BytesWriteError),
    #[error("h264 error: {0}")]
    H264Error(#[source] H264Error),
    #[error("empty nal unit")]
    EmptyNalUnit,
    #[error("nal unit of {0} bytes is too large")]
    NalUnitTooLarge(usize),
    #[error("unsupported aac sample rate: {0}")]
    UnsupportedSampleRate(u32),
    #[error("empty audio frame")]
    EmptyAudioFrame,
}

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct FlvPackError {
    pub value: FlvPackErrorValue,
}

impl From<FlvPackErrorValue> for FlvPackError {
    fn from(val: FlvPackErrorValue) -> Self {
        Self { value: val }
    }
}

impl From<BytesWriteError> for FlvPackError {
    fn from(error: BytesWriteError) -> Self {
        Self {
            value: FlvPackErrorValue::BytesWriteError(error),
        }
    }
}

impl From<H264Error> for FlvPackError {
    fn from(error: H264Error) -> Self {
        Self {
            value: FlvPackErrorValue::H264Error(error),
        }
    }
}
