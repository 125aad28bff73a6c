use crate::bytesio::bits_errors::BitError;

#[derive(Debug, thiserror::Error)]
pub enum H264ErrorValue {
    #[error("bit error: {0}")]
    BitError(BitError),
    #[error("nal unit is empty")]
    EmptyNalUnit,
    #[error("expected sps nal unit, got type {0}")]
    NotSps(u8),
    #[error("sps too short: {0} bytes")]
    SpsTooShort(usize),
    #[error("invalid sps: {0}")]
    InvalidSps(&'static str),
}

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct H264Error {
    pub value: H264ErrorValue,
}

impl From<H264ErrorValue> for H264Error {
    fn from(val: H264ErrorValue) -> Self {
        Self { value: val }
    }
}

impl From<BitError> for H264Error {
    fn from(error: BitError) -> Self {
        Self {
            value: H264ErrorValue::BitError(error),
        }
    }
}
