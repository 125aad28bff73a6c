use super::bytes_errors::BytesReadError;

#[derive(Debug, thiserror::Error)]
pub enum BitErrorValue {
    #[error("bytes read error")]
    BytesReadError(BytesReadError),
    #[error("the size is bigger than 64")]
    TooBig,
    #[error("exp-golomb code longer than 32 leading zeros")]
    GolombOverflow,
    #[error("cannot read bit, stream exhausted")]
    CannotReadBit,
}

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct BitError {
    pub value: BitErrorValue,
}

impl From<BitErrorValue> for BitError {
    fn from(val: BitErrorValue) -> Self {
        Self { value: val }
    }
}

impl From<BytesReadError> for BitError {
    fn from(error: BytesReadError) -> Self {
        Self {
            value: BitErrorValue::BytesReadError(error),
        }
    }
}
