use crate::flv::amf0::errors::Amf0WriteError;

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct NetConnectionError {
    pub value: NetConnectionErrorValue,
}

#[derive(Debug, thiserror::Error)]
pub enum NetConnectionErrorValue {
    #[error("amf0 write error: {0}")]
    Amf0WriteError(Amf0WriteError),
}

impl From<Amf0WriteError> for NetConnectionError {
    fn from(error: Amf0WriteError) -> Self {
        Self {
            value: NetConnectionErrorValue::Amf0WriteError(error),
        }
    }
}
