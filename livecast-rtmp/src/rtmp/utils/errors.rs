#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct RtmpUrlParseError {
    pub value: RtmpUrlParseErrorValue,
}

#[derive(Debug, thiserror::Error)]
pub enum RtmpUrlParseErrorValue {
    #[error("the url is not valid: {0}")]
    Notvalid(#[source] url::ParseError),
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("the url has no host")]
    MissingHost,
    #[error("the url has no application name")]
    MissingApp,
    #[error("the url has no stream name")]
    MissingStreamName,
}

impl From<RtmpUrlParseErrorValue> for RtmpUrlParseError {
    fn from(val: RtmpUrlParseErrorValue) -> Self {
        Self { value: val }
    }
}

impl From<url::ParseError> for RtmpUrlParseError {
    fn from(error: url::ParseError) -> Self {
        Self {
            value: RtmpUrlParseErrorValue::Notvalid(error),
        }
    }
}
