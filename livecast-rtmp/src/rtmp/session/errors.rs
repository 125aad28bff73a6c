use crate::{
    bytesio::bytesio_errors::BytesIOError,
    flv::errors::FlvPackError,
    rtmp::{
        chunk::errors::{PackError, UnpackError},
        handshake::errors::HandshakeError,
        messages::errors::MessageError,
        netconnection::errors::NetConnectionError,
        netstream::errors::NetStreamError,
        protocol_control_messages::errors::ControlMessagesError,
        user_control_messages::errors::EventMessagesError,
        utils::errors::RtmpUrlParseError,
    },
};

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct SessionError {
    pub value: SessionErrorValue,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionErrorValue {
    #[error("unpack error: {0}")]
    UnPackError(#[source] UnpackError),
    #[error("pack error: {0}")]
    PackError(#[source] PackError),
    #[error("message error: {0}")]
    MessageError(#[source] MessageError),
    #[error("control message error: {0}")]
    ControlMessagesError(#[source] ControlMessagesError),
    #[error("net connection error: {0}")]
    NetConnectionError(#[source] NetConnectionError),
    #[error("net stream error: {0}")]
    NetStreamError(#[source] NetStreamError),
    #[error("event messages error: {0}")]
    EventMessagesError(#[source] EventMessagesError),
    #[error("net io error: {0}")]
    BytesIOError(#[source] BytesIOError),
    #[error("handshake error: {0}")]
    HandshakeError(#[source] HandshakeError),
    #[error("url error: {0}")]
    UrlError(#[source] RtmpUrlParseError),
    #[error("flv packetize error: {0}")]
    FlvPackError(#[source] FlvPackError),

    #[error("server rejected {command}: {code} {description}")]
    Rejected {
        command: String,
        code: String,
        description: String,
    },
    #[error("handshake timeout")]
    Timeout,
    #[error("publisher task is gone")]
    PublisherGone,
    #[error("publisher task panicked")]
    TaskPanicked,
}

impl From<SessionErrorValue> for SessionError {
    fn from(val: SessionErrorValue) -> Self {
        Self { value: val }
    }
}

macro_rules! session_error_from {
    ($($source:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$source> for SessionError {
                fn from(error: $source) -> Self {
                    Self {
                        value: SessionErrorValue::$variant(error),
                    }
                }
            }
        )+
    };
}

session_error_from! {
    UnpackError => UnPackError,
    PackError => PackError,
    MessageError => MessageError,
    ControlMessagesError => ControlMessagesError,
    NetConnectionError => NetConnectionError,
    NetStreamError => NetStreamError,
    EventMessagesError => EventMessagesError,
    BytesIOError => BytesIOError,
    HandshakeError => HandshakeError,
    RtmpUrlParseError => UrlError,
    FlvPackError => FlvPackError,
}
