use livecast_rtmp::{
    flv::errors::FlvPackError,
    rtmp::{session::errors::SessionError, utils::errors::RtmpUrlParseError},
};
use thiserror::Error;

use crate::session::SessionState;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("Invalid url: {0}")]
    Url(#[from] RtmpUrlParseError),

    #[error("RTMP error: {0}")]
    Rtmp(#[from] SessionError),

    #[error("Packetizer error: {0}")]
    Packetizer(#[from] FlvPackError),

    #[error("Cannot {operation} while the session is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
