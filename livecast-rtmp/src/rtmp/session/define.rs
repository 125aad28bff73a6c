use std::{fmt, time::Duration};

use crate::rtmp::{chunk::define::DEFAULT_OUT_CHUNK_SIZE, netstream::writer::StreamMetadata};

/// Progress of an RTMP publishing client. The order is the order states are
/// reached in; `Error` and `NotConnected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ClientState {
    #[default]
    None,
    Connected,
    Handshake0,
    Handshake1s0,
    Handshake1s1,
    Handshake2,
    HandshakeComplete,
    FcPublish,
    Ready,
    SessionStarted,
    Error,
    NotConnected,
}

impl ClientState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::NotConnected)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub mod transaction {
    pub const CONNECT: &str = "connect";
    pub const RELEASE_STREAM: &str = "releaseStream";
    pub const FC_PUBLISH: &str = "FCPublish";
    pub const CREATE_STREAM: &str = "createStream";
    pub const PUBLISH: &str = "publish";
    pub const DELETE_STREAM: &str = "deleteStream";
}

pub const NETSTREAM_PUBLISH_START: &str = "NetStream.Publish.Start";
pub const NETSTREAM_PUBLISH_BADNAME: &str = "NetStream.Publish.BadName";

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
    pub out_chunk_size: u32,
    /// Capacity of the media channel between producers and the publisher task.
    pub media_queue_capacity: usize,
    pub metadata: StreamMetadata,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
            out_chunk_size: DEFAULT_OUT_CHUNK_SIZE,
            media_queue_capacity: 512,
            metadata: StreamMetadata {
                width: 1280,
                height: 720,
                video_bitrate: 1_000_000,
                frame_rate: 30.0,
                audio_sample_rate: 44100,
                stereo: true,
            },
        }
    }
}
