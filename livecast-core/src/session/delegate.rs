use std::time::Duration;

use bytes::Bytes;

use super::SessionState;
use crate::{error::Result, pixel_buffer::PixelBuffer};

/// Receives session notifications. Held weakly by the session.
pub trait SessionDelegate: Send + Sync {
    fn connection_status_changed(&self, state: SessionState);

    /// Predicted throughput, reported each sample period while adaptive
    /// bitrate is on.
    fn detected_throughput(&self, _bytes_per_second: u64) {}
}

/// One encoded H.264 NAL unit, Annex-B or length prefixed.
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    pub data: Bytes,
    pub pts: Duration,
    pub dts: Duration,
}

pub trait VideoEncoder: Send {
    fn encode(&mut self, frame: &PixelBuffer, pts: Duration) -> Result<Vec<EncodedVideo>>;

    /// Bits per second.
    fn bitrate(&self) -> u32;

    fn set_bitrate(&mut self, bitrate: u32);
}

/// One raw AAC frame.
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    pub data: Bytes,
    pub timestamp: Duration,
}

pub trait AudioEncoder: Send {
    /// Encode interleaved samples; frames come out once enough input is buffered.
    fn encode(&mut self, samples: &[i16], timestamp: Duration) -> Result<Vec<EncodedAudio>>;

    fn bitrate(&self) -> u32;

    fn set_bitrate(&mut self, bitrate: u32);
}
