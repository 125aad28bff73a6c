pub mod aspect;
pub mod position;
pub mod split;

use std::time::Duration;

pub use aspect::{AspectMode, AspectTransform};
pub use position::{Overlay, PositionTransform, Rect};
pub use split::Split;

/// Describes the buffer handed to [`Output::push_buffer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BufferMetadata {
    /// BGRA pixels.
    Video {
        pts: Duration,
        width: u32,
        height: u32,
    },
    /// Interleaved signed 16 bit samples.
    Audio {
        timestamp: Duration,
        sample_rate: u32,
        channels: u8,
    },
}

/// A sink in the media graph.
pub trait Output: Send + Sync {
    fn push_buffer(&self, data: &[u8], metadata: &BufferMetadata);
}
