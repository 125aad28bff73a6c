//! Broadcast session facade over the RTMP publisher: frame processing,
//! adaptive bitrate, configuration and logging.

pub mod audio_mixer;
pub mod bitrate;
pub mod config;
pub mod error;
pub mod filters;
pub mod logging;
pub mod pixel_buffer;
pub mod session;
pub mod sources;
pub mod transforms;

pub use audio_mixer::{AudioMixer, SourceId};
pub use config::Config;
pub use error::{Error, Result};
pub use filters::VideoFilter;
pub use pixel_buffer::PixelBuffer;
pub use session::{BroadcastSession, SessionDelegate, SessionState};
