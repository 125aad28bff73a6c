pub mod broadcast;
pub mod define;
pub mod delegate;

pub use self::{
    broadcast::BroadcastSession,
    define::{session_state_for, CameraState, SessionOptions, SessionState},
    delegate::{AudioEncoder, EncodedAudio, EncodedVideo, SessionDelegate, VideoEncoder},
};
