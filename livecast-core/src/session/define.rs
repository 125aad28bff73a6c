use livecast_rtmp::ClientState;
use serde::{Deserialize, Serialize};

use crate::transforms::AspectMode;

/// Lifecycle of a broadcast session as seen by its delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    None,
    PreviewStarted,
    Starting,
    Started,
    Ended,
    Error,
}

impl SessionState {
    /// States from which a new RTMP session may be started.
    #[must_use]
    pub const fn can_start(self) -> bool {
        matches!(self, Self::None | Self::PreviewStarted | Self::Ended | Self::Error)
    }
}

/// Session state reached for a publisher client state, if any.
#[must_use]
pub const fn session_state_for(client_state: ClientState) -> Option<SessionState> {
    match client_state {
        ClientState::SessionStarted => Some(SessionState::Started),
        ClientState::Error => Some(SessionState::Error),
        ClientState::NotConnected => Some(SessionState::Ended),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraState {
    Front,
    #[default]
    Back,
}

/// Optional constructor arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub use_interface_orientation: bool,
    pub camera_state: CameraState,
    pub aspect_mode: AspectMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_state_mapping() {
        assert_eq!(
            session_state_for(ClientState::SessionStarted),
            Some(SessionState::Started)
        );
        assert_eq!(session_state_for(ClientState::Error), Some(SessionState::Error));
        assert_eq!(
            session_state_for(ClientState::NotConnected),
            Some(SessionState::Ended)
        );
        for state in [
            ClientState::None,
            ClientState::Connected,
            ClientState::Handshake0,
            ClientState::HandshakeComplete,
            ClientState::FcPublish,
            ClientState::Ready,
        ] {
            assert_eq!(session_state_for(state), None);
        }
    }

    #[test]
    fn test_can_start() {
        assert!(SessionState::None.can_start());
        assert!(SessionState::Ended.can_start());
        assert!(SessionState::Error.can_start());
        assert!(!SessionState::Starting.can_start());
        assert!(!SessionState::Started.can_start());
    }
}
