//! Connect button behaviour.

use livecast_core::{BroadcastSession, Result, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectAction {
    Start,
    End,
}

/// Button caption for a session state. `Error` reads like a disconnect.
#[must_use]
pub const fn button_label(state: SessionState) -> &'static str {
    match state {
        SessionState::Starting => "Connecting",
        SessionState::Started => "Disconnect",
        _ => "Connect",
    }
}

#[must_use]
pub const fn connect_action(state: SessionState) -> ConnectAction {
    match state {
        SessionState::None
        | SessionState::PreviewStarted
        | SessionState::Ended
        | SessionState::Error => ConnectAction::Start,
        SessionState::Starting | SessionState::Started => ConnectAction::End,
    }
}

/// Start or end the session depending on its state.
pub async fn press_connect(
    session: &BroadcastSession,
    url: &str,
    stream_key: &str,
) -> Result<ConnectAction> {
    let action = connect_action(session.state());
    match action {
        ConnectAction::Start => session.start_rtmp_session(url, stream_key)?,
        ConnectAction::End => session.end_rtmp_session().await,
    }
    Ok(action)
}
