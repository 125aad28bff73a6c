pub const RTMP_VERSION: u8 = 3;
pub const RTMP_HANDSHAKE_SIZE: usize = 1536;
/// Offset of the zero field echoed back in C2.
pub const C2_ZERO_OFFSET: usize = 4;
pub const TIME_FIELD_SIZE: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClientHandshakeState {
    ReadS0,
    ReadS1,
    ReadS2,
    Finish,
}

/// Progress notifications while the server side of the handshake arrives.
#[derive(Debug, PartialEq, Eq)]
pub enum HandshakeEvent {
    S0Received,
    /// S1 is in; the payload is C2, to be sent right away.
    S1Received(bytes::BytesMut),
    S2Received,
}
