pub mod define;
pub mod errors;
pub mod packetizer;
pub mod unpacketizer;

use bytes::BytesMut;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum ExtendTimestampType {
    /// No extended timestamp field.
    #[default]
    NONE,
    /// The extended field carries an absolute timestamp (format 0).
    FORMAT0,
    /// The extended field carries a timestamp delta (format 1 or 2).
    FORMAT12,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ChunkBasicHeader {
    pub format: u8,
    pub chunk_stream_id: u32,
}

impl ChunkBasicHeader {
    #[must_use]
    pub const fn new(fmt: u8, csid: u32) -> Self {
        Self {
            format: fmt,
            chunk_stream_id: csid,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ChunkMessageHeader {
    /// Absolute timestamp of the message.
    pub timestamp: u32,
    pub msg_length: u32,
    pub msg_type_id: u8,
    pub msg_stream_id: u32,
    pub timestamp_delta: u32,
    pub extended_timestamp_type: ExtendTimestampType,
}

impl ChunkMessageHeader {
    #[must_use]
    pub fn new(timestamp: u32, msg_length: u32, msg_type_id: u8, msg_stream_id: u32) -> Self {
        Self {
            timestamp,
            msg_length,
            msg_type_id,
            msg_stream_id,
            ..Default::default()
        }
    }
}

/// A complete message: the header of its first chunk plus the reassembled payload.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ChunkInfo {
    pub basic_header: ChunkBasicHeader,
    pub message_header: ChunkMessageHeader,
    pub payload: BytesMut,
}

impl ChunkInfo {
    #[must_use]
    pub fn new(
        csid: u32,
        format: u8,
        timestamp: u32,
        msg_length: u32,
        msg_type_id: u8,
        msg_stream_id: u32,
        payload: BytesMut,
    ) -> Self {
        Self {
            basic_header: ChunkBasicHeader::new(format, csid),
            message_header: ChunkMessageHeader::new(timestamp, msg_length, msg_type_id, msg_stream_id),
            payload,
        }
    }
}
