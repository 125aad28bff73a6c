pub const INIT_CHUNK_SIZE: u32 = 128;
/// Outgoing chunk size announced right after the handshake.
pub const DEFAULT_OUT_CHUNK_SIZE: u32 = 4096;
/// Largest value a SetChunkSize message may carry.
pub const MAX_CHUNK_SIZE: u32 = 0x7FFF_FFFF;

pub mod csid_type {
    pub const PROTOCOL_USER_CONTROL: u32 = 2;
    pub const COMMAND_AMF0: u32 = 3;
    pub const AUDIO: u32 = 4;
    pub const VIDEO: u32 = 6;
}

pub mod chunk_type {
    pub const TYPE_0: u8 = 0;
    pub const TYPE_1: u8 = 1;
    pub const TYPE_2: u8 = 2;
    pub const TYPE_3: u8 = 3;
}

pub const EXTENDED_TIMESTAMP: u32 = 0xFF_FFFF;
