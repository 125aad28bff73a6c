use {crate::flv::amf0::Amf0ValueType, bytes::BytesMut};

pub mod msg_type_id {
    pub const SET_CHUNK_SIZE: u8 = 1;
    pub const ABORT: u8 = 2;
    pub const ACKNOWLEDGEMENT: u8 = 3;
    pub const USER_CONTROL_EVENT: u8 = 4;
    pub const WIN_ACKNOWLEDGEMENT_SIZE: u8 = 5;
    pub const SET_PEER_BANDWIDTH: u8 = 6;

    pub const AUDIO: u8 = 8;
    pub const VIDEO: u8 = 9;

    pub const DATA_AMF3: u8 = 15;
    pub const SHARED_OBJ_AMF3: u8 = 16;
    pub const COMMAND_AMF3: u8 = 17;

    pub const DATA_AMF0: u8 = 18;
    pub const SHARED_OBJ_AMF0: u8 = 19;
    pub const COMMAND_AMF0: u8 = 20;

    pub const AGGREGATE: u8 = 22;
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserControlEvent {
    StreamBegin { stream_id: u32 },
    StreamEOF { stream_id: u32 },
    StreamDry { stream_id: u32 },
    SetBufferLength { stream_id: u32, buffer_length: u32 },
    StreamIsRecorded { stream_id: u32 },
    PingRequest { timestamp: u32 },
    PingResponse { timestamp: u32 },
    Unknown { event_type: u16 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RtmpMessageData {
    SetChunkSize {
        chunk_size: u32,
    },
    AbortMessage {
        chunk_stream_id: u32,
    },
    Acknowledgement {
        sequence_number: u32,
    },
    WindowAcknowledgementSize {
        size: u32,
    },
    SetPeerBandwidth {
        size: u32,
        limit_type: u8,
    },
    UserControl(UserControlEvent),
    Amf0Command {
        command_name: String,
        transaction_id: f64,
        command_object: Amf0ValueType,
        others: Vec<Amf0ValueType>,
    },
    Amf0Data {
        values: Vec<Amf0ValueType>,
    },
    AudioData {
        data: BytesMut,
    },
    VideoData {
        data: BytesMut,
    },
    Unknown {
        msg_type_id: u8,
    },
}
