use bytes::Bytes;

pub mod tag_type {
    pub const AUDIO: u8 = 8;
    pub const VIDEO: u8 = 9;
    pub const SCRIPT_DATA_AMF: u8 = 18;
}

pub mod frame_type {
    pub const KEY_FRAME: u8 = 1;
    pub const INTER_FRAME: u8 = 2;
}

pub mod codec_id {
    pub const AVC: u8 = 7;
    pub const AAC: u8 = 10;
}

pub mod avc_packet_type {
    pub const SEQUENCE_HEADER: u8 = 0;
    pub const NALU: u8 = 1;
}

pub mod aac_packet_type {
    pub const SEQUENCE_HEADER: u8 = 0;
    pub const RAW: u8 = 1;
}

pub mod sound_flags {
    pub const CODEC_AAC: u8 = 0xA0;
    pub const RATE_22050: u8 = 0x08;
    pub const RATE_44100: u8 = 0x0C;
    pub const SIZE_16BIT: u8 = 0x02;
    pub const STEREO: u8 = 0x01;
    pub const MONO: u8 = 0x00;
}

/// One FLV tag body ready to be carried in an RTMP audio or video message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlvTag {
    pub tag_type: u8,
    /// Milliseconds.
    pub timestamp: u32,
    pub data: Bytes,
    pub is_key_frame: bool,
    pub is_sequence_header: bool,
}

impl FlvTag {
    #[must_use]
    pub const fn is_video(&self) -> bool {
        self.tag_type == tag_type::VIDEO
    }

    #[must_use]
    pub const fn is_audio(&self) -> bool {
        self.tag_type == tag_type::AUDIO
    }

    /// Tags that may be discarded under back pressure.
    #[must_use]
    pub const fn is_droppable(&self) -> bool {
        self.is_video() && !self.is_key_frame && !self.is_sequence_header
    }
}
