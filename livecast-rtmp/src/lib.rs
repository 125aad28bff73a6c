//! RTMP publishing: chunk stream, simple handshake, AMF0 commands, FLV tag
//! packetizers for H.264/AAC and TCP throughput adaptation.

pub mod bytesio;
pub mod flv;
pub mod h264;
pub mod rtmp;
pub mod throughput;

pub use rtmp::{
    session::{
        ClientState, MediaSender, PublisherConfig, PublisherStats, PushOutcome, RtmpPublisher,
    },
    utils::RtmpUrl,
};
