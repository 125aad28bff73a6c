pub mod aac_packetizer;
pub mod amf0;
pub mod avc_packetizer;
pub mod define;
pub mod errors;
