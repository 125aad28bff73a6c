use {
    super::errors::NetStreamError,
    crate::{
        flv::amf0::{amf0_writer::Amf0Writer, Amf0Object, Amf0ValueType},
        rtmp::{
            chunk::{define::csid_type, ChunkInfo},
            messages::define::msg_type_id,
        },
    },
};

/// Stream description sent in `onMetaData` once publishing starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamMetadata {
    pub width: u32,
    pub height: u32,
    /// Bits per second.
    pub video_bitrate: u32,
    pub frame_rate: f64,
    pub audio_sample_rate: u32,
    pub stereo: bool,
}

/// Advertised AAC rate in kbps.
const AUDIO_DATA_RATE: f64 = 131_152.0 / 1024.0;

#[derive(Default)]
pub struct NetStreamWriter {
    amf0_writer: Amf0Writer,
}

impl NetStreamWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn message(&mut self, csid: u32, msg_type_id: u8, msg_stream_id: u32) -> ChunkInfo {
        let payload = self.amf0_writer.extract_current_bytes();
        ChunkInfo::new(
            csid,
            0,
            0,
            payload.len() as u32,
            msg_type_id,
            msg_stream_id,
            payload,
        )
    }

    pub fn write_publish(
        &mut self,
        transaction_id: f64,
        msg_stream_id: u32,
        stream_name: &str,
    ) -> Result<ChunkInfo, NetStreamError> {
        self.amf0_writer.write_string("publish")?;
        self.amf0_writer.write_number(transaction_id)?;
        self.amf0_writer.write_null()?;
        self.amf0_writer.write_string(stream_name)?;
        self.amf0_writer.write_string("live")?;

        Ok(self.message(
            csid_type::COMMAND_AMF0,
            msg_type_id::COMMAND_AMF0,
            msg_stream_id,
        ))
    }

    pub fn write_delete_stream(
        &mut self,
        transaction_id: f64,
        stream_id: u32,
    ) -> Result<ChunkInfo, NetStreamError> {
        self.amf0_writer.write_string("deleteStream")?;
        self.amf0_writer.write_number(transaction_id)?;
        self.amf0_writer.write_null()?;
        self.amf0_writer.write_number(f64::from(stream_id))?;

        Ok(self.message(csid_type::COMMAND_AMF0, msg_type_id::COMMAND_AMF0, 0))
    }

    /// `@setDataFrame onMetaData {…}` as an AMF0 data message on the audio chunk stream.
    pub fn write_metadata(
        &mut self,
        msg_stream_id: u32,
        metadata: &StreamMetadata,
    ) -> Result<ChunkInfo, NetStreamError> {
        let mut properties = Amf0Object::new();
        let mut number = |key: &str, value: f64| {
            properties.insert(key.to_string(), Amf0ValueType::Number(value));
        };
        number("duration", 0.0);
        number("width", f64::from(metadata.width));
        number("height", f64::from(metadata.height));
        number("videodatarate", f64::from(metadata.video_bitrate) / 1024.0);
        number("framerate", metadata.frame_rate);
        number("videocodecid", 7.0);
        number("audiodatarate", AUDIO_DATA_RATE);
        number("audiosamplerate", f64::from(metadata.audio_sample_rate));
        number("audiosamplesize", 16.0);
        properties.insert("stereo".to_string(), Amf0ValueType::Boolean(metadata.stereo));
        properties.insert("audiocodecid".to_string(), Amf0ValueType::Number(10.0));
        properties.insert("filesize".to_string(), Amf0ValueType::Number(0.0));

        self.amf0_writer.write_string("@setDataFrame")?;
        self.amf0_writer.write_string("onMetaData")?;
        self.amf0_writer.write_ecma_array(&properties)?;

        Ok(self.message(csid_type::AUDIO, msg_type_id::DATA_AMF0, msg_stream_id))
    }
}
