use {
    super::errors::NetConnectionError,
    crate::{
        flv::amf0::{amf0_writer::Amf0Writer, Amf0Object, Amf0ValueType},
        rtmp::{
            chunk::{define::csid_type, ChunkInfo},
            messages::define::msg_type_id,
        },
    },
};

/// Capabilities advertised in `connect`.
pub const CAPABILITIES: f64 = 15.0;
/// SUPPORT_SND_AAC
pub const AUDIO_CODECS: f64 = 10.0;
/// SUPPORT_VID_H264
pub const VIDEO_CODECS: f64 = 7.0;
/// SUPPORT_VID_CLIENT_SEEK
pub const VIDEO_FUNCTION: f64 = 1.0;

/// Builds the NetConnection commands a publishing client sends.
#[derive(Default)]
pub struct NetConnection {
    amf0_writer: Amf0Writer,
}

impl NetConnection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn command(&mut self) -> ChunkInfo {
        let payload = self.amf0_writer.extract_current_bytes();
        ChunkInfo::new(
            csid_type::COMMAND_AMF0,
            0,
            0,
            payload.len() as u32,
            msg_type_id::COMMAND_AMF0,
            0,
            payload,
        )
    }

    pub fn write_connect(
        &mut self,
        transaction_id: f64,
        app: &str,
        tc_url: &str,
    ) -> Result<ChunkInfo, NetConnectionError> {
        let mut properties = Amf0Object::new();
        properties.insert("app".to_string(), Amf0ValueType::UTF8String(app.to_string()));
        properties.insert(
            "type".to_string(),
            Amf0ValueType::UTF8String("nonprivate".to_string()),
        );
        properties.insert(
            "tcUrl".to_string(),
            Amf0ValueType::UTF8String(tc_url.to_string()),
        );
        properties.insert("fpad".to_string(), Amf0ValueType::Boolean(false));
        properties.insert("capabilities".to_string(), Amf0ValueType::Number(CAPABILITIES));
        properties.insert("audioCodecs".to_string(), Amf0ValueType::Number(AUDIO_CODECS));
        properties.insert("videoCodecs".to_string(), Amf0ValueType::Number(VIDEO_CODECS));
        properties.insert(
            "videoFunction".to_string(),
            Amf0ValueType::Number(VIDEO_FUNCTION),
        );

        self.amf0_writer.write_string("connect")?;
        self.amf0_writer.write_number(transaction_id)?;
        self.amf0_writer.write_object(&properties)?;

        Ok(self.command())
    }

    pub fn write_release_stream(
        &mut self,
        transaction_id: f64,
        stream_name: &str,
    ) -> Result<ChunkInfo, NetConnectionError> {
        self.write_stream_name_command("releaseStream", transaction_id, stream_name)
    }

    pub fn write_fc_publish(
        &mut self,
        transaction_id: f64,
        stream_name: &str,
    ) -> Result<ChunkInfo, NetConnectionError> {
        self.write_stream_name_command("FCPublish", transaction_id, stream_name)
    }

    pub fn write_create_stream(
        &mut self,
        transaction_id: f64,
    ) -> Result<ChunkInfo, NetConnectionError> {
        self.amf0_writer.write_string("createStream")?;
        self.amf0_writer.write_number(transaction_id)?;
        self.amf0_writer.write_null()?;

        Ok(self.command())
    }

    fn write_stream_name_command(
        &mut self,
        name: &str,
        transaction_id: f64,
        stream_name: &str,
    ) -> Result<ChunkInfo, NetConnectionError> {
        self.amf0_writer.write_string(name)?;
        self.amf0_writer.write_number(transaction_id)?;
        self.amf0_writer.write_null()?;
        self.amf0_writer.write_string(stream_name)?;

        Ok(self.command())
    }
}

#[cfg(test)]
mod tests {
    use super::NetConnection;
    use crate::rtmp::{
        chunk::ChunkInfo,
        messages::{define::RtmpMessageData, parser::MessageParser},
    };

    fn parse(chunk: ChunkInfo) -> RtmpMessageData {
        MessageParser::new(chunk).parse().unwrap()
    }

    #[test]
    fn test_connect_fields() {
        let mut net_connection = NetConnection::new();
        let chunk = net_connection
            .write_connect(1.0, "live", "rtmp://example.com/live")
            .unwrap();
        assert_eq!(chunk.basic_header.chunk_stream_id, 3);
        assert_eq!(chunk.message_header.msg_stream_id, 0);

        let RtmpMessageData::Amf0Command {
            command_name,
            transaction_id,
            command_object,
            others,
        } = parse(chunk)
        else {
            panic!("not a command");
        };

        assert_eq!(command_name, "connect");
        assert_eq!(transaction_id, 1.0);
        assert!(others.is_empty());

        let object = command_object.as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "app",
                "type",
                "tcUrl",
                "fpad",
                "capabilities",
                "audioCodecs",
                "videoCodecs",
                "videoFunction"
            ]
        );
        assert_eq!(command_object.property("app").unwrap().as_str(), Some("live"));
        assert_eq!(
            command_object.property("tcUrl").unwrap().as_str(),
            Some("rtmp://example.com/live")
        );
        assert_eq!(
            command_object.property("capabilities").unwrap().as_f64(),
            Some(15.0)
        );
    }

    #[test]
    fn test_stream_name_commands() {
        let mut net_connection = NetConnection::new();
        for (chunk, name) in [
            (net_connection.write_release_stream(2.0, "key").unwrap(), "releaseStream"),
            (net_connection.write_fc_publish(3.0, "key").unwrap(), "FCPublish"),
        ] {
            let RtmpMessageData::Amf0Command {
                command_name,
                others,
                ..
            } = parse(chunk)
            else {
                panic!("not a command");
            };
            assert_eq!(command_name, name);
            assert_eq!(others[0].as_str(), Some("key"));
        }

        let chunk = net_connection.write_create_stream(4.0).unwrap();
        let RtmpMessageData::Amf0Command { transaction_id, .. } = parse(chunk) else {
            panic!("not a command");
        };
        assert_eq!(transaction_id, 4.0);
    }
}
