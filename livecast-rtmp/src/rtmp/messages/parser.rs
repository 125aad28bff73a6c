use {
    super::{
        define::{msg_type_id, RtmpMessageData},
        errors::{MessageError, MessageErrorValue},
    },
    crate::{
        bytesio::bytes_reader::BytesReader,
        flv::amf0::{amf0_reader::Amf0Reader, Amf0ValueType},
        rtmp::{
            chunk::ChunkInfo,
            protocol_control_messages::reader::ProtocolControlMessageReader,
            user_control_messages::reader::EventMessagesReader,
        },
    },
};

pub struct MessageParser {
    chunk_info: ChunkInfo,
}

impl MessageParser {
    #[must_use]
    pub const fn new(chunk_info: ChunkInfo) -> Self {
        Self { chunk_info }
    }

    pub fn parse(self) -> Result<RtmpMessageData, MessageError> {
        let msg_type_id = self.chunk_info.message_header.msg_type_id;
        let mut payload = self.chunk_info.payload;

        let message = match msg_type_id {
            msg_type_id::COMMAND_AMF0 | msg_type_id::COMMAND_AMF3 => {
                if msg_type_id == msg_type_id::COMMAND_AMF3 && !payload.is_empty() {
                    // AMF3 commands carry a format byte in front of plain AMF0
                    let _ = payload.split_to(1);
                }
                let values = Amf0Reader::new(BytesReader::new(payload)).read_all()?;
                Self::parse_command(values)?
            }
            msg_type_id::DATA_AMF0 | msg_type_id::DATA_AMF3 => {
                if msg_type_id == msg_type_id::DATA_AMF3 && !payload.is_empty() {
                    let _ = payload.split_to(1);
                }
                RtmpMessageData::Amf0Data {
                    values: Amf0Reader::new(BytesReader::new(payload)).read_all()?,
                }
            }
            msg_type_id::SET_CHUNK_SIZE => RtmpMessageData::SetChunkSize {
                chunk_size: ProtocolControlMessageReader::new(BytesReader::new(payload))
                    .read_set_chunk_size()?,
            },
            msg_type_id::ABORT => RtmpMessageData::AbortMessage {
                chunk_stream_id: ProtocolControlMessageReader::new(BytesReader::new(payload))
                    .read_abort_message()?,
            },
            msg_type_id::ACKNOWLEDGEMENT => RtmpMessageData::Acknowledgement {
                sequence_number: ProtocolControlMessageReader::new(BytesReader::new(payload))
                    .read_acknowledgement()?,
            },
            msg_type_id::WIN_ACKNOWLEDGEMENT_SIZE => RtmpMessageData::WindowAcknowledgementSize {
                size: ProtocolControlMessageReader::new(BytesReader::new(payload))
                    .read_window_acknowledgement_size()?,
            },
            msg_type_id::SET_PEER_BANDWIDTH => {
                let (size, limit_type) =
                    ProtocolControlMessageReader::new(BytesReader::new(payload))
                        .read_set_peer_bandwidth()?;
                RtmpMessageData::SetPeerBandwidth { size, limit_type }
            }
            msg_type_id::USER_CONTROL_EVENT => RtmpMessageData::UserControl(
                EventMessagesReader::new(BytesReader::new(payload)).parse_event()?,
            ),
            msg_type_id::AUDIO => RtmpMessageData::AudioData { data: payload },
            msg_type_id::VIDEO => RtmpMessageData::VideoData { data: payload },
            _ => RtmpMessageData::Unknown { msg_type_id },
        };

        Ok(message)
    }

    /// `name, transaction id, command object, ...arguments`
    fn parse_command(values: Vec<Amf0ValueType>) -> Result<RtmpMessageData, MessageError> {
        let mut values = values.into_iter();

        let command_name = match values.next() {
            Some(Amf0ValueType::UTF8String(name)) => name,
            _ => return Err(MessageErrorValue::MissingCommandName.into()),
        };
        let transaction_id = values
            .next()
            .and_then(|value| value.as_f64())
            .unwrap_or_default();
        let command_object = values.next().unwrap_or(Amf0ValueType::Null);

        Ok(RtmpMessageData::Amf0Command {
            command_name,
            transaction_id,
            command_object,
            others: values.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::MessageParser;
    use crate::{
        flv::amf0::{amf0_writer::Amf0Writer, Amf0ValueType},
        rtmp::{
            chunk::ChunkInfo,
            messages::define::{msg_type_id, RtmpMessageData, UserControlEvent},
        },
    };
    use bytes::BytesMut;

    fn chunk(msg_type_id: u8, payload: BytesMut) -> ChunkInfo {
        ChunkInfo::new(3, 0, 0, payload.len() as u32, msg_type_id, 0, payload)
    }

    #[test]
    fn test_parse_create_stream_result() {
        let mut writer = Amf0Writer::new();
        writer.write_string("_result").unwrap();
        writer.write_number(4.0).unwrap();
        writer.write_null().unwrap();
        writer.write_number(1.0).unwrap();

        let message = MessageParser::new(chunk(msg_type_id::COMMAND_AMF0, writer.extract_current_bytes()))
            .parse()
            .unwrap();

        assert_eq!(
            message,
            RtmpMessageData::Amf0Command {
                command_name: "_result".to_string(),
                transaction_id: 4.0,
                command_object: Amf0ValueType::Null,
                others: vec![Amf0ValueType::Number(1.0)],
            }
        );
    }

    #[test]
    fn test_parse_control_messages() {
        let message = MessageParser::new(chunk(
            msg_type_id::SET_CHUNK_SIZE,
            BytesMut::from(&[0x80, 0x00, 0x10, 0x00][..]),
        ))
        .parse()
        .unwrap();
        assert_eq!(message, RtmpMessageData::SetChunkSize { chunk_size: 4096 });

        let message = MessageParser::new(chunk(
            msg_type_id::SET_PEER_BANDWIDTH,
            BytesMut::from(&[0x00, 0x26, 0x25, 0xA0, 0x02][..]),
        ))
        .parse()
        .unwrap();
        assert_eq!(
            message,
            RtmpMessageData::SetPeerBandwidth {
                size: 2_500_000,
                limit_type: 2
            }
        );

        let message = MessageParser::new(chunk(
            msg_type_id::USER_CONTROL_EVENT,
            BytesMut::from(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x01][..]),
        ))
        .parse()
        .unwrap();
        assert_eq!(
            message,
            RtmpMessageData::UserControl(UserControlEvent::StreamBegin { stream_id: 1 })
        );
    }

    #[test]
    fn test_command_without_name() {
        let mut writer = Amf0Writer::new();
        writer.write_number(1.0).unwrap();
        let result =
            MessageParser::new(chunk(msg_type_id::COMMAND_AMF0, writer.extract_current_bytes()))
                .parse();
        assert!(result.is_err());

        let message = MessageParser::new(chunk(42, BytesMut::new())).parse().unwrap();
        assert_eq!(message, RtmpMessageData::Unknown { msg_type_id: 42 });
    }
}
