use {
    super::{define, errors::EventMessagesError},
    crate::{
        bytesio::bytes_writer::BytesWriter,
        rtmp::{
            chunk::{define::csid_type, ChunkInfo},
            messages::define::msg_type_id,
        },
    },
    byteorder::BigEndian,
};

fn event_message(event_type: u16, fields: &[u32]) -> Result<ChunkInfo, EventMessagesError> {
    let mut writer = BytesWriter::with_capacity(2 + fields.len() * 4);
    writer.write_u16::<BigEndian>(event_type)?;
    for field in fields {
        writer.write_u32::<BigEndian>(*field)?;
    }
    let payload = writer.extract_current_bytes();

    Ok(ChunkInfo::new(
        csid_type::PROTOCOL_USER_CONTROL,
        0,
        0,
        payload.len() as u32,
        msg_type_id::USER_CONTROL_EVENT,
        0,
        payload,
    ))
}

/// Answer to a server ping, echoing its timestamp.
pub fn write_ping_response(timestamp: u32) -> Result<ChunkInfo, EventMessagesError> {
    event_message(define::RTMP_EVENT_PING_RESPONSE, &[timestamp])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bytesio::bytes_reader::BytesReader,
        rtmp::{messages::define::UserControlEvent, user_control_messages::reader::EventMessagesReader},
    };

    #[test]
    fn test_ping_response() {
        let chunk = write_ping_response(0x0102_0304).unwrap();
        assert_eq!(&chunk.payload[..], &[0x00, 0x07, 0x01, 0x02, 0x03, 0x04]);

        let mut reader = EventMessagesReader::new(BytesReader::new(chunk.payload));
        assert_eq!(
            reader.parse_event().unwrap(),
            UserControlEvent::PingResponse {
                timestamp: 0x0102_0304
            }
        );
    }

    #[test]
    fn test_unknown_event() {
        let payload = [0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x0B, 0xB8];
        let mut reader =
            EventMessagesReader::new(BytesReader::new(bytes::BytesMut::from(&payload[..])));
        assert_eq!(
            reader.parse_event().unwrap(),
            UserControlEvent::SetBufferLength {
                stream_id: 1,
                buffer_length: 3000
            }
        );

        let mut reader =
            EventMessagesReader::new(BytesReader::new(bytes::BytesMut::from(&[0x00, 0x20][..])));
        assert_eq!(
            reader.parse_event().unwrap(),
            UserControlEvent::Unknown { event_type: 0x20 }
        );
    }
}
