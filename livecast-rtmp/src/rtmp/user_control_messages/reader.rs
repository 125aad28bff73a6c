use {
    super::{define::*, errors::EventMessagesError},
    crate::{bytesio::bytes_reader::BytesReader, rtmp::messages::define::UserControlEvent},
    byteorder::BigEndian,
};

pub struct EventMessagesReader {
    reader: BytesReader,
}

impl EventMessagesReader {
    #[must_use]
    pub const fn new(reader: BytesReader) -> Self {
        Self { reader }
    }

    pub fn parse_event(&mut self) -> Result<UserControlEvent, EventMessagesError> {
        let event_type = self.reader.read_u16::<BigEndian>()?;

        let event = match event_type {
            RTMP_EVENT_STREAM_BEGIN => UserControlEvent::StreamBegin {
                stream_id: self.reader.read_u32::<BigEndian>()?,
            },
            RTMP_EVENT_STREAM_EOF => UserControlEvent::StreamEOF {
                stream_id: self.reader.read_u32::<BigEndian>()?,
            },
            RTMP_EVENT_STREAM_DRY => UserControlEvent::StreamDry {
                stream_id: self.reader.read_u32::<BigEndian>()?,
            },
            RTMP_EVENT_SET_BUFFER_LENGTH => UserControlEvent::SetBufferLength {
                stream_id: self.reader.read_u32::<BigEndian>()?,
                buffer_length: self.reader.read_u32::<BigEndian>()?,
            },
            RTMP_EVENT_STREAM_IS_RECORDED => UserControlEvent::StreamIsRecorded {
                stream_id: self.reader.read_u32::<BigEndian>()?,
            },
            RTMP_EVENT_PING_REQUEST => UserControlEvent::PingRequest {
                timestamp: self.reader.read_u32::<BigEndian>()?,
            },
            RTMP_EVENT_PING_RESPONSE => UserControlEvent::PingResponse {
                timestamp: self.reader.read_u32::<BigEndian>()?,
            },
            _ => UserControlEvent::Unknown { event_type },
        };

        Ok(event)
    }
}
