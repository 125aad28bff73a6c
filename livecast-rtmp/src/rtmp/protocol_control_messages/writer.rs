use {
    super::errors::{ControlMessagesError, ControlMessagesErrorValue},
    crate::{
        bytesio::bytes_writer::BytesWriter,
        rtmp::{
            chunk::{define, ChunkInfo},
            messages::define::msg_type_id,
        },
    },
    byteorder::BigEndian,
};

/// Protocol control messages always travel on chunk stream 2, message stream 0.
fn control_message(msg_type_id: u8, value: u32) -> Result<ChunkInfo, ControlMessagesError> {
    let mut writer = BytesWriter::with_capacity(4);
    writer.write_u32::<BigEndian>(value)?;
    let payload = writer.extract_current_bytes();

    Ok(ChunkInfo::new(
        define::csid_type::PROTOCOL_USER_CONTROL,
        0,
        0,
        payload.len() as u32,
        msg_type_id,
        0,
        payload,
    ))
}

pub fn write_set_chunk_size(chunk_size: u32) -> Result<ChunkInfo, ControlMessagesError> {
    if chunk_size == 0 || chunk_size > define::MAX_CHUNK_SIZE {
        return Err(ControlMessagesErrorValue::InvalidChunkSize(chunk_size).into());
    }
    control_message(msg_type_id::SET_CHUNK_SIZE, chunk_size)
}

pub fn write_acknowledgement(sequence_number: u32) -> Result<ChunkInfo, ControlMessagesError> {
    control_message(msg_type_id::ACKNOWLEDGEMENT, sequence_number)
}

pub fn write_window_acknowledgement_size(size: u32) -> Result<ChunkInfo, ControlMessagesError> {
    control_message(msg_type_id::WIN_ACKNOWLEDGEMENT_SIZE, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_chunk_size() {
        let chunk = write_set_chunk_size(4096).unwrap();
        assert_eq!(chunk.basic_header.chunk_stream_id, 2);
        assert_eq!(chunk.message_header.msg_type_id, msg_type_id::SET_CHUNK_SIZE);
        assert_eq!(&chunk.payload[..], &[0x00, 0x00, 0x10, 0x00]);

        assert!(write_set_chunk_size(0).is_err());
        assert!(write_set_chunk_size(0x8000_0000).is_err());
    }

    #[test]
    fn test_acknowledgement() {
        let chunk = write_acknowledgement(2_500_000).unwrap();
        assert_eq!(chunk.message_header.msg_type_id, msg_type_id::ACKNOWLEDGEMENT);
        assert_eq!(&chunk.payload[..], &2_500_000_u32.to_be_bytes());
    }
}
