use {
    super::{
        define::{self, chunk_type},
        errors::{PackError, PackErrorValue},
        ChunkInfo, ChunkMessageHeader, ExtendTimestampType,
    },
    crate::bytesio::bytes_writer::BytesWriter,
    byteorder::{BigEndian, LittleEndian},
    bytes::BytesMut,
    std::collections::HashMap,
};

/// Splits outgoing messages into chunks, compressing headers against the
/// previous message sent on the same chunk stream.
pub struct ChunkPacketizer {
    csid_2_chunk_header: HashMap<u32, ChunkMessageHeader>,
    max_chunk_size: usize,
}

impl Default for ChunkPacketizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkPacketizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            csid_2_chunk_header: HashMap::new(),
            max_chunk_size: define::INIT_CHUNK_SIZE as usize,
        }
    }

    pub fn update_max_chunk_size(&mut self, chunk_size: usize) {
        tracing::trace!("update outgoing chunk size: {chunk_size}");
        self.max_chunk_size = chunk_size.max(1);
    }

    #[must_use]
    pub const fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    fn write_basic_header(writer: &mut BytesWriter, fmt: u8, csid: u32) -> Result<(), PackError> {
        match csid {
            2..=63 => {
                writer.write_u8((fmt << 6) | csid as u8)?;
            }
            64..=319 => {
                writer.write_u8(fmt << 6)?;
                writer.write_u8((csid - 64) as u8)?;
            }
            320..=65599 => {
                writer.write_u8((fmt << 6) | 1)?;
                writer.write_u16::<LittleEndian>((csid - 64) as u16)?;
            }
            _ => return Err(PackErrorValue::InvalidChunkStreamId(csid).into()),
        }
        Ok(())
    }

    /// Pick the header format for the first chunk of `header`, based on the
    /// previous message of the same chunk stream.
    fn choose_format(&self, csid: u32, header: &ChunkMessageHeader) -> (u8, u32) {
        match self.csid_2_chunk_header.get(&csid) {
            Some(prev)
                if prev.msg_stream_id == header.msg_stream_id
                    && header.timestamp >= prev.timestamp =>
            {
                (chunk_type::TYPE_1, header.timestamp - prev.timestamp)
            }
            _ => (chunk_type::TYPE_0, header.timestamp),
        }
    }

    pub fn write_chunk(&mut self, chunk_info: &ChunkInfo) -> Result<BytesMut, PackError> {
        let csid = chunk_info.basic_header.chunk_stream_id;
        let payload = &chunk_info.payload;

        let msg_length = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= 0xFF_FFFF)
            .ok_or(PackErrorValue::MessageTooLarge(payload.len()))?;

        let mut header = chunk_info.message_header.clone();
        header.msg_length = msg_length;

        let (fmt, timestamp_field) = self.choose_format(csid, &header);
        let extended = timestamp_field >= define::EXTENDED_TIMESTAMP;
        header.timestamp_delta = if fmt == chunk_type::TYPE_0 {
            0
        } else {
            timestamp_field
        };
        header.extended_timestamp_type = match (extended, fmt) {
            (false, _) => ExtendTimestampType::NONE,
            (true, chunk_type::TYPE_0) => ExtendTimestampType::FORMAT0,
            (true, _) => ExtendTimestampType::FORMAT12,
        };

        let chunk_count = payload.len().div_ceil(self.max_chunk_size).max(1);
        let mut writer = BytesWriter::with_capacity(payload.len() + chunk_count * 8 + 16);

        Self::write_basic_header(&mut writer, fmt, csid)?;
        writer.write_u24::<BigEndian>(timestamp_field.min(define::EXTENDED_TIMESTAMP))?;
        writer.write_u24::<BigEndian>(msg_length)?;
        writer.write_u8(header.msg_type_id)?;
        if fmt == chunk_type::TYPE_0 {
            writer.write_u32::<LittleEndian>(header.msg_stream_id)?;
        }
        if extended {
            writer.write_u32::<BigEndian>(timestamp_field)?;
        }

        for (index, piece) in payload.chunks(self.max_chunk_size).enumerate() {
            if index > 0 {
                Self::write_basic_header(&mut writer, chunk_type::TYPE_3, csid)?;
                if extended {
                    writer.write_u32::<BigEndian>(timestamp_field)?;
                }
            }
            writer.write(piece)?;
        }

        self.csid_2_chunk_header.insert(csid, header);

        Ok(writer.extract_current_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::ChunkPacketizer;
    use crate::rtmp::chunk::ChunkInfo;
    use bytes::BytesMut;

    #[test]
    fn test_single_chunk_format0() {
        let mut packetizer = ChunkPacketizer::new();
        let chunk = ChunkInfo::new(2, 0, 0, 4, 1, 0, BytesMut::from(&[0, 0, 16, 0][..]));
        let data = packetizer.write_chunk(&chunk).unwrap();
        assert_eq!(
            &data[..],
            &[0x02, 0, 0, 0, 0, 0, 4, 1, 0, 0, 0, 0, 0, 0, 16, 0]
        );
    }

    #[test]
    fn test_second_message_uses_format1() {
        let mut packetizer = ChunkPacketizer::new();
        let first = ChunkInfo::new(6, 0, 1000, 2, 9, 1, BytesMut::from(&[1, 2][..]));
        packetizer.write_chunk(&first).unwrap();

        let second = ChunkInfo::new(6, 0, 1040, 1, 9, 1, BytesMut::from(&[3][..]));
        let data = packetizer.write_chunk(&second).unwrap();
        assert_eq!(&data[..], &[0x46, 0, 0, 40, 0, 0, 1, 9, 3]);
    }

    #[test]
    fn test_split_and_csid_forms() {
        let mut packetizer = ChunkPacketizer::new();
        let payload = BytesMut::from(&[7_u8; 200][..]);
        let chunk = ChunkInfo::new(100, 0, 0, 200, 8, 1, payload);
        let data = packetizer.write_chunk(&chunk).unwrap();

        // 2 byte basic header + 11 byte message header + 128, then 2 + 72
        assert_eq!(data.len(), 2 + 11 + 128 + 2 + 72);
        assert_eq!(&data[..2], &[0x00, 36]);
        assert_eq!(&data[141..143], &[0xC0, 36]);

        let chunk = ChunkInfo::new(70000, 0, 0, 1, 8, 1, BytesMut::from(&[0][..]));
        assert!(packetizer.write_chunk(&chunk).is_err());
    }
}
