use {
    super::errors::ProtocolControlMessageReaderError,
    crate::bytesio::bytes_reader::BytesReader,
    byteorder::BigEndian,
};

pub struct ProtocolControlMessageReader {
    reader: BytesReader,
}

impl ProtocolControlMessageReader {
    #[must_use]
    pub const fn new(reader: BytesReader) -> Self {
        Self { reader }
    }

    /// The top bit is reserved and must be ignored.
    pub fn read_set_chunk_size(&mut self) -> Result<u32, ProtocolControlMessageReaderError> {
        Ok(self.reader.read_u32::<BigEndian>()? & 0x7FFF_FFFF)
    }

    pub fn read_abort_message(&mut self) -> Result<u32, ProtocolControlMessageReaderError> {
        Ok(self.reader.read_u32::<BigEndian>()?)
    }

    pub fn read_acknowledgement(&mut self) -> Result<u32, ProtocolControlMessageReaderError> {
        Ok(self.reader.read_u32::<BigEndian>()?)
    }

    pub fn read_window_acknowledgement_size(
        &mut self,
    ) -> Result<u32, ProtocolControlMessageReaderError> {
        Ok(self.reader.read_u32::<BigEndian>()?)
    }

    pub fn read_set_peer_bandwidth(
        &mut self,
    ) -> Result<(u32, u8), ProtocolControlMessageReaderError> {
        let size = self.reader.read_u32::<BigEndian>()?;
        let limit_type = self.reader.read_u8()?;
        Ok((size, limit_type))
    }
}
