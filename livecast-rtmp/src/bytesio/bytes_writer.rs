use {
    super::bytes_errors::{BytesWriteError, BytesWriteErrorValue},
    byteorder::ByteOrder,
    bytes::BytesMut,
};

#[derive(Default)]
pub struct BytesWriter {
    bytes: BytesMut,
}

impl BytesWriter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: BytesMut::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, byte: u8) -> Result<(), BytesWriteError> {
        self.bytes.extend_from_slice(&[byte]);
        Ok(())
    }

    pub fn write_u16<T: ByteOrder>(&mut self, bytes: u16) -> Result<(), BytesWriteError> {
        let mut buf = [0_u8; 2];
        T::write_u16(&mut buf, bytes);
        self.bytes.extend_from_slice(&buf);
        Ok(())
    }

    pub fn write_u24<T: ByteOrder>(&mut self, bytes: u32) -> Result<(), BytesWriteError> {
        if bytes > 0x00FF_FFFF {
            return Err(BytesWriteError {
                value: BytesWriteErrorValue::U24Overflow(bytes),
            });
        }
        let mut buf = [0_u8; 3];
        T::write_u24(&mut buf, bytes);
        self.bytes.extend_from_slice(&buf);
        Ok(())
    }

    pub fn write_u32<T: ByteOrder>(&mut self, bytes: u32) -> Result<(), BytesWriteError> {
        let mut buf = [0_u8; 4];
        T::write_u32(&mut buf, bytes);
        self.bytes.extend_from_slice(&buf);
        Ok(())
    }

    pub fn write_f64<T: ByteOrder>(&mut self, bytes: f64) -> Result<(), BytesWriteError> {
        let mut buf = [0_u8; 8];
        T::write_f64(&mut buf, bytes);
        self.bytes.extend_from_slice(&buf);
        Ok(())
    }

    pub fn write(&mut self, buf: &[u8]) -> Result<(), BytesWriteError> {
        self.bytes.extend_from_slice(buf);
        Ok(())
    }

    /// Overwrite one already written byte.
    pub fn set_u8(&mut self, position: usize, byte: u8) -> Result<(), BytesWriteError> {
        match self.bytes.get_mut(position) {
            Some(slot) => {
                *slot = byte;
                Ok(())
            }
            None => Err(BytesWriteError {
                value: BytesWriteErrorValue::OutofIndex,
            }),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn get_current_bytes(&self) -> BytesMut {
        self.bytes.clone()
    }

    pub fn extract_current_bytes(&mut self) -> BytesMut {
        self.bytes.split_to(self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::BytesWriter;
    use byteorder::{BigEndian, LittleEndian};

    #[test]
    fn test_write_numbers() {
        let mut writer = BytesWriter::new();
        writer.write_u8(0x01).unwrap();
        writer.write_u24::<BigEndian>(0x020304).unwrap();
        writer.write_u32::<LittleEndian>(0x08070605).unwrap();

        assert_eq!(
            &writer.extract_current_bytes()[..],
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
        assert!(writer.is_empty());
    }

    #[test]
    fn test_u24_overflow() {
        let mut writer = BytesWriter::new();
        assert!(writer.write_u24::<BigEndian>(0x0100_0000).is_err());
        assert!(writer.is_empty());
    }
}
