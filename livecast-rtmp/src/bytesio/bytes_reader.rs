use {
    super::bytes_errors::{BytesReadError, BytesReadErrorValue},
    byteorder::ByteOrder,
    bytes::{Buf, BytesMut},
};

/// Upper bound on buffered, not yet parsed input.
const MAX_BUFFERED_BYTES: usize = 16 * 1024 * 1024;

pub struct BytesReader {
    buffer: BytesMut,
}

impl BytesReader {
    #[must_use]
    pub const fn new(input: BytesMut) -> Self {
        Self { buffer: input }
    }

    pub fn extend_from_slice(&mut self, extend: &[u8]) -> Result<(), BytesReadError> {
        let current = self.buffer.len();
        if current + extend.len() > MAX_BUFFERED_BYTES {
            return Err(BytesReadError {
                value: BytesReadErrorValue::BufferOverflow {
                    current,
                    additional: extend.len(),
                    max: MAX_BUFFERED_BYTES,
                },
            });
        }
        self.buffer.extend_from_slice(extend);
        Ok(())
    }

    pub fn read_bytes(&mut self, bytes_num: usize) -> Result<BytesMut, BytesReadError> {
        if self.buffer.len() < bytes_num {
            return Err(BytesReadError {
                value: BytesReadErrorValue::NotEnoughBytes,
            });
        }
        Ok(self.buffer.split_to(bytes_num))
    }

    pub fn advance_bytes(&mut self, bytes_num: usize) -> Result<(), BytesReadError> {
        if self.buffer.len() < bytes_num {
            return Err(BytesReadError {
                value: BytesReadErrorValue::NotEnoughBytes,
            });
        }
        self.buffer.advance(bytes_num);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, BytesReadError> {
        if self.buffer.is_empty() {
            return Err(BytesReadError {
                value: BytesReadErrorValue::NotEnoughBytes,
            });
        }
        Ok(self.buffer.get_u8())
    }

    pub fn peek_u8(&self) -> Result<u8, BytesReadError> {
        self.buffer.first().copied().ok_or(BytesReadError {
            value: BytesReadErrorValue::NotEnoughBytes,
        })
    }

    /// Look at the byte `index` positions ahead without consuming anything.
    pub fn get(&self, index: usize) -> Result<u8, BytesReadError> {
        self.buffer.get(index).copied().ok_or(BytesReadError {
            value: BytesReadErrorValue::IndexOutofRange,
        })
    }

    pub fn read_u16<T: ByteOrder>(&mut self) -> Result<u16, BytesReadError> {
        let data = self.read_bytes(2)?;
        Ok(T::read_u16(&data))
    }

    pub fn read_u24<T: ByteOrder>(&mut self) -> Result<u32, BytesReadError> {
        let data = self.read_bytes(3)?;
        Ok(T::read_u24(&data))
    }

    pub fn read_u32<T: ByteOrder>(&mut self) -> Result<u32, BytesReadError> {
        let data = self.read_bytes(4)?;
        Ok(T::read_u32(&data))
    }

    pub fn read_f64<T: ByteOrder>(&mut self) -> Result<f64, BytesReadError> {
        let data = self.read_bytes(8)?;
        Ok(T::read_f64(&data))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Copy of the unread bytes; the reader is left untouched.
    #[must_use]
    pub fn get_remaining_bytes(&self) -> BytesMut {
        self.buffer.clone()
    }

    /// Take every unread byte out of the reader.
    pub fn extract_remaining_bytes(&mut self) -> BytesMut {
        self.buffer.split_to(self.buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::BytesReader;
    use byteorder::{BigEndian, LittleEndian};
    use bytes::BytesMut;

    #[test]
    fn test_read_numbers() {
        let mut reader = BytesReader::new(BytesMut::from(
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09][..],
        ));

        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u24::<BigEndian>().unwrap(), 0x020304);
        assert_eq!(reader.read_u32::<LittleEndian>().unwrap(), 0x08070605);
        assert_eq!(reader.len(), 1);
        assert!(reader.read_u16::<BigEndian>().unwrap_err().is_not_enough_bytes());
        // a failed read must not consume anything
        assert_eq!(reader.read_u8().unwrap(), 0x09);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut reader = BytesReader::new(BytesMut::new());
        reader.extend_from_slice(&[0xAA, 0xBB]).unwrap();

        assert_eq!(reader.peek_u8().unwrap(), 0xAA);
        assert_eq!(reader.get(1).unwrap(), 0xBB);
        assert!(reader.get(2).is_err());
        assert_eq!(reader.len(), 2);
    }
}
