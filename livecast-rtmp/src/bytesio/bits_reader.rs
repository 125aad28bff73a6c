use {
    super::bits_errors::{BitError, BitErrorValue},
    bytes::BytesMut,
};

/// MSB-first bit reader with exp-Golomb helpers for H.264 headers.
pub struct BitsReader {
    data: BytesMut,
    bit_position: usize,
}

impl BitsReader {
    #[must_use]
    pub const fn new(data: BytesMut) -> Self {
        Self {
            data,
            bit_position: 0,
        }
    }

    #[must_use]
    pub fn bits_remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_position)
    }


    pub fn read_bit(&mut self) -> Result<u8, BitError> {
        let byte_index = self.bit_position / 8;
        let byte = *self.data.get(byte_index).ok_or(BitError {
            value: BitErrorValue::CannotReadBit,
        })?;

        let shift = 7 - (self.bit_position % 8);
        self.bit_position += 1;

        Ok((byte >> shift) & 0x01)
    }

    pub fn read_n_bits(&mut self, n: usize) -> Result<u64, BitError> {
        if n > 64 {
            return Err(BitError {
                value: BitErrorValue::TooBig,
            });
        }
        if n > self.bits_remaining() {
            return Err(BitError {
                value: BitErrorValue::CannotReadBit,
            });
        }

        let mut result: u64 = 0;
        for _ in 0..n {
            result <<= 1;
            result |= u64::from(self.read_bit()?);
        }
        Ok(result)
    }

    /// Unsigned exp-Golomb, `ue(v)`.
    pub fn read_ue(&mut self) -> Result<u32, BitError> {
        let mut leading_zeros = 0;
        while self.read_bit()? == 0 {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(BitError {
                    value: BitErrorValue::GolombOverflow,
                });
            }
        }

        let suffix = self.read_n_bits(leading_zeros)?;
        let value = (1_u64 << leading_zeros) - 1 + suffix;
        u32::try_from(value).map_err(|_| BitError {
            value: BitErrorValue::GolombOverflow,
        })
    }

    /// Signed exp-Golomb, `se(v)`: 1, -1, 2, -2, ...
    pub fn read_se(&mut self) -> Result<i32, BitError> {
        let code = self.read_ue()?;
        let magnitude = i32::try_from(code.div_ceil(2)).map_err(|_| BitError {
            value: BitErrorValue::GolombOverflow,
        })?;
        if code % 2 == 1 {
            Ok(magnitude)
        } else {
            Ok(-magnitude)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BitsReader;
    use bytes::BytesMut;

    #[test]
    fn test_read_bits() {
        let mut reader = BitsReader::new(BytesMut::from(&[0b1010_0000, 0xFF][..]));
        assert_eq!(reader.read_bit().unwrap(), 1);
        assert_eq!(reader.read_bit().unwrap(), 0);
        assert_eq!(reader.read_n_bits(2).unwrap(), 0b10);
        assert_eq!(reader.read_n_bits(4).unwrap(), 0);
        assert_eq!(reader.read_n_bits(8).unwrap(), 0xFF);
        assert!(reader.read_bit().is_err());
    }

    #[test]
    fn test_exp_golomb() {
        // ue: 1 -> 0, 010 -> 1, 011 -> 2, 00100 -> 3
        // bits: 1 010 011 00100 -> 1010 0110 0100 0000
        let mut reader = BitsReader::new(BytesMut::from(&[0b1010_0110, 0b0100_0000][..]));
        assert_eq!(reader.read_ue().unwrap(), 0);
        assert_eq!(reader.read_ue().unwrap(), 1);
        assert_eq!(reader.read_ue().unwrap(), 2);
        assert_eq!(reader.read_ue().unwrap(), 3);

        // se: 010 -> 1, 011 -> -1, 00100 -> 2
        let mut reader = BitsReader::new(BytesMut::from(&[0b0100_1100, 0b1000_0000][..]));
        assert_eq!(reader.read_se().unwrap(), 1);
        assert_eq!(reader.read_se().unwrap(), -1);
        assert_eq!(reader.read_se().unwrap(), 2);
    }
}
