use {
    super::{
        define::{self, ClientHandshakeState, HandshakeEvent},
        errors::{HandshakeError, HandshakeErrorValue},
    },
    crate::bytesio::{bytes_reader::BytesReader, bytes_writer::BytesWriter},
    byteorder::BigEndian,
    bytes::BytesMut,
    rand::Rng,
    std::time::{SystemTime, UNIX_EPOCH},
};

/// Client side of the plain (digest-less) RTMP handshake.
pub struct SimpleHandshakeClient {
    reader: BytesReader,
    c1: BytesMut,
    state: ClientHandshakeState,
}

impl Default for SimpleHandshakeClient {
    fn default() -> Self {
        Self::new()
    }
}

fn current_time() -> Result<u32, HandshakeError> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(elapsed.as_millis() as u32)
}

impl SimpleHandshakeClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: BytesReader::new(BytesMut::new()),
            c1: BytesMut::new(),
            state: ClientHandshakeState::ReadS0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ClientHandshakeState {
        self.state
    }

    #[must_use]
    pub fn c0() -> BytesMut {
        BytesMut::from(&[define::RTMP_VERSION][..])
    }

    /// C1: 4 byte time, 4 zero bytes, 1528 random bytes.
    pub fn c1(&mut self) -> Result<BytesMut, HandshakeError> {
        let mut writer = BytesWriter::with_capacity(define::RTMP_HANDSHAKE_SIZE);
        writer.write_u32::<BigEndian>(current_time()?)?;
        writer.write_u32::<BigEndian>(0)?;

        let mut random = vec![0_u8; define::RTMP_HANDSHAKE_SIZE - 8];
        rand::thread_rng().fill(&mut random[..]);
        writer.write(&random)?;

        self.c1 = writer.extract_current_bytes();
        Ok(self.c1.clone())
    }

    pub fn extend_data(&mut self, data: &[u8]) -> Result<(), HandshakeError> {
        self.reader.extend_from_slice(data)?;
        Ok(())
    }

    /// Advance over whatever the server has sent so far. Returns `None` when
    /// more bytes are needed.
    pub fn step(&mut self) -> Result<Option<HandshakeEvent>, HandshakeError> {
        match self.state {
            ClientHandshakeState::ReadS0 => {
                if self.reader.is_empty() {
                    return Ok(None);
                }
                let version = self.reader.read_u8()?;
                if version != define::RTMP_VERSION {
                    return Err(HandshakeErrorValue::S0VersionNotCorrect(version).into());
                }
                self.state = ClientHandshakeState::ReadS1;
                Ok(Some(HandshakeEvent::S0Received))
            }
            ClientHandshakeState::ReadS1 => {
                if self.reader.len() < define::RTMP_HANDSHAKE_SIZE {
                    return Ok(None);
                }
                let mut c2 = self.reader.read_bytes(define::RTMP_HANDSHAKE_SIZE)?;
                c2[define::C2_ZERO_OFFSET..define::C2_ZERO_OFFSET + define::TIME_FIELD_SIZE]
                    .fill(0);
                self.state = ClientHandshakeState::ReadS2;
                Ok(Some(HandshakeEvent::S1Received(c2)))
            }
            ClientHandshakeState::ReadS2 => {
                if self.reader.len() < define::RTMP_HANDSHAKE_SIZE {
                    return Ok(None);
                }
                let s2 = self.reader.read_bytes(define::RTMP_HANDSHAKE_SIZE)?;
                if self.c1.len() == s2.len() && s2[8..] != self.c1[8..] {
                    // plenty of servers do not echo C1, it is not fatal
                    tracing::debug!("s2 does not echo c1 random bytes");
                }
                self.state = ClientHandshakeState::Finish;
                Ok(Some(HandshakeEvent::S2Received))
            }
            ClientHandshakeState::Finish => Ok(None),
        }
    }

    /// Bytes the server sent after S2; they belong to the chunk stream.
    pub fn extract_remaining_bytes(&mut self) -> BytesMut {
        self.reader.extract_remaining_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::{define, HandshakeEvent, SimpleHandshakeClient};

    #[test]
    fn test_c1_layout() {
        let mut client = SimpleHandshakeClient::new();
        assert_eq!(&SimpleHandshakeClient::c0()[..], &[0x03]);
        let c1 = client.c1().unwrap();
        assert_eq!(c1.len(), define::RTMP_HANDSHAKE_SIZE);
        assert_eq!(&c1[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_full_exchange() {
        let mut client = SimpleHandshakeClient::new();
        let c1 = client.c1().unwrap();

        let mut s1 = vec![0xAB_u8; define::RTMP_HANDSHAKE_SIZE];
        s1[0..4].copy_from_slice(&[0, 0, 0, 42]);

        assert_eq!(client.step().unwrap(), None);
        client.extend_data(&[0x03]).unwrap();
        client.extend_data(&s1[..1000]).unwrap();
        assert_eq!(client.step().unwrap(), Some(HandshakeEvent::S0Received));
        assert_eq!(client.step().unwrap(), None);

        client.extend_data(&s1[1000..]).unwrap();
        let Some(HandshakeEvent::S1Received(c2)) = client.step().unwrap() else {
            panic!("expected s1");
        };
        assert_eq!(&c2[0..4], &[0, 0, 0, 42]);
        assert_eq!(&c2[4..8], &[0, 0, 0, 0]);
        assert_eq!(&c2[8..], &s1[8..]);

        // S2 echoing C1 followed by the first chunk bytes
        client.extend_data(&c1).unwrap();
        client.extend_data(&[0x02, 0x00]).unwrap();
        assert_eq!(client.step().unwrap(), Some(HandshakeEvent::S2Received));
        assert_eq!(&client.extract_remaining_bytes()[..], &[0x02, 0x00]);
    }

    #[test]
    fn test_wrong_version() {
        let mut client = SimpleHandshakeClient::new();
        client.extend_data(&[0x06]).unwrap();
        assert!(client.step().is_err());
    }
}
