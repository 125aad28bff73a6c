use {
    super::{
        define,
        errors::{UnpackError, UnpackErrorValue},
        ChunkBasicHeader, ChunkInfo, ChunkMessageHeader, ExtendTimestampType,
    },
    crate::{bytesio::bytes_reader::BytesReader, rtmp::messages::define::msg_type_id},
    byteorder::{BigEndian, LittleEndian},
    bytes::BytesMut,
    std::{cmp::min, collections::HashMap},
};

const PARSE_ERROR_NUMBER: usize = 5;
/// Chunk streams tracked before the oldest half is forgotten.
const MAX_CACHED_CHUNK_STREAMS: usize = 256;
/// Upper bound for a reassembled message.
const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Eq, PartialEq, Debug)]
pub enum UnpackResult {
    /// A message completed with this chunk.
    ChunkInfo(ChunkInfo),
    /// A chunk was consumed, its message is still incomplete.
    Success,
    /// The buffered bytes do not hold a whole chunk yet.
    NotEnoughBytes,
}

/// Reassembly state of one chunk stream.
#[derive(Default)]
struct ChunkStream {
    header: ChunkMessageHeader,
    payload: BytesMut,
}

/// Layout of the chunk at the head of the buffer, computed without consuming.
struct ChunkLayout {
    format: u8,
    csid: u32,
    basic_header_len: usize,
    message_header_len: usize,
    has_extended_timestamp: bool,
    payload_len: usize,
}

/// Reassembles RTMP messages from a byte stream that may arrive in arbitrary
/// pieces. Chunks are only consumed once they are completely buffered.
pub struct ChunkUnpacketizer {
    reader: BytesReader,
    chunk_streams: HashMap<u32, ChunkStream>,
    max_chunk_size: usize,
    parse_error_number: usize,
}

impl Default for ChunkUnpacketizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkUnpacketizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: BytesReader::new(BytesMut::new()),
            chunk_streams: HashMap::new(),
            max_chunk_size: define::INIT_CHUNK_SIZE as usize,
            parse_error_number: 0,
        }
    }

    pub fn extend_data(&mut self, data: &[u8]) -> Result<(), UnpackError> {
        self.reader.extend_from_slice(data)?;
        tracing::trace!("extend_data, buffered: {}", self.reader.len());
        Ok(())
    }

    pub fn update_max_chunk_size(&mut self, chunk_size: usize) {
        tracing::trace!("update incoming chunk size: {chunk_size}");
        self.max_chunk_size = chunk_size.max(1);
    }

    fn maybe_prune_streams(&mut self) {
        if self.chunk_streams.len() > MAX_CACHED_CHUNK_STREAMS {
            let to_remove: Vec<u32> = self
                .chunk_streams
                .iter()
                .filter(|(_, stream)| stream.payload.is_empty())
                .map(|(csid, _)| *csid)
                .take(self.chunk_streams.len() / 2)
                .collect();
            for csid in to_remove {
                self.chunk_streams.remove(&csid);
            }
            tracing::debug!("pruned chunk streams to {}", self.chunk_streams.len());
        }
    }

    /// Decode every complete message currently buffered. Stops right after a
    /// SetChunkSize message so the caller can apply it before reading on.
    pub fn read_chunks(&mut self) -> Result<Vec<ChunkInfo>, UnpackError> {
        let mut chunks: Vec<ChunkInfo> = Vec::new();

        loop {
            match self.read_chunk()? {
                UnpackResult::ChunkInfo(chunk_info) => {
                    let msg_type_id = chunk_info.message_header.msg_type_id;
                    chunks.push(chunk_info);

                    if msg_type_id == msg_type_id::SET_CHUNK_SIZE {
                        break;
                    }
                }
                UnpackResult::Success => continue,
                UnpackResult::NotEnoughBytes => break,
            }
        }

        Ok(chunks)
    }

    /******************************************************************************
     * 5.3.1 Chunk Format
     * +--------------+----------------+--------------------+--------------+
     * | Basic Header | Message Header | Extended Timestamp |  Chunk Data  |
     * +--------------+----------------+--------------------+--------------+
     * |<------------------- Chunk Header ----------------->|
     ******************************************************************************/
    pub fn read_chunk(&mut self) -> Result<UnpackResult, UnpackError> {
        let Some(layout) = self.peek_layout()? else {
            return Ok(UnpackResult::NotEnoughBytes);
        };

        if !self.chunk_streams.contains_key(&layout.csid) {
            // The first chunk of a chunk stream must carry a full header.
            if layout.format != 0 {
                tracing::warn!(
                    "chunk stream id {}'s first chunk has format {}",
                    layout.csid,
                    layout.format
                );
                if self.parse_error_number > PARSE_ERROR_NUMBER {
                    return Err(UnpackErrorValue::CannotParse.into());
                }
                self.parse_error_number += 1;
            } else {
                self.parse_error_number = 0;
            }
            self.maybe_prune_streams();
        }

        self.reader.advance_bytes(layout.basic_header_len)?;
        let basic_header = ChunkBasicHeader::new(layout.format, layout.csid);

        let stream = self.chunk_streams.entry(layout.csid).or_default();
        let starts_message = stream.payload.is_empty();
        let header = &mut stream.header;

        /*****************************************************************
         * 5.3.1.2 Chunk Message Header
         * type 0: timestamp(3) length(3) type id(1) stream id(4, LE)
         * type 1: timestamp delta(3) length(3) type id(1)
         * type 2: timestamp delta(3)
         * type 3: nothing, everything is inherited
         *****************************************************************/
        match layout.format {
            0 => {
                header.timestamp = self.reader.read_u24::<BigEndian>()?;
                header.msg_length = self.reader.read_u24::<BigEndian>()?;
                header.msg_type_id = self.reader.read_u8()?;
                header.msg_stream_id = self.reader.read_u32::<LittleEndian>()?;
                header.timestamp_delta = 0;
                header.extended_timestamp_type = if header.timestamp >= define::EXTENDED_TIMESTAMP {
                    ExtendTimestampType::FORMAT0
                } else {
                    ExtendTimestampType::NONE
                };
            }
            1 => {
                header.timestamp_delta = self.reader.read_u24::<BigEndian>()?;
                header.msg_length = self.reader.read_u24::<BigEndian>()?;
                header.msg_type_id = self.reader.read_u8()?;
                header.extended_timestamp_type = Self::delta_extension(header.timestamp_delta);
            }
            2 => {
                header.timestamp_delta = self.reader.read_u24::<BigEndian>()?;
                header.extended_timestamp_type = Self::delta_extension(header.timestamp_delta);
            }
            _ => {}
        }

        if layout.has_extended_timestamp {
            let extended = self.reader.read_u32::<BigEndian>()?;
            match header.extended_timestamp_type {
                ExtendTimestampType::FORMAT0 if layout.format == 0 || starts_message => {
                    header.timestamp = extended;
                }
                ExtendTimestampType::FORMAT12 => header.timestamp_delta = extended,
                _ => {}
            }
        }

        // type 1 and 2 always start a message, type 3 only after a completed one
        if layout.format == 1 || layout.format == 2 || (layout.format == 3 && starts_message) {
            let (abs_timestamp, is_overflow) = header.timestamp.overflowing_add(header.timestamp_delta);
            if is_overflow {
                tracing::warn!("timestamp overflow on chunk stream {}", layout.csid);
            }
            header.timestamp = abs_timestamp;
        }

        let whole_msg_length = header.msg_length as usize;
        if whole_msg_length > MAX_MESSAGE_SIZE {
            return Err(UnpackErrorValue::MessageTooLarge {
                size: whole_msg_length,
                max: MAX_MESSAGE_SIZE,
            }
            .into());
        }

        let payload_data = self.reader.read_bytes(layout.payload_len)?;
        stream.payload.extend_from_slice(&payload_data[..]);

        tracing::trace!(
            "chunk csid {} fmt {}: {} of {} payload bytes",
            layout.csid,
            layout.format,
            stream.payload.len(),
            whole_msg_length
        );

        if stream.payload.len() >= whole_msg_length {
            let payload = stream.payload.split();
            return Ok(UnpackResult::ChunkInfo(ChunkInfo {
                basic_header,
                message_header: stream.header.clone(),
                payload,
            }));
        }

        Ok(UnpackResult::Success)
    }

    const fn delta_extension(timestamp_delta: u32) -> ExtendTimestampType {
        if timestamp_delta >= define::EXTENDED_TIMESTAMP {
            ExtendTimestampType::FORMAT12
        } else {
            ExtendTimestampType::NONE
        }
    }

    /// Work out the size of the chunk at the head of the buffer. `None` when
    /// it is not completely buffered yet.
    fn peek_layout(&self) -> Result<Option<ChunkLayout>, UnpackError> {
        let available = self.reader.len();
        if available == 0 {
            return Ok(None);
        }

        let first = self.reader.get(0)?;
        let format = (first >> 6) & 0b0000_0011;
        let (csid, basic_header_len) = match first & 0b0011_1111 {
            0 => {
                if available < 2 {
                    return Ok(None);
                }
                (64 + u32::from(self.reader.get(1)?), 2)
            }
            1 => {
                if available < 3 {
                    return Ok(None);
                }
                let low = u32::from(self.reader.get(1)?);
                let high = u32::from(self.reader.get(2)?);
                (64 + low + high * 256, 3)
            }
            csid => (u32::from(csid), 1),
        };

        let message_header_len = match format {
            0 => 11,
            1 => 7,
            2 => 3,
            _ => 0,
        };
        if available < basic_header_len + message_header_len {
            return Ok(None);
        }

        let peek_u24 = |offset: usize| -> Result<u32, UnpackError> {
            Ok((u32::from(self.reader.get(offset)?) << 16)
                | (u32::from(self.reader.get(offset + 1)?) << 8)
                | u32::from(self.reader.get(offset + 2)?))
        };

        let cached = self.chunk_streams.get(&csid);
        let has_extended_timestamp = if format == 3 {
            cached.is_some_and(|s| s.header.extended_timestamp_type != ExtendTimestampType::NONE)
        } else {
            peek_u24(basic_header_len)? >= define::EXTENDED_TIMESTAMP
        };

        let msg_length = if format <= 1 {
            peek_u24(basic_header_len + 3)? as usize
        } else {
            cached.map_or(0, |s| s.header.msg_length as usize)
        };
        let received = cached.map_or(0, |s| s.payload.len());
        let payload_len = min(msg_length.saturating_sub(received), self.max_chunk_size);

        let total = basic_header_len
            + message_header_len
            + if has_extended_timestamp { 4 } else { 0 }
            + payload_len;
        if available < total {
            return Ok(None);
        }

        Ok(Some(ChunkLayout {
            format,
            csid,
            basic_header_len,
            message_header_len,
            has_extended_timestamp,
            payload_len,
        }))
    }
}
