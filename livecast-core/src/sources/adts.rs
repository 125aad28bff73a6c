use std::{path::Path, time::Duration};

use bytes::Bytes;
use livecast_rtmp::flv::aac_packetizer::sampling_frequency;

use crate::error::{Error, Result};

const ADTS_HEADER_LEN: usize = 7;
const CRC_LEN: usize = 2;
const SAMPLES_PER_FRAME: u64 = 1024;

/// Fixed and variable ADTS header fields needed to unwrap a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsHeader {
    /// `profile` field; the audio object type is one more.
    pub profile: u8,
    pub sampling_frequency_index: u8,
    pub channel_configuration: u8,
    pub header_len: usize,
    /// Header included.
    pub frame_len: usize,
}

impl AdtsHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < ADTS_HEADER_LEN {
            return Err(Error::InvalidInput(format!(
                "adts header needs {ADTS_HEADER_LEN} bytes, got {}",
                data.len()
            )));
        }
        if data[0] != 0xFF || data[1] & 0xF0 != 0xF0 {
            return Err(Error::InvalidInput("adts syncword not found".to_string()));
        }

        let protection_absent = data[1] & 0x01 == 1;
        let profile = data[2] >> 6;
        let sampling_frequency_index = (data[2] >> 2) & 0x0F;
        let channel_configuration = ((data[2] & 0x01) << 2) | (data[3] >> 6);
        let frame_len = (usize::from(data[3] & 0x03) << 11)
            | (usize::from(data[4]) << 3)
            | usize::from(data[5] >> 5);
        let header_len = if protection_absent {
            ADTS_HEADER_LEN
        } else {
            ADTS_HEADER_LEN + CRC_LEN
        };

        if frame_len < header_len {
            return Err(Error::InvalidInput(format!(
                "adts frame length {frame_len} shorter than its header"
            )));
        }

        Ok(Self {
            profile,
            sampling_frequency_index,
            channel_configuration,
            header_len,
            frame_len,
        })
    }

    #[must_use]
    pub fn sample_rate(&self) -> Option<u32> {
        sampling_frequency(self.sampling_frequency_index)
    }

    #[must_use]
    pub const fn audio_specific_config(&self) -> [u8; 2] {
        let object_type = self.profile + 1;
        [
            (object_type << 3) | (self.sampling_frequency_index >> 1),
            ((self.sampling_frequency_index & 0x01) << 7) | (self.channel_configuration << 3),
        ]
    }
}

/// Raw AAC frames of an ADTS stream, described by its first header.
#[derive(Debug, Clone)]
pub struct AdtsStream {
    pub audio_specific_config: [u8; 2],
    pub sample_rate: u32,
    pub channels: u8,
    pub frames: Vec<Bytes>,
}

impl AdtsStream {
    pub fn parse(data: &Bytes) -> Result<Self> {
        let mut offset = 0;
        let mut first: Option<AdtsHeader> = None;
        let mut frames = Vec::new();

        while offset < data.len() {
            let header = AdtsHeader::parse(&data[offset..])?;
            let end = offset + header.frame_len;
            if end > data.len() {
                tracing::warn!("truncated adts frame at byte {offset}, dropped");
                break;
            }
            frames.push(data.slice(offset + header.header_len..end));
            first.get_or_insert(header);
            offset = end;
        }

        let header =
            first.ok_or_else(|| Error::InvalidInput("no adts frame found".to_string()))?;
        let sample_rate = header.sample_rate().ok_or_else(|| {
            Error::InvalidInput(format!(
                "reserved sampling frequency index {}",
                header.sampling_frequency_index
            ))
        })?;

        Ok(Self {
            audio_specific_config: header.audio_specific_config(),
            sample_rate,
            channels: header.channel_configuration,
            frames,
        })
    }

    pub async fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = Bytes::from(tokio::fs::read(path.as_ref()).await?);
        Self::parse(&data)
    }

    /// Time covered by one frame.
    #[must_use]
    pub fn frame_duration(&self) -> Duration {
        Duration::from_micros(SAMPLES_PER_FRAME * 1_000_000 / u64::from(self.sample_rate.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// AAC LC, 44.1 kHz, stereo, no CRC.
    fn adts_frame(payload: &[u8]) -> Vec<u8> {
        let frame_len = ADTS_HEADER_LEN + payload.len();
        let mut frame = vec![
            0xFF,
            0xF1,
            (1 << 6) | (4 << 2),
            (2 << 6) | ((frame_len >> 11) as u8 & 0x03),
            (frame_len >> 3) as u8,
            ((frame_len as u8 & 0x07) << 5) | 0x1F,
            0xFC,
        ];
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn test_parse_header() {
        let header = AdtsHeader::parse(&adts_frame(&[1, 2, 3])).unwrap();
        assert_eq!(header.profile, 1);
        assert_eq!(header.sampling_frequency_index, 4);
        assert_eq!(header.channel_configuration, 2);
        assert_eq!(header.header_len, 7);
        assert_eq!(header.frame_len, 10);
        assert_eq!(header.sample_rate(), Some(44100));
        // AAC LC 44.1 kHz stereo
        assert_eq!(header.audio_specific_config(), [0x12, 0x10]);
    }

    #[test]
    fn test_stream_strips_headers() {
        let mut data = adts_frame(&[0xAA; 4]);
        data.extend(adts_frame(&[0xBB; 6]));
        let stream = AdtsStream::parse(&Bytes::from(data)).unwrap();

        assert_eq!(stream.sample_rate, 44100);
        assert_eq!(stream.channels, 2);
        assert_eq!(stream.frames.len(), 2);
        assert_eq!(&stream.frames[0][..], &[0xAA; 4]);
        assert_eq!(&stream.frames[1][..], &[0xBB; 6]);
        assert_eq!(stream.frame_duration(), Duration::from_micros(23_219));
    }

    #[test]
    fn test_truncated_tail_is_dropped() {
        let mut data = adts_frame(&[0xAA; 4]);
        let second = adts_frame(&[0xBB; 6]);
        data.extend_from_slice(&second[..9]);
        let stream = AdtsStream::parse(&Bytes::from(data)).unwrap();
        assert_eq!(stream.frames.len(), 1);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(AdtsStream::parse(&Bytes::from_static(&[0x00; 16])).is_err());
        assert!(AdtsStream::parse(&Bytes::new()).is_err());
    }
}
