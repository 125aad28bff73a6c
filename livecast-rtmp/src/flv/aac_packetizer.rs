use {
    super::{
        define::{aac_packet_type, sound_flags, tag_type, FlvTag},
        errors::{FlvPackError, FlvPackErrorValue},
    },
    crate::bytesio::bytes_writer::BytesWriter,
};

const AAC_LC_OBJECT_TYPE: u8 = 2;

const SAMPLING_FREQUENCIES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// Index of `sample_rate` in the MPEG-4 sampling frequency table.
#[must_use]
pub fn sampling_frequency_index(sample_rate: u32) -> Option<u8> {
    SAMPLING_FREQUENCIES
        .iter()
        .position(|&rate| rate == sample_rate)
        .map(|index| index as u8)
}

#[must_use]
pub fn sampling_frequency(index: u8) -> Option<u32> {
    SAMPLING_FREQUENCIES.get(index as usize).copied()
}

/// Two byte AAC-LC AudioSpecificConfig.
pub fn audio_specific_config(sample_rate: u32, channels: u8) -> Result<[u8; 2], FlvPackError> {
    let index = sampling_frequency_index(sample_rate)
        .ok_or(FlvPackErrorValue::UnsupportedSampleRate(sample_rate))?;
    Ok([
        (AAC_LC_OBJECT_TYPE << 3) | (index >> 1),
        ((index & 0x01) << 7) | ((channels & 0x0F) << 3),
    ])
}

/// Turns raw AAC frames into FLV audio tag bodies.
pub struct AacPacketizer {
    sample_rate: u32,
    channels: u8,
    cts_offset: u32,
    asc: Option<[u8; 2]>,
    sent_config: bool,
}

impl AacPacketizer {
    #[must_use]
    pub const fn new(sample_rate: u32, channels: u8, cts_offset: u32) -> Self {
        Self {
            sample_rate,
            channels,
            cts_offset,
            asc: None,
            sent_config: false,
        }
    }

    /// Sound format byte. FLV only knows 44.1k and 22.05k for AAC, everything
    /// else is signalled as 44.1k and described by the ASC.
    #[must_use]
    pub const fn flags(&self) -> u8 {
        let rate = if self.sample_rate == 22050 {
            sound_flags::RATE_22050
        } else {
            sound_flags::RATE_44100
        };
        let channels = if self.channels == 2 {
            sound_flags::STEREO
        } else {
            sound_flags::MONO
        };
        sound_flags::CODEC_AAC | rate | sound_flags::SIZE_16BIT | channels
    }

    pub fn set_audio_specific_config(&mut self, asc: [u8; 2]) {
        if self.asc.is_none() {
            self.asc = Some(asc);
        }
    }

    /// Packetize one raw AAC frame (no ADTS header). A two byte input seen
    /// before any configuration is taken as the AudioSpecificConfig. The first
    /// call always yields the sequence header ahead of any frame.
    pub fn packetize(&mut self, frame: &[u8], timestamp: u32) -> Result<Vec<FlvTag>, FlvPackError> {
        if frame.is_empty() {
            return Err(FlvPackErrorValue::EmptyAudioFrame.into());
        }

        let timestamp = timestamp.wrapping_add(self.cts_offset);
        let mut tags = Vec::with_capacity(2);
        let mut frame_is_config = false;

        if frame.len() == 2 && self.asc.is_none() && !self.sent_config {
            self.asc = Some([frame[0], frame[1]]);
            frame_is_config = true;
        }

        if !self.sent_config {
            let asc = match self.asc {
                Some(asc) => asc,
                None => audio_specific_config(self.sample_rate, self.channels)?,
            };
            tags.push(self.tag(aac_packet_type::SEQUENCE_HEADER, &asc, timestamp, true)?);
            self.sent_config = true;
            tracing::debug!("aac sequence header ready, asc {:02X?}", asc);
        }

        if !frame_is_config {
            tags.push(self.tag(aac_packet_type::RAW, frame, timestamp, false)?);
        }

        Ok(tags)
    }

    fn tag(
        &self,
        packet_type: u8,
        payload: &[u8],
        timestamp: u32,
        is_sequence_header: bool,
    ) -> Result<FlvTag, FlvPackError> {
        let mut writer = BytesWriter::with_capacity(payload.len() + 2);
        writer.write_u8(self.flags())?;
        writer.write_u8(packet_type)?;
        writer.write(payload)?;

        Ok(FlvTag {
            tag_type: tag_type::AUDIO,
            timestamp,
            data: writer.extract_current_bytes().freeze(),
            is_key_frame: false,
            is_sequence_header,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        assert_eq!(AacPacketizer::new(44100, 2, 0).flags(), 0xAF);
        assert_eq!(AacPacketizer::new(22050, 1, 0).flags(), 0xAA);
        assert_eq!(AacPacketizer::new(48000, 2, 0).flags(), 0xAF);
    }

    #[test]
    fn test_audio_specific_config() {
        assert_eq!(audio_specific_config(44100, 2).unwrap(), [0x12, 0x10]);
        assert_eq!(audio_specific_config(48000, 1).unwrap(), [0x11, 0x88]);
        assert!(audio_specific_config(44000, 2).is_err());
        assert_eq!(sampling_frequency(4), Some(44100));
    }

    #[test]
    fn test_sequence_header_first() {
        let mut packetizer = AacPacketizer::new(44100, 2, 10);

        let tags = packetizer.packetize(&[0x21, 0x00, 0x03, 0x40], 100).unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags[0].is_sequence_header);
        assert_eq!(&tags[0].data[..], &[0xAF, 0x00, 0x12, 0x10]);
        assert_eq!(&tags[1].data[..], &[0xAF, 0x01, 0x21, 0x00, 0x03, 0x40]);
        assert_eq!(tags[1].timestamp, 110);

        let tags = packetizer.packetize(&[0x21, 0x00], 123).unwrap();
        assert_eq!(tags.len(), 1);
        assert!(!tags[0].is_sequence_header);
    }

    #[test]
    fn test_explicit_config_input() {
        let mut packetizer = AacPacketizer::new(44100, 2, 0);
        let tags = packetizer.packetize(&[0x13, 0x90], 0).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(&tags[0].data[..], &[0xAF, 0x00, 0x13, 0x90]);
    }
}
