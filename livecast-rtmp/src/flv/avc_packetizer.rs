use {
    super::{
        define::{avc_packet_type, codec_id, frame_type, tag_type, FlvTag},
        errors::{FlvPackError, FlvPackErrorValue},
    },
    crate::{
        bytesio::bytes_writer::BytesWriter,
        h264::{
            nal::{nal_unit_type_of, start_code_len},
            nal_unit_type,
            sps::Sps,
        },
    },
    byteorder::BigEndian,
    bytes::Bytes,
};

/// Turns H.264 NAL units into FLV video tag bodies.
#[derive(Default)]
pub struct AvcPacketizer {
    sps: Option<Bytes>,
    pps: Option<Bytes>,
    sent_config: bool,
}

/// Accepts Annex-B (3 or 4 byte start code), AVCC (4 byte length) or bare NAL units.
fn strip_framing(data: &[u8]) -> &[u8] {
    let start_code = start_code_len(data);
    if start_code > 0 {
        return &data[start_code..];
    }
    if data.len() > 4 {
        let length = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if length == data.len() - 4 {
            return &data[4..];
        }
    }
    data
}

impl AvcPacketizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn has_sent_config(&self) -> bool {
        self.sent_config
    }

    /// Parameters of the captured SPS, once there is one.
    pub fn sps_info(&self) -> Option<Result<Sps, FlvPackError>> {
        self.sps
            .as_ref()
            .map(|sps| Sps::parse(sps).map_err(FlvPackError::from))
    }

    /// Packetize one NAL unit. SPS and PPS are captured instead of sent and
    /// produce the sequence header tag when both are known. `pts` and `dts`
    /// are in milliseconds.
    pub fn packetize(
        &mut self,
        data: &[u8],
        pts: u32,
        dts: u32,
    ) -> Result<Option<FlvTag>, FlvPackError> {
        let nal = strip_framing(data);
        let nal_type = nal_unit_type_of(nal).ok_or(FlvPackErrorValue::EmptyNalUnit)?;

        match nal_type {
            nal_unit_type::SPS => {
                if self.sps.is_none() {
                    self.sps = Some(Bytes::copy_from_slice(nal));
                }
                self.sequence_header(dts)
            }
            nal_unit_type::PPS => {
                if self.pps.is_none() {
                    self.pps = Some(Bytes::copy_from_slice(nal));
                }
                self.sequence_header(dts)
            }
            _ => {
                let is_key_frame = nal_type == nal_unit_type::IDR_SLICE;
                Ok(Some(Self::nalu_tag(nal, is_key_frame, pts, dts)?))
            }
        }
    }

    fn sequence_header(&mut self, timestamp: u32) -> Result<Option<FlvTag>, FlvPackError> {
        if self.sent_config {
            return Ok(None);
        }
        let (Some(sps), Some(pps)) = (&self.sps, &self.pps) else {
            return Ok(None);
        };
        if sps.len() < 4 {
            return Err(FlvPackErrorValue::EmptyNalUnit.into());
        }

        let mut writer = BytesWriter::with_capacity(16 + sps.len() + pps.len());
        writer.write_u8((frame_type::KEY_FRAME << 4) | codec_id::AVC)?;
        writer.write_u8(avc_packet_type::SEQUENCE_HEADER)?;
        writer.write_u24::<BigEndian>(0)?;

        // AVCDecoderConfigurationRecord
        writer.write_u8(1)?;
        writer.write_u8(sps[1])?;
        writer.write_u8(sps[2])?;
        writer.write_u8(sps[3])?;
        // 4 byte NALU lengths
        writer.write_u8(0xFF)?;
        // one SPS
        writer.write_u8(0xE1)?;
        writer.write_u16::<BigEndian>(Self::u16_len(sps)?)?;
        writer.write(sps)?;
        writer.write_u8(1)?;
        writer.write_u16::<BigEndian>(Self::u16_len(pps)?)?;
        writer.write(pps)?;

        self.sent_config = true;
        tracing::debug!(
            "avc sequence header ready, sps {} bytes, pps {} bytes",
            sps.len(),
            pps.len()
        );

        Ok(Some(FlvTag {
            tag_type: tag_type::VIDEO,
            timestamp,
            data: writer.extract_current_bytes().freeze(),
            is_key_frame: true,
            is_sequence_header: true,
        }))
    }

    fn u16_len(data: &[u8]) -> Result<u16, FlvPackError> {
        u16::try_from(data.len()).map_err(|_| FlvPackErrorValue::NalUnitTooLarge(data.len()).into())
    }

    fn nalu_tag(nal: &[u8], is_key_frame: bool, pts: u32, dts: u32) -> Result<FlvTag, FlvPackError> {
        let length =
            u32::try_from(nal.len()).map_err(|_| FlvPackErrorValue::NalUnitTooLarge(nal.len()))?;
        let frame = if is_key_frame {
            frame_type::KEY_FRAME
        } else {
            frame_type::INTER_FRAME
        };
        // composition time is a signed 24 bit field
        let composition_time = pts.saturating_sub(dts).min(0x7F_FFFF);

        let mut writer = BytesWriter::with_capacity(nal.len() + 9);
        writer.write_u8((frame << 4) | codec_id::AVC)?;
        writer.write_u8(avc_packet_type::NALU)?;
        writer.write_u24::<BigEndian>(composition_time)?;
        writer.write_u32::<BigEndian>(length)?;
        writer.write(nal)?;

        Ok(FlvTag {
            tag_type: tag_type::VIDEO,
            timestamp: dts,
            data: writer.extract_current_bytes().freeze(),
            is_key_frame,
            is_sequence_header: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::AvcPacketizer;

    const SPS: [u8; 9] = [0x67, 0x42, 0xC0, 0x1F, 0xDA, 0x01, 0x40, 0x16, 0xE4];
    const PPS: [u8; 4] = [0x68, 0xCE, 0x3C, 0x80];

    #[test]
    fn test_sequence_header_layout() {
        let mut packetizer = AvcPacketizer::new();

        let mut annexb_sps = vec![0, 0, 0, 1];
        annexb_sps.extend_from_slice(&SPS);
        assert!(packetizer.packetize(&annexb_sps, 0, 0).unwrap().is_none());

        let tag = packetizer.packetize(&PPS, 0, 0).unwrap().unwrap();
        assert!(tag.is_sequence_header);
        assert!(tag.is_key_frame);

        let mut expected = vec![0x17, 0x00, 0x00, 0x00, 0x00, 0x01, 0x42, 0xC0, 0x1F, 0xFF, 0xE1];
        expected.extend_from_slice(&[0x00, 0x09]);
        expected.extend_from_slice(&SPS);
        expected.extend_from_slice(&[0x01, 0x00, 0x04]);
        expected.extend_from_slice(&PPS);
        assert_eq!(&tag.data[..], &expected[..]);

        // parameter sets repeat in band, the header is only sent once
        assert!(packetizer.packetize(&SPS, 40, 40).unwrap().is_none());
        assert!(packetizer.has_sent_config());

        let sps = packetizer.sps_info().unwrap().unwrap();
        assert_eq!((sps.width, sps.height), (1280, 720));
    }

    #[test]
    fn test_malformed_sps_still_packetizes() {
        let mut packetizer = AvcPacketizer::new();
        let sps = [
            0x67, 0x42, 0xC0, 0x1F, 0xF8, 0x00, 0x00, 0x00, 0x07, 0xFF, 0xFF, 0xFF, 0xFF, 0x40,
        ];
        assert!(packetizer.packetize(&sps, 0, 0).unwrap().is_none());
        assert!(packetizer.packetize(&PPS, 0, 0).unwrap().is_some());
        assert!(packetizer.sps_info().unwrap().is_err());
    }

    #[test]
    fn test_frame_flags() {
        let mut packetizer = AvcPacketizer::new();

        let idr = packetizer.packetize(&[0, 0, 1, 0x65, 0x88, 0x80], 80, 40).unwrap().unwrap();
        assert!(idr.is_key_frame);
        assert_eq!(idr.timestamp, 40);
        assert_eq!(
            &idr.data[..],
            &[0x17, 0x01, 0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x03, 0x65, 0x88, 0x80]
        );

        // AVCC framed inter slice
        let inter = packetizer
            .packetize(&[0, 0, 0, 2, 0x41, 0x9A], 120, 120)
            .unwrap()
            .unwrap();
        assert!(!inter.is_key_frame);
        assert!(inter.is_droppable());
        assert_eq!(&inter.data[..5], &[0x27, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(&inter.data[5..], &[0x00, 0x00, 0x00, 0x02, 0x41, 0x9A]);

        assert!(packetizer.packetize(&[], 0, 0).is_err());
    }
}
