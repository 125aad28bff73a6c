use {
    super::{
        errors::{H264Error, H264ErrorValue},
        nal::{nal_unit_type_of, remove_emulation_prevention},
        nal_unit_type,
    },
    crate::bytesio::bits_reader::BitsReader,
};

/// Fields of a sequence parameter set that a publisher needs:
/// the AVC configuration record bytes and the coded picture size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sps {
    pub profile_idc: u8,
    pub constraint_flags: u8,
    pub level_idc: u8,
    pub chroma_format_idc: u32,
    pub width: u32,
    pub height: u32,
}

fn has_chroma_info(profile_idc: u8) -> bool {
    matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
    )
}

fn skip_scaling_list(reader: &mut BitsReader, size: usize) -> Result<(), H264Error> {
    let mut last_scale: i64 = 8;
    let mut next_scale: i64 = 8;
    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = i64::from(reader.read_se()?);
            next_scale = (last_scale + delta_scale).rem_euclid(256);
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Ok(())
}

impl Sps {
    /// Parse an SPS NAL unit, header byte included, start code excluded.
    pub fn parse(nal: &[u8]) -> Result<Self, H264Error> {
        let nal_type = nal_unit_type_of(nal).ok_or(H264ErrorValue::EmptyNalUnit)?;
        if nal_type != nal_unit_type::SPS {
            return Err(H264ErrorValue::NotSps(nal_type).into());
        }
        if nal.len() < 4 {
            return Err(H264ErrorValue::SpsTooShort(nal.len()).into());
        }

        let rbsp = remove_emulation_prevention(&nal[1..]);
        let mut reader = BitsReader::new(rbsp);

        let mut sps = Self {
            profile_idc: reader.read_n_bits(8)? as u8,
            constraint_flags: reader.read_n_bits(8)? as u8,
            level_idc: reader.read_n_bits(8)? as u8,
            chroma_format_idc: 1,
            ..Default::default()
        };

        // seq_parameter_set_id
        reader.read_ue()?;

        let mut separate_colour_plane = false;
        if has_chroma_info(sps.profile_idc) {
            sps.chroma_format_idc = reader.read_ue()?;
            if sps.chroma_format_idc == 3 {
                separate_colour_plane = reader.read_bit()? == 1;
            }
            // bit_depth_luma_minus8, bit_depth_chroma_minus8
            reader.read_ue()?;
            reader.read_ue()?;
            // qpprime_y_zero_transform_bypass_flag
            reader.read_bit()?;

            if reader.read_bit()? == 1 {
                let lists = if sps.chroma_format_idc == 3 { 12 } else { 8 };
                for i in 0..lists {
                    if reader.read_bit()? == 1 {
                        skip_scaling_list(&mut reader, if i < 6 { 16 } else { 64 })?;
                    }
                }
            }
        }

        // log2_max_frame_num_minus4
        reader.read_ue()?;

        match reader.read_ue()? {
            0 => {
                // log2_max_pic_order_cnt_lsb_minus4
                reader.read_ue()?;
            }
            1 => {
                reader.read_bit()?;
                reader.read_se()?;
                reader.read_se()?;
                let cycle = reader.read_ue()?;
                for _ in 0..cycle {
                    reader.read_se()?;
                }
            }
            _ => {}
        }

        // max_num_ref_frames, gaps_in_frame_num_value_allowed_flag
        reader.read_ue()?;
        reader.read_bit()?;

        let width_in_mbs = reader
            .read_ue()?
            .checked_add(1)
            .ok_or(H264ErrorValue::InvalidSps("pic_width_in_mbs overflow"))?;
        let height_in_map_units = reader
            .read_ue()?
            .checked_add(1)
            .ok_or(H264ErrorValue::InvalidSps("pic_height_in_map_units overflow"))?;
        let frame_mbs_only = reader.read_bit()?;
        if frame_mbs_only == 0 {
            // mb_adaptive_frame_field_flag
            reader.read_bit()?;
        }
        // direct_8x8_inference_flag
        reader.read_bit()?;

        let (mut crop_left, mut crop_right, mut crop_top, mut crop_bottom) = (0, 0, 0, 0);
        if reader.read_bit()? == 1 {
            crop_left = reader.read_ue()?;
            crop_right = reader.read_ue()?;
            crop_top = reader.read_ue()?;
            crop_bottom = reader.read_ue()?;
        }

        let frame_height_factor = 2 - u32::from(frame_mbs_only);
        let chroma_array_type = if separate_colour_plane {
            0
        } else {
            sps.chroma_format_idc
        };
        let (crop_unit_x, crop_unit_y) = match chroma_array_type {
            0 => (1, frame_height_factor),
            1 => (2, 2 * frame_height_factor),
            2 => (2, frame_height_factor),
            _ => (1, frame_height_factor),
        };

        let coded_width = width_in_mbs
            .checked_mul(16)
            .ok_or(H264ErrorValue::InvalidSps("width overflow"))?;
        let coded_height = height_in_map_units
            .checked_mul(16 * frame_height_factor)
            .ok_or(H264ErrorValue::InvalidSps("height overflow"))?;
        let crop_x = crop_left
            .checked_add(crop_right)
            .and_then(|crop| crop.checked_mul(crop_unit_x))
            .ok_or(H264ErrorValue::InvalidSps("horizontal crop overflow"))?;
        let crop_y = crop_top
            .checked_add(crop_bottom)
            .and_then(|crop| crop.checked_mul(crop_unit_y))
            .ok_or(H264ErrorValue::InvalidSps("vertical crop overflow"))?;
        if crop_x >= coded_width || crop_y >= coded_height {
            return Err(H264ErrorValue::InvalidSps("crop exceeds coded size").into());
        }

        sps.width = coded_width - crop_x;
        sps.height = coded_height - crop_y;

        tracing::debug!(
            "parsed sps: profile {} level {} {}x{}",
            sps.profile_idc,
            sps.level_idc,
            sps.width,
            sps.height
        );

        Ok(sps)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{skip_scaling_list, Sps},
        crate::bytesio::bits_reader::BitsReader,
        bytes::BytesMut,
    };

    #[test]
    fn test_baseline_720p() {
        let nal = [0x67, 0x42, 0xC0, 0x1F, 0xDA, 0x01, 0x40, 0x16, 0xE4];
        let sps = Sps::parse(&nal).unwrap();
        assert_eq!(sps.profile_idc, 66);
        assert_eq!(sps.constraint_flags, 0xC0);
        assert_eq!(sps.level_idc, 31);
        assert_eq!((sps.width, sps.height), (1280, 720));
    }

    #[test]
    fn test_high_1080p_with_cropping() {
        let nal = [
            0x67, 0x64, 0x00, 0x28, 0xAC, 0xCA, 0x50, 0x1E, 0x00, 0x89, 0xF9, 0x50,
        ];
        let sps = Sps::parse(&nal).unwrap();
        assert_eq!(sps.profile_idc, 100);
        assert_eq!(sps.level_idc, 40);
        assert_eq!((sps.width, sps.height), (1920, 1080));
    }

    #[test]
    fn test_rejects_non_sps() {
        assert!(Sps::parse(&[0x68, 0xCE, 0x3C, 0x80]).is_err());
        assert!(Sps::parse(&[]).is_err());
    }

    #[test]
    fn test_oversized_dimensions_are_an_error() {
        let nal = [
            0x67, 0x42, 0xC0, 0x1F, 0xF8, 0x00, 0x00, 0x00, 0x07, 0xFF, 0xFF, 0xFF, 0xFF, 0x40,
        ];
        assert!(Sps::parse(&nal).is_err());
    }

    #[test]
    fn test_scaling_list_large_delta_wraps() {
        // se(v) = i32::MAX followed by fifteen zero deltas
        let data = [0x00, 0x00, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFD, 0xFF, 0xFF];
        let mut reader = BitsReader::new(BytesMut::from(&data[..]));
        skip_scaling_list(&mut reader, 16).unwrap();
        assert_eq!(reader.bits_remaining(), 2);
    }
}
