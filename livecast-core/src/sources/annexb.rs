use std::path::Path;

use bytes::Bytes;
use livecast_rtmp::h264::{
    nal::{is_first_slice_of_picture, is_vcl, nal_unit_type_of, split_annexb},
    nal_unit_type,
};

use crate::error::Result;

/// The NAL units of one picture, parameter sets and SEI included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessUnit {
    /// NAL units without start codes.
    pub nals: Vec<Bytes>,
    pub is_key_frame: bool,
}

impl AccessUnit {
    fn has_picture(&self) -> bool {
        self.nals
            .iter()
            .filter_map(|nal| nal_unit_type_of(nal))
            .any(is_vcl)
    }
}

/// Group an Annex-B byte stream into access units. A new unit begins at the
/// first slice of a picture, or at any non-VCL NAL unit following a picture.
#[must_use]
pub fn access_units(data: &Bytes) -> Vec<AccessUnit> {
    let mut units = Vec::new();
    let mut current = AccessUnit::default();

    for nal in split_annexb(data) {
        let Some(nal_type) = nal_unit_type_of(nal) else {
            continue;
        };
        let starts_unit = if is_vcl(nal_type) {
            is_first_slice_of_picture(nal)
        } else {
            true
        };
        if starts_unit && current.has_picture() {
            units.push(std::mem::take(&mut current));
        }

        current.is_key_frame |= nal_type == nal_unit_type::IDR_SLICE;
        current.nals.push(data.slice_ref(nal));
    }

    if !current.nals.is_empty() {
        units.push(current);
    }
    units
}

pub async fn read_annexb_file(path: impl AsRef<Path>) -> Result<Vec<AccessUnit>> {
    let data = Bytes::from(tokio::fs::read(path.as_ref()).await?);
    let units = access_units(&data);
    tracing::debug!(
        "{} access units in {}",
        units.len(),
        path.as_ref().display()
    );
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPS: &[u8] = &[0x67, 0x42, 0x00, 0x1F];
    const PPS: &[u8] = &[0x68, 0xCE, 0x3C, 0x80];
    // first_mb_in_slice == 0
    const IDR: &[u8] = &[0x65, 0x88, 0x84];
    const P_FIRST: &[u8] = &[0x41, 0x9A, 0x02];
    // first_mb_in_slice != 0, same picture
    const P_SECOND: &[u8] = &[0x41, 0x40, 0x11];

    fn stream(nals: &[&[u8]]) -> Bytes {
        let mut data = Vec::new();
        for (i, nal) in nals.iter().enumerate() {
            if i % 2 == 0 {
                data.extend_from_slice(&[0, 0, 0, 1]);
            } else {
                data.extend_from_slice(&[0, 0, 1]);
            }
            data.extend_from_slice(nal);
        }
        Bytes::from(data)
    }

    #[test]
    fn test_groups_parameter_sets_with_first_picture() {
        let units = access_units(&stream(&[SPS, PPS, IDR, P_FIRST, P_SECOND, P_FIRST]));

        assert_eq!(units.len(), 3);
        assert!(units[0].is_key_frame);
        assert_eq!(units[0].nals, vec![SPS, PPS, IDR]);
        assert!(!units[1].is_key_frame);
        assert_eq!(units[1].nals, vec![P_FIRST, P_SECOND]);
        assert_eq!(units[2].nals, vec![P_FIRST]);
    }

    #[test]
    fn test_parameter_sets_after_picture_open_next_unit() {
        let units = access_units(&stream(&[SPS, PPS, IDR, SPS, PPS, IDR]));
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|unit| unit.is_key_frame && unit.nals.len() == 3));
    }

    #[test]
    fn test_trailing_parameter_sets_are_kept() {
        let units = access_units(&stream(&[IDR, SPS]));
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].nals, vec![SPS]);
        assert!(access_units(&Bytes::new()).is_empty());
    }

    #[tokio::test]
    async fn test_read_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), stream(&[SPS, PPS, IDR, P_FIRST])).unwrap();

        let units = read_annexb_file(file.path()).await.unwrap();
        assert_eq!(units.len(), 2);
    }
}
