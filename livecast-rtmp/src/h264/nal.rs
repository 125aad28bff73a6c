use {super::nal_unit_type, bytes::BytesMut};

#[must_use]
pub fn nal_unit_type_of(nal: &[u8]) -> Option<u8> {
    nal.first().map(|byte| byte & 0x1F)
}

/// Length of a leading Annex-B start code, 0 when there is none.
#[must_use]
pub fn start_code_len(data: &[u8]) -> usize {
    if data.starts_with(&[0, 0, 0, 1]) {
        4
    } else if data.starts_with(&[0, 0, 1]) {
        3
    } else {
        0
    }
}

#[must_use]
pub fn strip_start_code(data: &[u8]) -> &[u8] {
    &data[start_code_len(data)..]
}

#[must_use]
pub fn is_vcl(nal_type: u8) -> bool {
    (nal_unit_type::NON_IDR_SLICE..=nal_unit_type::IDR_SLICE).contains(&nal_type)
}

/// A slice whose `first_mb_in_slice` is 0 starts a new picture. The field is
/// the first `ue(v)` after the header, so it is 0 exactly when the top bit is set.
#[must_use]
pub fn is_first_slice_of_picture(nal: &[u8]) -> bool {
    match nal_unit_type_of(nal) {
        Some(nal_type) if is_vcl(nal_type) => nal.get(1).is_some_and(|byte| byte & 0x80 != 0),
        _ => false,
    }
}

/// Split an Annex-B byte stream into NAL units without their start codes.
#[must_use]
pub fn split_annexb(data: &[u8]) -> Vec<&[u8]> {
    let mut units = Vec::new();
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            if let Some(begin) = start {
                let mut end = i;
                // a 4 byte start code leaves a trailing zero on the previous unit
                while end > begin && data[end - 1] == 0 {
                    end -= 1;
                }
                if end > begin {
                    units.push(&data[begin..end]);
                }
            }
            i += 3;
            start = Some(i);
        } else {
            i += 1;
        }
    }

    if let Some(begin) = start {
        if begin < data.len() {
            units.push(&data[begin..]);
        }
    } else if !data.is_empty() {
        units.push(data);
    }

    units
}

/// Drop the `0x03` in every `00 00 03` sequence.
#[must_use]
pub fn remove_emulation_prevention(data: &[u8]) -> BytesMut {
    let mut rbsp = BytesMut::with_capacity(data.len());
    let mut zeros = 0;

    for &byte in data {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }
        if byte == 0 {
            zeros += 1;
        } else {
            zeros = 0;
        }
        rbsp.extend_from_slice(&[byte]);
    }
    rbsp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_annexb() {
        let stream = [
            0, 0, 0, 1, 0x67, 0x42, //
            0, 0, 1, 0x68, 0xCE, //
            0, 0, 0, 1, 0x65, 0x88, 0x80,
        ];
        let units = split_annexb(&stream);
        assert_eq!(units.len(), 3);
        assert_eq!(units[0], &[0x67, 0x42]);
        assert_eq!(units[1], &[0x68, 0xCE]);
        assert_eq!(units[2], &[0x65, 0x88, 0x80]);
    }

    #[test]
    fn test_split_without_start_code() {
        let units = split_annexb(&[0x65, 0x88]);
        assert_eq!(units, vec![&[0x65_u8, 0x88][..]]);
    }

    #[test]
    fn test_emulation_prevention() {
        let rbsp = remove_emulation_prevention(&[0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03]);
        assert_eq!(&rbsp[..], &[0x00, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_first_slice() {
        assert!(is_first_slice_of_picture(&[0x65, 0x88]));
        assert!(!is_first_slice_of_picture(&[0x41, 0x08]));
        assert!(!is_first_slice_of_picture(&[0x67, 0xFF]));
        assert_eq!(start_code_len(&[0, 0, 1, 5]), 3);
        assert_eq!(strip_start_code(&[0, 0, 0, 1, 5]), &[5]);
    }
}
