use {
    super::{
        amf0_markers,
        define::{Amf0Object, Amf0ValueType},
        errors::{Amf0ReadError, Amf0ReadErrorValue},
    },
    crate::bytesio::bytes_reader::BytesReader,
    byteorder::BigEndian,
};

/// Servers never nest this deep; anything beyond it is garbage.
const MAX_NESTING_DEPTH: usize = 16;

pub struct Amf0Reader {
    reader: BytesReader,
}

impl Amf0Reader {
    #[must_use]
    pub const fn new(reader: BytesReader) -> Self {
        Self { reader }
    }

    /// Decode values until the payload is exhausted.
    pub fn read_all(&mut self) -> Result<Vec<Amf0ValueType>, Amf0ReadError> {
        let mut results = vec![];

        while !self.reader.is_empty() {
            results.push(self.read_any()?);
        }
        Ok(results)
    }

    pub fn read_any(&mut self) -> Result<Amf0ValueType, Amf0ReadError> {
        self.read_value(0)
    }

    fn read_value(&mut self, depth: usize) -> Result<Amf0ValueType, Amf0ReadError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Amf0ReadErrorValue::NestingTooDeep(MAX_NESTING_DEPTH).into());
        }

        let markers = self.reader.read_u8()?;

        match markers {
            amf0_markers::NUMBER => self.read_number(),
            amf0_markers::BOOLEAN => self.read_bool(),
            amf0_markers::STRING => self.read_string(),
            amf0_markers::OBJECT => Ok(Amf0ValueType::Object(self.read_properties(depth)?)),
            amf0_markers::NULL => Ok(Amf0ValueType::Null),
            amf0_markers::UNDEFINED | amf0_markers::UNSUPPORTED => Ok(Amf0ValueType::Undefined),
            amf0_markers::REFERENCE => {
                // references are never emitted by publishing peers, skip the index
                self.reader.read_u16::<BigEndian>()?;
                Ok(Amf0ValueType::Undefined)
            }
            amf0_markers::ECMA_ARRAY => {
                // the associative count is advisory only
                self.reader.read_u32::<BigEndian>()?;
                Ok(Amf0ValueType::EcmaArray(self.read_properties(depth)?))
            }
            amf0_markers::STRICT_ARRAY => {
                let count = self.reader.read_u32::<BigEndian>()?;
                let mut values = Vec::new();
                for _ in 0..count {
                    values.push(self.read_value(depth + 1)?);
                }
                Ok(Amf0ValueType::StrictArray(values))
            }
            amf0_markers::DATE => {
                let millis = self.reader.read_f64::<BigEndian>()?;
                let timezone = self.reader.read_u16::<BigEndian>()? as i16;
                Ok(Amf0ValueType::Date { millis, timezone })
            }
            amf0_markers::LONG_STRING => self.read_long_string(),
            amf0_markers::OBJECT_END => Ok(Amf0ValueType::END),
            _ => Err(Amf0ReadErrorValue::UnknownMarker { marker: markers }.into()),
        }
    }

    pub fn read_with_type(&mut self, specified_marker: u8) -> Result<Amf0ValueType, Amf0ReadError> {
        let marker = self.reader.peek_u8()?;

        if marker != specified_marker {
            return Err(Amf0ReadErrorValue::WrongType.into());
        }

        self.read_any()
    }

    pub fn read_number(&mut self) -> Result<Amf0ValueType, Amf0ReadError> {
        let number = self.reader.read_f64::<BigEndian>()?;
        Ok(Amf0ValueType::Number(number))
    }

    pub fn read_bool(&mut self) -> Result<Amf0ValueType, Amf0ReadError> {
        let value = self.reader.read_u8()?;
        Ok(Amf0ValueType::Boolean(value != 0))
    }

    pub fn read_raw_string(&mut self) -> Result<String, Amf0ReadError> {
        let l = self.reader.read_u16::<BigEndian>()?;
        let bytes = self.reader.read_bytes(l as usize)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub fn read_string(&mut self) -> Result<Amf0ValueType, Amf0ReadError> {
        let raw_string = self.read_raw_string()?;
        Ok(Amf0ValueType::UTF8String(raw_string))
    }

    pub fn read_long_string(&mut self) -> Result<Amf0ValueType, Amf0ReadError> {
        let l = self.reader.read_u32::<BigEndian>()?;
        let bytes = self.reader.read_bytes(l as usize)?;
        Ok(Amf0ValueType::LongUTF8String(String::from_utf8(bytes.to_vec())?))
    }

    fn is_read_object_eof(&mut self) -> Result<bool, Amf0ReadError> {
        let is_eof = self.reader.get(0)? == 0
            && self.reader.get(1)? == 0
            && self.reader.get(2)? == amf0_markers::OBJECT_END;
        if is_eof {
            self.reader.advance_bytes(3)?;
        }
        Ok(is_eof)
    }

    fn read_properties(&mut self, depth: usize) -> Result<Amf0Object, Amf0ReadError> {
        let mut properties = Amf0Object::new();

        loop {
            if self.is_read_object_eof()? {
                break;
            }

            let key = self.read_raw_string()?;
            let val = self.read_value(depth + 1)?;
            properties.insert(key, val);
        }

        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{amf0_markers, amf0_writer::Amf0Writer, define::Amf0Object};
    use super::Amf0Reader;
    use super::Amf0ValueType;
    use crate::bytesio::bytes_reader::BytesReader;
    use bytes::BytesMut;

    #[test]
    fn test_read_on_status() {
        let mut writer = Amf0Writer::new();
        writer.write_string("onStatus").unwrap();
        writer.write_number(0.0).unwrap();
        writer.write_null().unwrap();

        let mut info = Amf0Object::new();
        info.insert("level".to_string(), Amf0ValueType::UTF8String("status".to_string()));
        info.insert(
            "code".to_string(),
            Amf0ValueType::UTF8String("NetStream.Publish.Start".to_string()),
        );
        info.insert("clientid".to_string(), Amf0ValueType::Number(1.0));
        writer.write_object(&info).unwrap();

        let mut reader = Amf0Reader::new(BytesReader::new(writer.extract_current_bytes()));
        let values = reader.read_all().unwrap();

        assert_eq!(values.len(), 4);
        assert_eq!(values[0].as_str(), Some("onStatus"));
        assert_eq!(values[2], Amf0ValueType::Null);
        assert_eq!(
            values[3].property("code").and_then(Amf0ValueType::as_str),
            Some("NetStream.Publish.Start")
        );
        // property order is preserved
        let keys: Vec<&String> = values[3].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["level", "code", "clientid"]);
    }

    #[test]
    fn test_unknown_marker() {
        let mut reader = Amf0Reader::new(BytesReader::new(BytesMut::from(&[0x42_u8][..])));
        assert!(reader.read_any().is_err());
    }

    #[test]
    fn test_read_with_wrong_type() {
        let data = [amf0_markers::NULL];
        let mut reader = Amf0Reader::new(BytesReader::new(BytesMut::from(&data[..])));
        assert!(reader.read_with_type(amf0_markers::STRING).is_err());
        assert_eq!(
            reader.read_with_type(amf0_markers::NULL).unwrap(),
            Amf0ValueType::Null
        );
    }

    #[test]
    fn test_truncated_object() {
        // object marker, key "a", number marker without payload
        let data = [amf0_markers::OBJECT, 0x00, 0x01, b'a', amf0_markers::NUMBER];
        let mut reader = Amf0Reader::new(BytesReader::new(BytesMut::from(&data[..])));
        assert!(reader.read_any().is_err());
    }
}
