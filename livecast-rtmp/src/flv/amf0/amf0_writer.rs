use {
    super::{
        amf0_markers,
        define::{Amf0Object, Amf0ValueType},
        errors::{Amf0WriteError, Amf0WriteErrorValue},
    },
    crate::bytesio::bytes_writer::BytesWriter,
    byteorder::BigEndian,
    bytes::BytesMut,
};

#[derive(Default)]
pub struct Amf0Writer {
    writer: BytesWriter,
}

impl Amf0Writer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: BytesWriter::new(),
        }
    }

    pub fn write_anys(&mut self, values: &[Amf0ValueType]) -> Result<(), Amf0WriteError> {
        for val in values {
            self.write_any(val)?;
        }
        Ok(())
    }

    pub fn write_any(&mut self, value: &Amf0ValueType) -> Result<(), Amf0WriteError> {
        match value {
            Amf0ValueType::Boolean(val) => self.write_bool(*val),
            Amf0ValueType::Null => self.write_null(),
            Amf0ValueType::Undefined => self.write_undefined(),
            Amf0ValueType::Number(val) => self.write_number(*val),
            Amf0ValueType::UTF8String(val) => self.write_string(val),
            Amf0ValueType::LongUTF8String(val) => self.write_long_string(val),
            Amf0ValueType::Object(val) => self.write_object(val),
            Amf0ValueType::EcmaArray(val) => self.write_ecma_array(val),
            Amf0ValueType::StrictArray(values) => {
                self.writer.write_u8(amf0_markers::STRICT_ARRAY)?;
                self.writer.write_u32::<BigEndian>(values.len() as u32)?;
                self.write_anys(values)
            }
            Amf0ValueType::Date { millis, timezone } => {
                self.writer.write_u8(amf0_markers::DATE)?;
                self.writer.write_f64::<BigEndian>(*millis)?;
                self.writer.write_u16::<BigEndian>(*timezone as u16)?;
                Ok(())
            }
            Amf0ValueType::END => Err(Amf0WriteErrorValue::NotWritable.into()),
        }
    }

    pub fn write_number(&mut self, value: f64) -> Result<(), Amf0WriteError> {
        self.writer.write_u8(amf0_markers::NUMBER)?;
        self.writer.write_f64::<BigEndian>(value)?;
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), Amf0WriteError> {
        self.writer.write_u8(amf0_markers::BOOLEAN)?;
        self.writer.write_u8(u8::from(value))?;
        Ok(())
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), Amf0WriteError> {
        if value.len() > (u16::MAX as usize) {
            return Err(Amf0WriteErrorValue::NormalStringTooLong(value.len()).into());
        }
        self.writer.write_u8(amf0_markers::STRING)?;
        self.writer.write_u16::<BigEndian>(value.len() as u16)?;
        self.writer.write(value.as_bytes())?;
        Ok(())
    }

    pub fn write_long_string(&mut self, value: &str) -> Result<(), Amf0WriteError> {
        self.writer.write_u8(amf0_markers::LONG_STRING)?;
        self.writer.write_u32::<BigEndian>(value.len() as u32)?;
        self.writer.write(value.as_bytes())?;
        Ok(())
    }

    pub fn write_null(&mut self) -> Result<(), Amf0WriteError> {
        self.writer.write_u8(amf0_markers::NULL)?;
        Ok(())
    }

    pub fn write_undefined(&mut self) -> Result<(), Amf0WriteError> {
        self.writer.write_u8(amf0_markers::UNDEFINED)?;
        Ok(())
    }

    pub fn write_object_eof(&mut self) -> Result<(), Amf0WriteError> {
        self.writer.write_u24::<BigEndian>(u32::from(amf0_markers::OBJECT_END))?;
        Ok(())
    }

    pub fn write_object(&mut self, properties: &Amf0Object) -> Result<(), Amf0WriteError> {
        self.writer.write_u8(amf0_markers::OBJECT)?;
        self.write_properties(properties)
    }

    pub fn write_ecma_array(&mut self, properties: &Amf0Object) -> Result<(), Amf0WriteError> {
        self.writer.write_u8(amf0_markers::ECMA_ARRAY)?;
        self.writer
            .write_u32::<BigEndian>(properties.len() as u32)?;
        self.write_properties(properties)
    }

    fn write_properties(&mut self, properties: &Amf0Object) -> Result<(), Amf0WriteError> {
        for (key, value) in properties {
            if key.len() > (u16::MAX as usize) {
                return Err(Amf0WriteErrorValue::NormalStringTooLong(key.len()).into());
            }
            self.writer.write_u16::<BigEndian>(key.len() as u16)?;
            self.writer.write(key.as_bytes())?;
            self.write_any(value)?;
        }

        self.write_object_eof()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.writer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    pub fn extract_current_bytes(&mut self) -> BytesMut {
        self.writer.extract_current_bytes()
    }
}
