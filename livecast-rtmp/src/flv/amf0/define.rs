use indexmap::IndexMap;

/// Property maps keep insertion order so commands go out exactly as built.
pub type Amf0Object = IndexMap<String, Amf0ValueType>;

#[derive(PartialEq, Clone, Debug)]
pub enum Amf0ValueType {
    Number(f64),
    Boolean(bool),
    UTF8String(String),
    Object(Amf0Object),
    Null,
    Undefined,
    EcmaArray(Amf0Object),
    StrictArray(Vec<Amf0ValueType>),
    /// Milliseconds since epoch and the (ignored) timezone offset.
    Date { millis: f64, timezone: i16 },
    LongUTF8String(String),
    END,
}

impl Amf0ValueType {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::UTF8String(s) | Self::LongUTF8String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<&Amf0Object> {
        match self {
            Self::Object(o) | Self::EcmaArray(o) => Some(o),
            _ => None,
        }
    }

    /// Look a property up on an object or ECMA array value.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Self> {
        self.as_object().and_then(|o| o.get(key))
    }
}
