//! Typed attribute values
//!
//! An attribute payload is a raw byte buffer whose shape is given by the
//! attribute type code; [`TypedValue::decode`] reinterprets it
use crate::TnefError;
use ctxutils::io::*;
use encoding_rs::Encoding;
use std::fmt;

/// Attribute type codes
pub mod atype {
    /// Sender triple
    pub const TRIPLES: u16 = 0x0000;
    /// NUL terminated 8-bit string
    pub const STRING: u16 = 0x0001;
    /// 8-bit text
    pub const TEXT: u16 = 0x0002;
    /// Packed date
    pub const DATE: u16 = 0x0003;
    /// 16-bit scalar
    pub const SHORT: u16 = 0x0004;
    /// 32-bit scalar
    pub const LONG: u16 = 0x0005;
    /// Byte array
    pub const BYTE: u16 = 0x0006;
    /// 16-bit array
    pub const WORD: u16 = 0x0007;
    /// 32-bit array
    pub const DWORD: u16 = 0x0008;

    /// Returns the type name, if the type is known
    pub fn name(t: u16) -> Option<&'static str> {
        Some(match t {
            TRIPLES => "triples",
            STRING => "string",
            TEXT => "text",
            DATE => "date",
            SHORT => "short",
            LONG => "long",
            BYTE => "byte",
            WORD => "word",
            DWORD => "dword",
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// A packed TNEF date (no timezone)
pub struct TnefDate {
    /// Year
    pub year: u16,
    /// Month (1-12)
    pub month: u16,
    /// Day of month
    pub day: u16,
    /// Hour
    pub hour: u16,
    /// Minute
    pub min: u16,
    /// Second
    pub sec: u16,
    /// Day of week (0 = Sunday)
    pub dow: u16,
}

impl TnefDate {
    /// Size of a packed date on the wire
    pub const SIZE: usize = 14;

    /// Decodes a packed date; the buffer must be exactly 14 bytes
    pub fn from_bytes(buf: &[u8]) -> Result<Self, TnefError> {
        if buf.len() != Self::SIZE {
            return Err(TnefError::corrupted(format!(
                "date attribute has {} bytes instead of {}",
                buf.len(),
                Self::SIZE
            )));
        }
        let f = |i: usize| le16_at(buf, i * 2).unwrap_or(0);
        Ok(Self {
            year: f(0),
            month: f(1),
            day: f(2),
            hour: f(3),
            min: f(4),
            sec: f(5),
            dow: f(6),
        })
    }

    /// Converts to a [`time::PrimitiveDateTime`], if the fields are valid
    pub fn to_datetime(&self) -> Option<time::PrimitiveDateTime> {
        let month = time::Month::try_from(u8::try_from(self.month).ok()?).ok()?;
        let date = time::Date::from_calendar_date(
            i32::from(self.year),
            month,
            u8::try_from(self.day).ok()?,
        )
        .ok()?;
        let time = time::Time::from_hms(
            u8::try_from(self.hour).ok()?,
            u8::try_from(self.min).ok()?,
            u8::try_from(self.sec).ok()?,
        )
        .ok()?;
        Some(time::PrimitiveDateTime::new(date, time))
    }
}

impl fmt::Display for TnefDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.min, self.sec
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Sender identification triple
pub struct SenderTriple {
    /// Triple id
    pub id: u16,
    /// Triple type
    pub chbgtrp: u16,
    /// Display name length (bytes)
    pub cch: u16,
    /// Address length (bytes)
    pub cb: u16,
    /// Sender display name (raw 8-bit, NUL stripped)
    pub display_name: Vec<u8>,
    /// Sender address (raw 8-bit, NUL stripped)
    pub address: Vec<u8>,
}

impl SenderTriple {
    fn from_bytes(buf: &[u8]) -> Result<Self, TnefError> {
        let cch = le16_at(buf, 4).unwrap_or(0);
        let name_end = 8 + usize::from(cch);
        if buf.len() <= 8 || buf.len() <= name_end {
            return Err(TnefError::corrupted(format!(
                "sender triple of {} bytes is too short",
                buf.len()
            )));
        }
        let cb = le16_at(buf, 6).unwrap_or(0);
        let addr_end = name_end.saturating_add(usize::from(cb)).min(buf.len());
        Ok(Self {
            id: le16_at(buf, 0).unwrap_or(0),
            chbgtrp: le16_at(buf, 2).unwrap_or(0),
            cch,
            cb,
            display_name: cut_at_nul(&buf[8..name_end]).to_vec(),
            address: cut_at_nul(&buf[name_end..addr_end]).to_vec(),
        })
    }
}

fn cut_at_nul(buf: &[u8]) -> &[u8] {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    &buf[..end]
}

#[derive(Debug, Clone, PartialEq)]
/// An attribute payload reinterpreted according to its type
pub enum TypedValue {
    /// Sender triple
    Triples(SenderTriple),
    /// 8-bit string, cut at the first NUL
    String(Vec<u8>),
    /// 8-bit text, cut at the first NUL
    Text(Vec<u8>),
    /// Packed date
    Date(TnefDate),
    /// 16-bit scalar
    Short(u16),
    /// 32-bit scalar
    Long(u32),
    /// Byte array
    Byte(Vec<u8>),
    /// 16-bit array
    Word(Vec<u16>),
    /// 32-bit array
    Dword(Vec<u32>),
}

impl TypedValue {
    /// Reinterprets `raw` according to the attribute type `attr_type`
    ///
    /// Scalars need at least their width, array types decode the whole
    /// elements that fit and drop any trailing partial element
    pub fn decode(attr_type: u16, raw: &[u8]) -> Result<Self, TnefError> {
        Ok(match attr_type {
            atype::TRIPLES => Self::Triples(SenderTriple::from_bytes(raw)?),
            atype::STRING => Self::String(cut_at_nul(raw).to_vec()),
            atype::TEXT => Self::Text(cut_at_nul(raw).to_vec()),
            atype::DATE => Self::Date(TnefDate::from_bytes(raw)?),
            atype::SHORT => Self::Short(
                le16_at(raw, 0).ok_or_else(|| undersized("short", raw.len()))?,
            ),
            atype::LONG => Self::Long(
                le32_at(raw, 0).ok_or_else(|| undersized("long", raw.len()))?,
            ),
            atype::BYTE => Self::Byte(raw.to_vec()),
            atype::WORD => Self::Word(
                raw.chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            atype::DWORD => Self::Dword(
                raw.chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            t => {
                return Err(TnefError::corrupted(format!(
                    "unknown attribute type {t:#06x}"
                )));
            }
        })
    }

    /// Returns the 8-bit string content decoded with `encoding`
    pub fn as_string(&self, encoding: &'static Encoding) -> Option<String> {
        match self {
            Self::String(v) | Self::Text(v) => Some(crate::text::decode_8bit(v, encoding)),
            _ => None,
        }
    }

    /// Returns the date, if the value is a date
    pub fn as_date(&self) -> Option<&TnefDate> {
        if let Self::Date(d) = self {
            Some(d)
        } else {
            None
        }
    }

    /// Returns the first 32-bit scalar held by the value
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Long(v) => Some(*v),
            Self::Short(v) => Some(u32::from(*v)),
            Self::Dword(v) => v.first().copied(),
            _ => None,
        }
    }
}

fn undersized(what: &str, len: usize) -> TnefError {
    TnefError::corrupted(format!("{what} attribute has only {len} bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars() -> Result<(), TnefError> {
        assert_eq!(TypedValue::decode(atype::SHORT, &[1, 2])?, TypedValue::Short(0x0201));
        assert_eq!(
            TypedValue::decode(atype::LONG, &[1, 2, 3, 4, 5])?,
            TypedValue::Long(0x04030201)
        );
        assert!(TypedValue::decode(atype::SHORT, &[1]).is_err());
        assert!(TypedValue::decode(atype::LONG, &[1, 2, 3]).is_err());
        assert!(TypedValue::decode(0x0042, &[1, 2, 3]).is_err());
        Ok(())
    }

    #[test]
    fn arrays() -> Result<(), TnefError> {
        assert_eq!(
            TypedValue::decode(atype::WORD, &[1, 0, 2, 0, 3])?,
            TypedValue::Word(vec![1, 2])
        );
        assert_eq!(
            TypedValue::decode(atype::DWORD, &[0xe4, 0x04, 0, 0, 1, 2])?,
            TypedValue::Dword(vec![1252])
        );
        assert_eq!(TypedValue::decode(atype::DWORD, &[1, 2])?, TypedValue::Dword(vec![]));
        assert_eq!(
            TypedValue::decode(atype::BYTE, &[9, 8, 7])?,
            TypedValue::Byte(vec![9, 8, 7])
        );
        Ok(())
    }

    #[test]
    fn strings() -> Result<(), TnefError> {
        let v = TypedValue::decode(atype::STRING, b"foo.txt\0\0garbage")?;
        assert_eq!(v, TypedValue::String(b"foo.txt".to_vec()));
        assert_eq!(v.as_string(encoding_rs::WINDOWS_1252).as_deref(), Some("foo.txt"));
        // No terminator on the wire
        assert_eq!(
            TypedValue::decode(atype::TEXT, b"body")?,
            TypedValue::Text(b"body".to_vec())
        );
        Ok(())
    }

    #[test]
    fn dates() -> Result<(), TnefError> {
        let raw = [
            0xd4, 0x07, 0x03, 0x00, 0x1c, 0x00, 0x0d, 0x00, 0x25, 0x00, 0x06, 0x00, 0x00, 0x00,
        ];
        let v = TypedValue::decode(atype::DATE, &raw)?;
        let d = v.as_date().unwrap();
        assert_eq!(d.to_string(), "2004-03-28T13:37:06");
        assert_eq!(d.dow, 0);
        let dt = d.to_datetime().unwrap();
        assert_eq!(dt.year(), 2004);
        assert_eq!(dt.minute(), 37);
        assert!(TypedValue::decode(atype::DATE, &raw[..13]).is_err());
        let mut long = raw.to_vec();
        long.push(0);
        assert!(TypedValue::decode(atype::DATE, &long).is_err());
        assert!(TnefDate::default().to_datetime().is_none());
        Ok(())
    }

    #[test]
    fn triples() -> Result<(), TnefError> {
        let mut raw = vec![1, 0, 2, 0, 4, 0, 6, 0];
        raw.extend_from_slice(b"Bob\0bob@x\0");
        let TypedValue::Triples(t) = TypedValue::decode(atype::TRIPLES, &raw)? else {
            panic!("not a triple");
        };
        assert_eq!(t.id, 1);
        assert_eq!(t.display_name, b"Bob");
        assert_eq!(t.address, b"bob@x");
        // cch pointing at the end of the payload
        assert!(TypedValue::decode(atype::TRIPLES, &raw[..12]).is_err());
        assert!(TypedValue::decode(atype::TRIPLES, &raw[..8]).is_err());
        Ok(())
    }
}
