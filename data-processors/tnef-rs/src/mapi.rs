//! MAPI property lists
//!
//! The MAPIPROPS and ATTACHMENT attributes carry a self describing list of
//! MAPI properties:
//! ```text
//! count:u32
//! { type:u16 name:u16
//!   [ guid:16 named_count:u32 ( { len:u32 utf16[len] pad4 }* | real_name:u32 ) ]  (name & 0x8000)
//!   [ value_count:u32 ]                                          (multi-valued or variable)
//!   { value }* }*
//! ```
//! All offsets are checked against the buffer before use
pub mod tags;

use crate::text::utf16le_to_utf8;
use crate::{ParseOptions, TnefError, crtf};
pub use ctxutils::win32::{GUID, filetime_to_datetime};
use std::fmt;
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

/// Type flag marking a multi-valued property
pub const MULTI_VALUE_FLAG: u16 = 0x1000;
/// Name flag marking a GUID qualified property
pub const GUID_EXISTS_FLAG: u16 = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// MAPI property value type
pub enum MapiType {
    /// Unspecified (never valid on the wire)
    Unspecified,
    /// Null (never valid on the wire)
    Null,
    /// 16-bit integer
    Short,
    /// 32-bit integer
    Int,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Currency (scaled 64-bit integer)
    Currency,
    /// Application time (64-bit float days)
    AppTime,
    /// Error code (never valid at top level)
    Error,
    /// Boolean
    Boolean,
    /// Embedded object
    Object,
    /// 64-bit integer
    Int8Byte,
    /// 8-bit string
    String8,
    /// UTF-16 string
    Unicode,
    /// FILETIME
    SysTime,
    /// GUID
    Clsid,
    /// Binary blob
    Binary,
}

impl MapiType {
    /// Maps a wire type code (with the multi-value flag already removed)
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0x0000 => Self::Unspecified,
            0x0001 => Self::Null,
            0x0002 => Self::Short,
            0x0003 => Self::Int,
            0x0004 => Self::Float,
            0x0005 => Self::Double,
            0x0006 => Self::Currency,
            0x0007 => Self::AppTime,
            0x000a => Self::Error,
            0x000b => Self::Boolean,
            0x000d => Self::Object,
            0x0014 => Self::Int8Byte,
            0x001e => Self::String8,
            0x001f => Self::Unicode,
            0x0040 => Self::SysTime,
            0x0048 => Self::Clsid,
            0x0102 => Self::Binary,
            _ => return None,
        })
    }

    /// The wire type code
    pub fn code(&self) -> u16 {
        match self {
            Self::Unspecified => 0x0000,
            Self::Null => 0x0001,
            Self::Short => 0x0002,
            Self::Int => 0x0003,
            Self::Float => 0x0004,
            Self::Double => 0x0005,
            Self::Currency => 0x0006,
            Self::AppTime => 0x0007,
            Self::Error => 0x000a,
            Self::Boolean => 0x000b,
            Self::Object => 0x000d,
            Self::Int8Byte => 0x0014,
            Self::String8 => 0x001e,
            Self::Unicode => 0x001f,
            Self::SysTime => 0x0040,
            Self::Clsid => 0x0048,
            Self::Binary => 0x0102,
        }
    }

    /// Returns true for length prefixed types
    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            Self::String8 | Self::Unicode | Self::Object | Self::Binary
        )
    }

    /// Bytes consumed on the wire by one fixed size value
    fn stride(&self) -> usize {
        match self {
            Self::Short | Self::Int | Self::Float | Self::Error | Self::Boolean => 4,
            Self::Double | Self::Currency | Self::AppTime | Self::Int8Byte | Self::SysTime => 8,
            Self::Clsid => GUID::SIZE,
            // Length prefix
            _ => 4,
        }
    }
}

impl fmt::Display for MapiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unspecified => "PT_UNSPECIFIED",
            Self::Null => "PT_NULL",
            Self::Short => "PT_I2",
            Self::Int => "PT_LONG",
            Self::Float => "PT_R4",
            Self::Double => "PT_DOUBLE",
            Self::Currency => "PT_CURRENCY",
            Self::AppTime => "PT_APPTIME",
            Self::Error => "PT_ERROR",
            Self::Boolean => "PT_BOOLEAN",
            Self::Object => "PT_OBJECT",
            Self::Int8Byte => "PT_I8",
            Self::String8 => "PT_STRING8",
            Self::Unicode => "PT_UNICODE",
            Self::SysTime => "PT_SYSTIME",
            Self::Clsid => "PT_CLSID",
            Self::Binary => "PT_BINARY",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A single MAPI value
pub enum MapiValue {
    /// 16-bit integer
    Short(i16),
    /// 32-bit integer
    Int(i32),
    /// 32-bit float
    Float(f32),
    /// Boolean
    Boolean(bool),
    /// 64-bit float
    Double(f64),
    /// Currency (value * 10000)
    Currency(i64),
    /// Application time
    AppTime(f64),
    /// 64-bit integer
    Int8Byte(i64),
    /// Raw FILETIME
    SysTime(u64),
    /// GUID
    Clsid(GUID),
    /// 8-bit string bytes (codepage dependent)
    String8(Vec<u8>),
    /// UTF-16 string, already converted to UTF-8
    Unicode(String),
    /// Embedded object
    Object(Vec<u8>),
    /// Binary blob
    Binary(Vec<u8>),
}

impl MapiValue {
    /// Wire width of scalars, or the length of the owned buffer
    pub fn len(&self) -> usize {
        match self {
            Self::Short(_) => 2,
            Self::Int(_) | Self::Float(_) | Self::Boolean(_) => 4,
            Self::Double(_)
            | Self::Currency(_)
            | Self::AppTime(_)
            | Self::Int8Byte(_)
            | Self::SysTime(_) => 8,
            Self::Clsid(_) => GUID::SIZE,
            Self::String8(v) | Self::Object(v) | Self::Binary(v) => v.len(),
            Self::Unicode(s) => s.len(),
        }
    }

    /// Returns true if a buffer value is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the raw bytes of a buffer value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String8(v) | Self::Object(v) | Self::Binary(v) => Some(v),
            Self::Unicode(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Returns the value as a string, decoding 8-bit strings with `encoding`
    pub fn as_string(&self, encoding: &'static encoding_rs::Encoding) -> Option<String> {
        match self {
            Self::Unicode(s) => Some(s.clone()),
            Self::String8(v) => Some(crate::text::decode_8bit(v, encoding)),
            _ => None,
        }
    }

    /// Returns the value as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Short(v) => Some(i64::from(*v)),
            Self::Int(v) => Some(i64::from(*v)),
            Self::Int8Byte(v) | Self::Currency(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a SYSTIME value as datetime
    pub fn as_time(&self) -> Option<time::OffsetDateTime> {
        if let Self::SysTime(v) = self {
            filetime_to_datetime(*v)
        } else {
            None
        }
    }
}

impl fmt::Display for MapiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Double(v) | Self::AppTime(v) => write!(f, "{v}"),
            Self::Currency(v) | Self::Int8Byte(v) => write!(f, "{v}"),
            Self::SysTime(v) => match filetime_to_datetime(*v) {
                Some(t) => write!(f, "{t}"),
                None => write!(f, "{v:#018x}"),
            },
            Self::Clsid(g) => write!(f, "{g:?}"),
            Self::Unicode(s) => write!(f, "{s:?}"),
            Self::String8(v) => write!(f, "{:?}", String::from_utf8_lossy(v)),
            Self::Object(v) | Self::Binary(v) => {
                write!(f, "<{} bytes>", v.len())
            }
        }
    }
}

#[derive(Debug, Clone)]
/// A decoded MAPI property
pub struct MapiProperty {
    /// Value type
    pub ptype: MapiType,
    /// Whether the type carried the multi-value flag
    pub multi_valued: bool,
    /// Property id, possibly replaced by the real name of a GUID qualified
    /// property
    pub name: u32,
    /// Property set, for GUID qualified properties
    pub guid: Option<GUID>,
    /// Named property strings
    pub names: Vec<String>,
    /// Values
    pub values: Vec<MapiValue>,
}

impl MapiProperty {
    /// Number of values
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// The first value, if any
    pub fn first(&self) -> Option<&MapiValue> {
        self.values.first()
    }

    /// Human readable property name
    pub fn name_str(&self) -> String {
        if let Some(n) = self.names.first() {
            n.clone()
        } else if let Some(n) = tags::get_tag_name(self.name) {
            n.to_string()
        } else {
            format!("Tag#{:04x}", self.name)
        }
    }
}

impl fmt::Display for MapiProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#06x}) {}", self.name_str(), self.name, self.ptype)?;
        if self.multi_valued {
            write!(f, "[]")?;
        }
        if let Some(guid) = &self.guid {
            write!(f, " {guid:?}")?;
        }
        write!(f, " =")?;
        for v in &self.values {
            write!(f, " {v}")?;
        }
        Ok(())
    }
}

/// Bounds checked little endian reader over a property buffer
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn bytes(&mut self, len: usize, what: &str) -> Result<&'a [u8], TnefError> {
        if len > self.remaining() {
            return Err(TnefError::corrupted(format!(
                "{what} at offset {} needs {len} bytes, only {} left",
                self.pos,
                self.remaining()
            )));
        }
        let res = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(res)
    }

    fn u16(&mut self, what: &str) -> Result<u16, TnefError> {
        let b = self.bytes(2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, what: &str) -> Result<u32, TnefError> {
        let b = self.bytes(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self, what: &str) -> Result<u64, TnefError> {
        let lo = self.u32(what)?;
        let hi = self.u32(what)?;
        Ok(u64::from(hi) << 32 | u64::from(lo))
    }

    fn guid(&mut self, what: &str) -> Result<GUID, TnefError> {
        let b = self.bytes(GUID::SIZE, what)?;
        GUID::from_le_slice(b).ok_or_else(|| TnefError::corrupted(format!("short {what}")))
    }

    /// Skips up to `len` bytes of alignment padding
    ///
    /// Padding after the last value may be missing, so this never fails
    fn skip_padding(&mut self, len: usize) {
        self.pos += len.min(self.remaining());
    }

    /// Reads a length prefixed, 4-byte aligned buffer
    fn var_buf(&mut self, what: &str, opts: &ParseOptions) -> Result<&'a [u8], TnefError> {
        let len = self.u32(what)?;
        opts.check_alloc("MAPI value", u64::from(len))?;
        let len = usize::try_from(len).map_err(|_| TnefError::corrupted(format!("huge {what}")))?;
        let data = self.bytes(len, what)?;
        self.skip_padding(pad4(len) - len);
        Ok(data)
    }

    /// Reads an item count, making sure that `count` items of at least
    /// `min_size` bytes each can fit the remaining buffer
    fn count(&mut self, min_size: usize, what: &str) -> Result<usize, TnefError> {
        let count = self.u32(what)?;
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        if count.saturating_mul(min_size) > self.remaining() {
            return Err(TnefError::corrupted(format!(
                "{what} {count} exceeds the {} bytes left",
                self.remaining()
            )));
        }
        Ok(count)
    }
}

fn pad4(len: usize) -> usize {
    len.saturating_add(3) & !3
}

/// Decodes a MAPI property list
///
/// Illegal types and corrupted entries are fatal unless the
/// `ignore_encoding_errors` policy is set: then a warning is logged and the
/// properties decoded so far are returned. Allocation ceiling violations are
/// always fatal.
pub fn decode_properties(buf: &[u8], opts: &ParseOptions) -> Result<Vec<MapiProperty>, TnefError> {
    let mut cur = Cursor::new(buf);
    let count = match cur.count(4, "property count") {
        Ok(c) => c,
        Err(e) => return downgrade(e, Vec::new(), opts),
    };
    let mut props: Vec<MapiProperty> = Vec::with_capacity(count);
    for i in 0..count {
        match decode_property(&mut cur, opts) {
            Ok(prop) => {
                debug!("MAPI property {i}: {prop}");
                props.push(prop);
            }
            Err(e) => return downgrade(e, props, opts),
        }
    }
    if cur.remaining() > 0 {
        debug!("{} bytes left after MAPI property list", cur.remaining());
    }
    Ok(props)
}

fn downgrade(
    e: TnefError,
    props: Vec<MapiProperty>,
    opts: &ParseOptions,
) -> Result<Vec<MapiProperty>, TnefError> {
    if opts.ignore_encoding_errors && e.is_data_error() {
        warn!(
            "Skipping the rest of the MAPI property list after {} properties: {}",
            props.len(),
            e
        );
        Ok(props)
    } else {
        Err(e)
    }
}

fn decode_property(cur: &mut Cursor, opts: &ParseOptions) -> Result<MapiProperty, TnefError> {
    let raw_type = cur.u16("property type")?;
    let raw_name = cur.u16("property name")?;
    let multi_valued = raw_type & MULTI_VALUE_FLAG != 0;
    let type_code = raw_type & !MULTI_VALUE_FLAG;
    let ptype = match MapiType::from_code(type_code) {
        None | Some(MapiType::Null | MapiType::Error | MapiType::Unspecified) => {
            return Err(TnefError::InvalidPropertyType { ptype: raw_type });
        }
        Some(t) => t,
    };

    let mut name = u32::from(raw_name);
    let mut guid = None;
    let mut names = Vec::new();
    if raw_name & GUID_EXISTS_FLAG != 0 {
        guid = Some(cur.guid("property GUID")?);
        let num_names = cur.count(4, "named property count")?;
        if num_names > 0 {
            names.reserve(num_names);
            for _ in 0..num_names {
                let raw = cur.var_buf("property name string", opts)?;
                names.push(utf16le_to_utf8(raw));
            }
        } else {
            name = cur.u32("property real name")?;
        }
    }

    let num_values = if multi_valued || ptype.is_variable() {
        cur.count(ptype.stride(), "value count")?
    } else {
        1
    };
    let mut values = Vec::with_capacity(num_values);
    for _ in 0..num_values {
        values.push(decode_value(cur, ptype, opts)?);
    }

    let mut prop = MapiProperty {
        ptype,
        multi_valued,
        name,
        guid,
        names,
        values,
    };
    if prop.name == tags::RTF_COMPRESSED {
        decompress_rtf_values(&mut prop, opts)?;
    }
    Ok(prop)
}

fn decode_value(
    cur: &mut Cursor,
    ptype: MapiType,
    opts: &ParseOptions,
) -> Result<MapiValue, TnefError> {
    Ok(match ptype {
        MapiType::Short => {
            let v = cur.u16("short value")?;
            cur.skip_padding(2);
            MapiValue::Short(v as i16)
        }
        MapiType::Int => MapiValue::Int(cur.u32("int value")? as i32),
        MapiType::Float => MapiValue::Float(f32::from_bits(cur.u32("float value")?)),
        MapiType::Boolean => MapiValue::Boolean(cur.u32("boolean value")? != 0),
        MapiType::Double => MapiValue::Double(f64::from_bits(cur.u64("double value")?)),
        MapiType::AppTime => MapiValue::AppTime(f64::from_bits(cur.u64("apptime value")?)),
        MapiType::Currency => MapiValue::Currency(cur.u64("currency value")? as i64),
        MapiType::Int8Byte => MapiValue::Int8Byte(cur.u64("int8byte value")? as i64),
        MapiType::SysTime => MapiValue::SysTime(cur.u64("systime value")?),
        MapiType::Clsid => MapiValue::Clsid(cur.guid("clsid value")?),
        MapiType::String8 => MapiValue::String8(cur.var_buf("string value", opts)?.to_vec()),
        MapiType::Unicode => MapiValue::Unicode(utf16le_to_utf8(
            cur.var_buf("unicode string value", opts)?,
        )),
        MapiType::Object => MapiValue::Object(cur.var_buf("object value", opts)?.to_vec()),
        MapiType::Binary => MapiValue::Binary(cur.var_buf("binary value", opts)?.to_vec()),
        MapiType::Null | MapiType::Error | MapiType::Unspecified => {
            return Err(TnefError::InvalidPropertyType {
                ptype: ptype.code(),
            });
        }
    })
}

/// Replaces every buffer value of a compressed RTF property with its
/// decompressed content
fn decompress_rtf_values(prop: &mut MapiProperty, opts: &ParseOptions) -> Result<(), TnefError> {
    for v in prop.values.iter_mut() {
        if let MapiValue::Binary(buf) | MapiValue::Object(buf) = v {
            let rtf = crtf::decompress(buf, opts)?;
            debug!("Decompressed RTF body: {} -> {} bytes", buf.len(), rtf.len());
            *buf = rtf;
        }
    }
    Ok(())
}
