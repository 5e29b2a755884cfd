//! Attribute records
//!
//! Every TNEF record is laid out as
//! `level:u8 | name:u16 type:u16 | length:u32 | payload | checksum:u16`
//! (all little endian), the checksum being the byte sum of the payload
use crate::checksum::ChecksumReader;
use crate::mapi::{self, MapiProperty};
use crate::value::{TypedValue, atype};
use crate::{ParseOptions, TnefError};
use ctxutils::io::*;
use std::fmt;
use std::io::Read;
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

/// Size of the fixed record header (level, type and name, length)
pub const HEADER_SIZE: usize = 9;

/// Attribute name ids
pub mod aname {
    #![allow(missing_docs)]
    pub const OWNER: u16 = 0x0000;
    pub const SENTFOR: u16 = 0x0001;
    pub const DELEGATE: u16 = 0x0002;
    pub const DATESTART: u16 = 0x0006;
    pub const DATEEND: u16 = 0x0007;
    pub const AIDOWNER: u16 = 0x0008;
    pub const REQUESTRES: u16 = 0x0009;
    pub const FROM: u16 = 0x8000;
    pub const SUBJECT: u16 = 0x8004;
    pub const DATESENT: u16 = 0x8005;
    pub const DATERECD: u16 = 0x8006;
    pub const MESSAGESTATUS: u16 = 0x8007;
    pub const MESSAGECLASS: u16 = 0x8008;
    pub const MESSAGEID: u16 = 0x8009;
    pub const PARENTID: u16 = 0x800a;
    pub const CONVERSATIONID: u16 = 0x800b;
    pub const BODY: u16 = 0x800c;
    pub const PRIORITY: u16 = 0x800d;
    pub const ATTACHDATA: u16 = 0x800f;
    pub const ATTACHTITLE: u16 = 0x8010;
    pub const ATTACHMETAFILE: u16 = 0x8011;
    pub const ATTACHCREATEDATE: u16 = 0x8012;
    pub const ATTACHMODIFYDATE: u16 = 0x8013;
    pub const DATEMODIFY: u16 = 0x8020;
    pub const ATTACHTRANSPORTFILENAME: u16 = 0x9001;
    pub const ATTACHRENDDATA: u16 = 0x9002;
    pub const MAPIPROPS: u16 = 0x9003;
    pub const RECIPTABLE: u16 = 0x9004;
    pub const ATTACHMENT: u16 = 0x9005;
    pub const TNEFVERSION: u16 = 0x9006;
    pub const OEMCODEPAGE: u16 = 0x9007;
    pub const ORIGINALMESSAGECLASS: u16 = 0x9008;

    /// Returns the attribute name, if known
    pub fn name(n: u16) -> Option<&'static str> {
        Some(match n {
            OWNER => "Owner",
            SENTFOR => "Sent For",
            DELEGATE => "Delegate",
            DATESTART => "Date Start",
            DATEEND => "Date End",
            AIDOWNER => "Owner Appointment ID",
            REQUESTRES => "Response Requested",
            FROM => "From",
            SUBJECT => "Subject",
            DATESENT => "Date Sent",
            DATERECD => "Date Received",
            MESSAGESTATUS => "Message Status",
            MESSAGECLASS => "Message Class",
            MESSAGEID => "Message ID",
            PARENTID => "Parent ID",
            CONVERSATIONID => "Conversation ID",
            BODY => "Body",
            PRIORITY => "Priority",
            ATTACHDATA => "Attachment Data",
            ATTACHTITLE => "Attachment File Name",
            ATTACHMETAFILE => "Attachment Meta File",
            ATTACHCREATEDATE => "Attachment Creation Date",
            ATTACHMODIFYDATE => "Attachment Modification Date",
            DATEMODIFY => "Date Modified",
            ATTACHTRANSPORTFILENAME => "Attachment Transport Filename",
            ATTACHRENDDATA => "Attachment Rendering Data",
            MAPIPROPS => "MAPI Properties",
            RECIPTABLE => "Recipients",
            ATTACHMENT => "Attachment",
            TNEFVERSION => "TNEF Version",
            OEMCODEPAGE => "OEM Codepage",
            ORIGINALMESSAGECLASS => "Original Message Class",
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The scope of an attribute
pub enum Level {
    /// Applies to the message
    Message,
    /// Applies to the current attachment
    Attachment,
}

impl TryFrom<u8> for Level {
    type Error = TnefError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0x01 => Ok(Self::Message),
            0x02 => Ok(Self::Attachment),
            v => Err(TnefError::corrupted(format!(
                "invalid attribute level {v:#04x}"
            ))),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => write!(f, "message"),
            Self::Attachment => write!(f, "attachment"),
        }
    }
}

#[derive(Debug, Clone)]
/// A decoded attribute record
pub struct Attribute {
    /// Record level
    pub level: Level,
    /// Declared wire type (see [`atype`])
    pub attr_type: u16,
    /// Attribute name id (see [`aname`])
    pub name: u16,
    /// Raw payload
    pub data: Vec<u8>,
    /// Checksum as stored in the record
    pub checksum: u16,
}

impl Attribute {
    /// Reads one complete record from `r`
    pub fn read<R: Read>(r: &mut R, opts: &ParseOptions) -> Result<Self, TnefError> {
        let mut header = [0u8; HEADER_SIZE];
        r.read_exact(&mut header)
            .map_err(|e| TnefError::from_read(e, "attribute header"))?;
        Self::read_with_header(&header, r, opts)
    }

    /// Reads the remainder of a record whose header was already consumed
    pub fn read_with_header<R: Read>(
        header: &[u8; HEADER_SIZE],
        r: &mut R,
        opts: &ParseOptions,
    ) -> Result<Self, TnefError> {
        let level = Level::try_from(header[0])?;
        let name = le16_at(header, 1).unwrap_or(0);
        let attr_type = le16_at(header, 3).unwrap_or(0);
        let len = le32_at(header, 5).unwrap_or(0);
        opts.check_alloc("attribute payload", u64::from(len))?;

        let mut payload = ChecksumReader::new(r.by_ref().take(u64::from(len)));
        let mut data: Vec<u8> = Vec::new();
        payload.read_to_end(&mut data)?;
        if data.len() as u64 != u64::from(len) {
            return Err(TnefError::corrupted(format!(
                "truncated attribute payload ({} of {} bytes)",
                data.len(),
                len
            )));
        }
        let computed = payload.sum();
        let checksum = rdu16le(r).map_err(|e| TnefError::from_read(e, "attribute checksum"))?;

        let attr = Self {
            level,
            attr_type,
            name,
            data,
            checksum,
        };
        if computed != checksum {
            if opts.ignore_checksum {
                warn!(
                    "Checksum mismatch on {} (stored {:#06x}, computed {:#06x}), continuing",
                    attr, checksum, computed
                );
            } else {
                return Err(TnefError::ChecksumMismatch {
                    stored: checksum,
                    computed,
                });
            }
        }
        Ok(attr)
    }

    /// Payload length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reinterprets the payload according to the declared type
    pub fn value(&self) -> Result<TypedValue, TnefError> {
        TypedValue::decode(self.attr_type, &self.data)
    }

    /// Returns true if the payload is a MAPI property list
    pub fn has_mapi_properties(&self) -> bool {
        matches!(self.name, aname::MAPIPROPS | aname::ATTACHMENT)
    }

    /// Decodes the payload as a MAPI property list
    pub fn mapi_properties(&self, opts: &ParseOptions) -> Result<Vec<MapiProperty>, TnefError> {
        mapi::decode_properties(&self.data, opts)
    }

    /// Human readable attribute name
    pub fn name_str(&self) -> &'static str {
        aname::name(self.name).unwrap_or("Unknown")
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attribute {:#06x} <{}> type {:#06x} <{}> size {}",
            self.level,
            self.name,
            self.name_str(),
            self.attr_type,
            atype::name(self.attr_type).unwrap_or("unknown"),
            self.data.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;

    fn record(level: u8, attr_type: u16, name: u16, payload: &[u8]) -> Vec<u8> {
        let mut v = vec![level];
        v.extend_from_slice(&((u32::from(attr_type) << 16) | u32::from(name)).to_le_bytes());
        v.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        v.extend_from_slice(payload);
        v.extend_from_slice(&checksum(payload).to_le_bytes());
        v
    }

    #[test]
    fn read_record() -> Result<(), TnefError> {
        let raw = record(2, atype::STRING, aname::ATTACHTITLE, b"foo.txt\0");
        let attr = Attribute::read(&mut raw.as_slice(), &ParseOptions::default())?;
        assert_eq!(attr.level, Level::Attachment);
        assert_eq!(attr.name, aname::ATTACHTITLE);
        assert_eq!(attr.attr_type, atype::STRING);
        assert_eq!(attr.data, b"foo.txt\0");
        assert_eq!(attr.name_str(), "Attachment File Name");
        assert_eq!(attr.value()?, TypedValue::String(b"foo.txt".to_vec()));
        Ok(())
    }

    #[test]
    fn checksum_policy() -> Result<(), TnefError> {
        let mut raw = record(1, atype::BYTE, aname::BODY, b"hello");
        let last = raw.len() - 1;
        raw[last] ^= 0x40;
        assert!(matches!(
            Attribute::read(&mut raw.as_slice(), &ParseOptions::default()),
            Err(TnefError::ChecksumMismatch { .. })
        ));
        let lenient = ParseOptions {
            ignore_checksum: true,
            ..Default::default()
        };
        let attr = Attribute::read(&mut raw.as_slice(), &lenient)?;
        assert_eq!(attr.data, b"hello");
        Ok(())
    }

    #[test]
    fn malformed_records() {
        let opts = ParseOptions::default();
        let raw = record(3, atype::BYTE, aname::BODY, b"x");
        assert!(matches!(
            Attribute::read(&mut raw.as_slice(), &opts),
            Err(TnefError::StructuralCorruption(_))
        ));
        let raw = record(1, atype::BYTE, aname::BODY, b"xyz");
        for cut in [4, 9, 11, raw.len() - 1] {
            assert!(matches!(
                Attribute::read(&mut &raw[..cut], &opts),
                Err(TnefError::StructuralCorruption(_))
            ));
        }
        let small = ParseOptions {
            max_alloc_size: 2,
            ..Default::default()
        };
        assert!(matches!(
            Attribute::read(&mut raw.as_slice(), &small),
            Err(TnefError::ResourceLimit { .. })
        ));
    }
}
