//! Win32 structs and fns
use std::fmt::{self, Debug, Display};

/// A Win32 GUID, stored as decoded from its mixed-endian wire form
#[derive(PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct GUID {
    /// First group, little endian on the wire
    pub data1: u32,
    /// Second group, little endian on the wire
    pub data2: u16,
    /// Third group, little endian on the wire
    pub data3: u16,
    /// Trailing bytes, stored as is
    pub data4: [u8; 8],
}

impl GUID {
    /// Size of a GUID on the wire
    pub const SIZE: usize = 16;

    /// Create a null (all zeroes) GUID
    pub fn null() -> Self {
        Self::default()
    }

    /// Create a GUID from exactly 16 raw bytes
    pub fn from_le_bytes(bytes: &[u8; 16]) -> Self {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&bytes[8..16]);
        Self {
            data1: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            data2: u16::from_le_bytes([bytes[4], bytes[5]]),
            data3: u16::from_le_bytes([bytes[6], bytes[7]]),
            data4,
        }
    }

    /// Create a GUID from the start of a slice
    ///
    /// Returns None if fewer than 16 bytes are available
    pub fn from_le_slice(bytes: &[u8]) -> Option<Self> {
        let raw: &[u8; 16] = bytes.get(0..Self::SIZE)?.try_into().ok()?;
        Some(Self::from_le_bytes(raw))
    }

    /// Check whether the GUID is null
    pub fn is_null(&self) -> bool {
        *self == Self::null()
    }
}

impl Display for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-",
            self.data1, self.data2, self.data3, self.data4[0], self.data4[1],
        )?;
        for b in &self.data4[2..] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl Debug for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self)
    }
}

/// Translates a windows FILETIME to a [datetime](time::OffsetDateTime)
///
/// Returns None for the null FILETIME (0, "no date") and for dates past year 9999
pub fn filetime_to_datetime(ftime: u64) -> Option<time::OffsetDateTime> {
    if ftime == 0 {
        return None;
    }
    let ftime = i128::from(ftime);
    let ftime = ftime.checked_sub(116444736000000000)?;
    time::OffsetDateTime::from_unix_timestamp_nanos(ftime * 100).ok()
}
