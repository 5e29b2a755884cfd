//! Text re-encoding
//!
//! TNEF carries text either as UTF-16LE (MAPI unicode strings and named
//! property names) or as 8-bit strings in the sender's OEM codepage; both are
//! turned into UTF-8 here
use encoding_rs::{Encoding, UTF_16LE, WINDOWS_1252};
use tracing::debug;

/// Converts a UTF-16LE buffer to UTF-8
///
/// A trailing odd byte is dropped as are trailing NUL code units; unpaired
/// surrogates become U+FFFD
pub fn utf16le_to_utf8(buf: &[u8]) -> String {
    let even = &buf[..buf.len() & !1];
    let (s, had_errors) = UTF_16LE.decode_without_bom_handling(even);
    if had_errors {
        debug!("Malformed UTF-16 sequence replaced");
    }
    s.trim_end_matches('\0').to_string()
}

/// Returns the encoding for a Windows codepage number
///
/// Unknown or unsupported codepages fall back to Windows-1252
pub fn encoding_for_codepage(codepage: u32) -> &'static Encoding {
    u16::try_from(codepage)
        .ok()
        .and_then(codepage::to_encoding)
        .unwrap_or_else(|| {
            debug!("Codepage {codepage} not supported, using windows-1252");
            WINDOWS_1252
        })
}

/// Decodes an 8-bit string, stopping at the first NUL
pub fn decode_8bit(buf: &[u8], encoding: &'static Encoding) -> String {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    let (s, _) = encoding.decode_without_bom_handling(&buf[..end]);
    s.into_owned()
}
