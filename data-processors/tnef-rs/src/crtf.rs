//! Compressed RTF decompressor
//!
//! Message bodies are stored as [MS-OXRTFCP] streams: a 16 byte header
//! (`compsz`, `rawsz`, magic, crc) followed by either the raw RTF text or an
//! LZ77 variant whose 4096 byte window starts out preloaded with a fixed RTF
//! prologue
use crate::{ParseOptions, TnefError};
use ctxutils::io::*;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

/// Magic of a compressed stream ("LZFu")
pub const MAGIC_COMPRESSED: u32 = 0x75465a4c;
/// Magic of an uncompressed stream ("MELA")
pub const MAGIC_UNCOMPRESSED: u32 = 0x414c454d;
/// Size of the stream header
pub const HEADER_SIZE: usize = 16;

const WINDOW_SIZE: usize = 4096;

static DICT_INIT: &[u8; 207] =
    b"{\\rtf1\\ansi\\mac\\deff0\\deftab720{\\fonttbl;}{\\f0\\fnil \\froman \\fswiss \\fmodern \\fscript \\fdecor MS Sans SerifSymbolArialTimes New RomanCourier{\\colortbl\\red0\\green0\\blue0\r\n\\par \\pard\\plain\\f0\\fs20\\b\\i\\u\\tab\\tx";

/// The sliding window
///
/// Positions are absolute output offsets (prologue included) modulo 4096
struct Dict {
    buf: [u8; WINDOW_SIZE],
    wr: usize,
    rd: usize,
    sz: usize,
    control: u8,
    control_bits: u8,
}

impl Dict {
    /// Returns true if the next token is a back reference
    fn next_token(&mut self, input: &mut &[u8]) -> Result<bool, TnefError> {
        if self.control_bits == 0 {
            self.control = rdu8(input).map_err(|_| truncated())?;
            self.control_bits = 8;
        }
        let res = self.control & 1 != 0;
        self.control >>= 1;
        self.control_bits -= 1;
        Ok(res)
    }

    fn push_byte(&mut self, byte: u8) {
        self.buf[self.wr] = byte;
        self.wr = (self.wr + 1) % WINDOW_SIZE;
        self.sz = (self.sz + 1).min(WINDOW_SIZE);
    }

    /// Positions the read cursor
    ///
    /// A reference to a window slot which was never written is invalid
    fn set_offset(&mut self, off: usize) -> Result<(), TnefError> {
        if self.sz <= off {
            Err(TnefError::corrupted(format!(
                "compressed RTF reference to offset {off} beyond the {} bytes produced",
                self.sz
            )))
        } else {
            self.rd = off;
            Ok(())
        }
    }

    fn pop_byte(&mut self) -> u8 {
        let res = self.buf[self.rd];
        self.push_byte(res);
        self.rd = (self.rd + 1) % WINDOW_SIZE;
        res
    }
}

impl Default for Dict {
    fn default() -> Self {
        let mut buf = [0u8; WINDOW_SIZE];
        buf[0..DICT_INIT.len()].copy_from_slice(DICT_INIT);
        Self {
            buf,
            wr: DICT_INIT.len(),
            rd: 0,
            sz: DICT_INIT.len(),
            control: 0,
            control_bits: 0,
        }
    }
}

fn truncated() -> TnefError {
    TnefError::corrupted("truncated compressed RTF stream")
}

const CRC_LUT: [u32; 256] = {
    let mut lut = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { 0xedb88320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        lut[i] = c;
        i += 1;
    }
    lut
};

/// Computes the [MS-OXRTFCP] crc (no pre or post conditioning)
pub fn crc32(data: &[u8]) -> u32 {
    data.iter()
        .fold(0u32, |crc, b| CRC_LUT[usize::from(crc as u8 ^ *b)] ^ (crc >> 8))
}

/// Runs the LZ77 decoder until exactly `rawsz` bytes are produced
fn inflate(mut input: &[u8], rawsz: usize) -> Result<Vec<u8>, TnefError> {
    let mut dict = Dict::default();
    let mut out: Vec<u8> = Vec::with_capacity(rawsz);
    while out.len() < rawsz {
        if dict.next_token(&mut input)? {
            let dictref = rdu16be(&mut input).map_err(|_| truncated())?;
            let off = usize::from(dictref >> 4);
            let len = usize::from(dictref & 0b1111) + 2;
            if out.len() + len > rawsz {
                return Err(TnefError::corrupted(format!(
                    "compressed RTF reference of {len} bytes overruns the declared size {rawsz}"
                )));
            }
            dict.set_offset(off)?;
            for _ in 0..len {
                out.push(dict.pop_byte());
            }
        } else {
            let lit = rdu8(&mut input).map_err(|_| truncated())?;
            dict.push_byte(lit);
            out.push(lit);
        }
    }
    if !input.is_empty() {
        debug!("{} bytes left in compressed RTF stream", input.len());
    }
    Ok(out)
}

/// Decodes a compressed RTF value buffer
///
/// Returns exactly `rawsz` bytes. The stored crc is only checked for
/// diagnostic purposes.
pub fn decompress(buf: &[u8], opts: &ParseOptions) -> Result<Vec<u8>, TnefError> {
    let header = |off: usize| {
        le32_at(buf, off).ok_or_else(|| TnefError::corrupted("short compressed RTF header"))
    };
    let compsz = header(0)?;
    let rawsz = header(4)?;
    let magic = header(8)?;
    let ref_crc = header(12)?;
    opts.check_alloc("RTF body", u64::from(rawsz))?;
    let rawsz = usize::try_from(rawsz).map_err(|_| truncated())?;
    let payload = &buf[HEADER_SIZE..];

    match magic {
        MAGIC_UNCOMPRESSED => payload.get(..rawsz).map(|s| s.to_vec()).ok_or_else(|| {
            TnefError::corrupted(format!(
                "uncompressed RTF stream holds {} bytes, {rawsz} declared",
                payload.len()
            ))
        }),
        MAGIC_COMPRESSED => {
            if u64::from(compsz) + 4 != buf.len() as u64 {
                debug!(
                    "Compressed RTF size {} does not match the buffer size {}",
                    compsz,
                    buf.len()
                );
            }
            let crc_len = usize::try_from(compsz)
                .unwrap_or(usize::MAX)
                .saturating_sub(HEADER_SIZE - 4)
                .min(payload.len());
            let crc = crc32(&payload[..crc_len]);
            if crc != ref_crc {
                debug!("Compressed RTF crc mismatch (stored {ref_crc:#010x}, computed {crc:#010x})");
            }
            inflate(payload, rawsz)
        }
        other => Err(TnefError::corrupted(format!(
            "invalid compressed RTF magic {other:#010x}"
        ))),
    }
}
