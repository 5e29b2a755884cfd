//! TNEF container reader
use crate::attr::{Attribute, HEADER_SIZE};
use crate::{ParseOptions, TnefError};
use ctxutils::io::*;
use std::io::Read;
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

/// TNEF stream signature
pub const TNEF_SIGNATURE: u32 = 0x223e9f78;

/// A lazy, non restartable sequence of [`Attribute`] records
///
/// Iteration ends at the clean end of the stream, on trailing padding, or
/// after the first error
pub struct TnefReader<R: Read> {
    r: R,
    key: u16,
    opts: ParseOptions,
    done: bool,
}

impl<R: Read> TnefReader<R> {
    /// Validates the stream header and returns a record reader
    pub fn new(mut r: R, opts: ParseOptions) -> Result<Self, TnefError> {
        let mut sig = [0u8; 4];
        let got = read_up_to(&mut r, &mut sig)?;
        let signature = u32::from_le_bytes(sig);
        if got < sig.len() || signature != TNEF_SIGNATURE {
            return Err(TnefError::NotTnef { signature });
        }
        let key = rdu16le(&mut r).map_err(|e| TnefError::from_read(e, "TNEF key"))?;
        debug!("TNEF key: {key:#06x}");
        Ok(Self {
            r,
            key,
            opts,
            done: false,
        })
    }

    /// The legacy key from the stream header
    pub fn key(&self) -> u16 {
        self.key
    }

    /// The policy in effect
    pub fn options(&self) -> &ParseOptions {
        &self.opts
    }

    fn next_attribute(&mut self) -> Result<Option<Attribute>, TnefError> {
        let mut header = [0u8; HEADER_SIZE];
        let got = read_up_to(&mut self.r, &mut header[0..8])?;
        if got == 0 {
            return Ok(None);
        }
        if got < 8 {
            self.trailing(&header[0..got]);
            return Ok(None);
        }
        self.r
            .read_exact(&mut header[8..])
            .map_err(|e| TnefError::from_read(e, "attribute header"))?;
        let attr = Attribute::read_with_header(&header, &mut self.r, &self.opts)?;
        debug!("{attr}");
        Ok(Some(attr))
    }

    fn trailing(&self, data: &[u8]) {
        if self.opts.tolerate_cruft && data.len() == 2 && data[0] == b'\r' {
            warn!("Ignoring trailing cruft {data:02x?}");
        } else {
            error!("garbage at end of file ({} bytes: {data:02x?})", data.len());
        }
    }
}

impl<R: Read> Iterator for TnefReader<R> {
    type Item = Result<Attribute, TnefError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_attribute() {
            Ok(Some(attr)) => Some(Ok(attr)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for TnefReader<R> {}
