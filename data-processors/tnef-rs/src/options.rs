//! Decoder policy
//!
//! Every decoding entry point takes a [`ParseOptions`] explicitly; there is no
//! process wide state, so independent streams can be parsed concurrently with
//! different policies
use crate::TnefError;

/// Default allocation ceiling for a single decoded buffer (256 MiB)
pub const DEFAULT_MAX_ALLOC_SIZE: u64 = 256 * 1024 * 1024;

#[derive(Debug, Clone)]
/// Policy knobs for the decoders
pub struct ParseOptions {
    /// Warn and continue on attribute checksum mismatch instead of failing
    pub ignore_checksum: bool,
    /// Warn and skip the rest of a MAPI property list on corruption or
    /// invalid property types instead of failing
    pub ignore_encoding_errors: bool,
    /// Silently accept a trailing `\r\n` after the last attribute
    pub tolerate_cruft: bool,
    /// Largest single buffer the decoders are allowed to allocate
    pub max_alloc_size: u64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            ignore_checksum: false,
            ignore_encoding_errors: false,
            tolerate_cruft: false,
            max_alloc_size: DEFAULT_MAX_ALLOC_SIZE,
        }
    }
}

impl ParseOptions {
    /// Checks a requested allocation of `size` bytes against the ceiling
    pub fn check_alloc(&self, what: &'static str, size: u64) -> Result<(), TnefError> {
        if size > self.max_alloc_size {
            Err(TnefError::ResourceLimit {
                what,
                requested: size,
                limit: self.max_alloc_size,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_ceiling() {
        let opts = ParseOptions {
            max_alloc_size: 10,
            ..Default::default()
        };
        assert!(opts.check_alloc("payload", 10).is_ok());
        assert!(matches!(
            opts.check_alloc("payload", 11),
            Err(TnefError::ResourceLimit {
                requested: 11,
                limit: 10,
                ..
            })
        ));
    }
}
