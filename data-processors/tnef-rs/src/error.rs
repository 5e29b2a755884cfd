use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TnefError {
    /// The stream does not start with the TNEF signature.
    #[error("not a TNEF file (signature {signature:#010x})")]
    NotTnef { signature: u32 },

    /// Bounds violation, undersized fixed payload, truncated record or any
    /// other framing defect. Always fatal to the parse.
    #[error("structural corruption: {0}")]
    StructuralCorruption(String),

    /// Attribute checksum does not match the sum of its payload bytes.
    #[error("invalid checksum (stored {stored:#06x}, computed {computed:#06x}), input file may be corrupted")]
    ChecksumMismatch { stored: u16, computed: u16 },

    /// Illegal top level or unrecognized MAPI property type.
    #[error("invalid MAPI property type {ptype:#06x}")]
    InvalidPropertyType { ptype: u16 },

    /// A decoded size exceeds the configured allocation ceiling.
    #[error("{what} size {requested} exceeds the configured limit of {limit} bytes")]
    ResourceLimit {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    /// The output target exists and neither overwriting nor numbering is allowed.
    #[error("{}: could not create file: file exists", .0.display())]
    FilesystemConflict(PathBuf),

    /// Wrapper for [`std::io::Error`](https://doc.rust-lang.org/std/io/struct.Error.html)
    #[error("IO error: {0:?}")]
    IO(#[from] io::Error),
}

impl TnefError {
    /// Shorthand for a [`TnefError::StructuralCorruption`]
    pub fn corrupted<S: Into<String>>(msg: S) -> Self {
        Self::StructuralCorruption(msg.into())
    }

    /// Maps an error raised while reading `what` from the input
    ///
    /// A premature end of input is a truncated record, not an I/O failure
    pub fn from_read(e: io::Error, what: &str) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::StructuralCorruption(format!("truncated {what}"))
        } else {
            Self::IO(e)
        }
    }

    /// Returns true if the error is caused by malformed input
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::NotTnef { .. }
                | Self::StructuralCorruption(_)
                | Self::ChecksumMismatch { .. }
                | Self::InvalidPropertyType { .. }
        )
    }

    /// Returns true if the input was not recognized as TNEF at all
    pub fn is_not_tnef(&self) -> bool {
        matches!(self, Self::NotTnef { .. })
    }
}
