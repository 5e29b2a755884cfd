//! Miscellaneous utility functions and structures shared by the decoders
#![warn(missing_docs)]
pub mod io;
#[cfg(feature = "win32")]
pub mod win32;
