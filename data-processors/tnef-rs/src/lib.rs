//! # A library to decode TNEF streams
//!
//! TNEF (Transport Neutral Encapsulation Format, the infamous `winmail.dat`)
//! is the container Outlook uses to wrap message bodies and attachments.
//!
//! The crate provides:
//! * [`TnefReader`], a lazy reader of the attribute records
//! * the typed value interpreter ([`value`]) and the MAPI property list
//!   decoder ([`mapi`])
//! * the compressed RTF decompressor ([`crtf`])
//! * the attachment name sanitizer ([`sanitize`])
//! * the assembly of attachments and bodies ([`assemble`]) and their safe
//!   storage on disk ([`output`])
//!
//! All input is treated as hostile: every length is bounds checked and every
//! allocation is capped by [`ParseOptions::max_alloc_size`]
//!
//! # Examples
//! ```no_run
//! use tnef_rs::{ParseOptions, TnefReader};
//! use std::fs::File;
//!
//! let f = File::open("winmail.dat").unwrap();
//! let reader = TnefReader::new(std::io::BufReader::new(f), ParseOptions::default()).unwrap();
//! for attr in reader {
//!     let attr = attr.unwrap();
//!     println!("{attr}");
//! }
//! ```

pub mod assemble;
pub mod attr;
pub mod checksum;
pub mod config;
pub mod crtf;
mod error;
pub mod mapi;
mod options;
pub mod output;
pub mod reader;
pub mod sanitize;
pub mod text;
pub mod value;

pub use assemble::{Body, BodyKind, ExtractedFile, Extraction, extract};
pub use attr::{Attribute, Level};
pub use error::TnefError;
pub use options::{DEFAULT_MAX_ALLOC_SIZE, ParseOptions};
pub use reader::TnefReader;
pub use sanitize::{SanitizeOptions, SanitizedPath, sanitize_name};
