//! Attachment and body assembly
//!
//! Walks the attribute sequence and collects the attachments (name, content,
//! dates, MIME information) and the message bodies
use crate::attr::{Attribute, Level, aname};
use crate::mapi::{MapiProperty, MapiValue, tags};
use crate::reader::TnefReader;
use crate::sanitize::{SanitizeOptions, SanitizedPath, sanitize_name};
use crate::text::encoding_for_codepage;
use crate::value::TnefDate;
use crate::{ParseOptions, TnefError};
use encoding_rs::{Encoding, WINDOWS_1252};
use std::io::Read;
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

/// Size of the interface id prefixing embedded object data
const OBJECT_IID_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Message body flavour
pub enum BodyKind {
    /// Plain text
    Text,
    /// HTML
    Html,
    /// RTF (decompressed)
    Rtf,
}

impl BodyKind {
    /// File name extension used when saving the body
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Html => "html",
            Self::Rtf => "rtf",
        }
    }

    /// Maps a body preference letter (`t`, `h` or `r`)
    pub fn from_pref(c: char) -> Option<Self> {
        match c {
            't' => Some(Self::Text),
            'h' => Some(Self::Html),
            'r' => Some(Self::Rtf),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
/// A message body
pub struct Body {
    /// Flavour
    pub kind: BodyKind,
    /// Content
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
/// An assembled attachment
pub struct ExtractedFile {
    /// Name as found in the stream
    pub name: Option<String>,
    /// Sanitized relative path, None if a default name must be used
    pub sanitized: Option<SanitizedPath>,
    /// Content
    pub data: Vec<u8>,
    /// Modification date
    pub modified: Option<TnefDate>,
    /// MIME type
    pub mime_type: Option<String>,
    /// Content-ID
    pub content_id: Option<String>,
}

#[derive(Debug, Default)]
/// Everything extracted from a TNEF stream
pub struct Extraction {
    /// Attachments, in stream order
    pub files: Vec<ExtractedFile>,
    /// Message bodies, in stream order
    pub bodies: Vec<Body>,
}

impl Extraction {
    /// Picks the first available body following `pref` (e.g. `"rht"`)
    pub fn preferred_body(&self, pref: &str) -> Option<&Body> {
        pref.chars()
            .filter_map(BodyKind::from_pref)
            .find_map(|kind| self.bodies.iter().find(|b| b.kind == kind))
    }
}

/// Incremental assembler fed one attribute at a time
pub struct Assembler {
    opts: ParseOptions,
    sanitize: SanitizeOptions,
    encoding: &'static Encoding,
    current: Option<ExtractedFile>,
    files: Vec<ExtractedFile>,
    bodies: Vec<Body>,
    mapi_text: Vec<Body>,
    has_body_attr: bool,
}

impl Assembler {
    /// Creates a new assembler
    pub fn new(opts: ParseOptions, sanitize: SanitizeOptions) -> Self {
        Self {
            opts,
            sanitize,
            encoding: WINDOWS_1252,
            current: None,
            files: Vec::new(),
            bodies: Vec::new(),
            mapi_text: Vec::new(),
            has_body_attr: false,
        }
    }

    /// Processes one attribute
    pub fn push(&mut self, attr: &Attribute) -> Result<(), TnefError> {
        match attr.level {
            Level::Attachment => self.push_attachment(attr),
            Level::Message => self.push_message(attr),
        }
    }

    fn push_attachment(&mut self, attr: &Attribute) -> Result<(), TnefError> {
        if attr.name == aname::ATTACHRENDDATA {
            self.emit();
            self.current = Some(ExtractedFile::default());
            return Ok(());
        }
        let file = self.current.get_or_insert_with(ExtractedFile::default);
        match attr.name {
            aname::ATTACHTITLE => {
                let name = attr.value()?.as_string(self.encoding);
                debug!("Attachment title: {name:?}");
                file.name = name;
            }
            aname::ATTACHDATA => {
                file.data = attr.data.clone();
            }
            aname::ATTACHMODIFYDATE => {
                file.modified = attr.value()?.as_date().copied();
            }
            aname::ATTACHMENT => {
                let props = attr.mapi_properties(&self.opts)?;
                apply_attachment_props(file, &props, self.encoding);
            }
            _ => {}
        }
        Ok(())
    }

    fn push_message(&mut self, attr: &Attribute) -> Result<(), TnefError> {
        match attr.name {
            aname::OEMCODEPAGE => {
                if let Some(cp) = attr.value()?.as_u32() {
                    self.encoding = encoding_for_codepage(cp);
                    debug!("OEM codepage {cp} ({})", self.encoding.name());
                }
            }
            aname::BODY => {
                let end = attr.data.iter().position(|b| *b == 0).unwrap_or(attr.len());
                self.bodies.push(Body {
                    kind: BodyKind::Text,
                    data: attr.data[..end].to_vec(),
                });
                self.has_body_attr = true;
            }
            aname::MAPIPROPS => {
                for prop in attr.mapi_properties(&self.opts)? {
                    let kind = match prop.name {
                        tags::BODY_HTML => BodyKind::Html,
                        tags::RTF_COMPRESSED => BodyKind::Rtf,
                        tags::BODY => BodyKind::Text,
                        _ => continue,
                    };
                    for v in prop.values {
                        let data = match v {
                            MapiValue::Unicode(s) => s.into_bytes(),
                            MapiValue::String8(b) | MapiValue::Binary(b) | MapiValue::Object(b) => b,
                            _ => continue,
                        };
                        let body = Body { kind, data };
                        if kind == BodyKind::Text {
                            self.mapi_text.push(body);
                        } else {
                            self.bodies.push(body);
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn emit(&mut self) {
        if let Some(mut file) = self.current.take() {
            file.sanitized = file
                .name
                .as_deref()
                .and_then(|n| sanitize_name(n, &self.sanitize));
            debug!(
                "Attachment complete: {:?} ({} bytes)",
                file.name,
                file.data.len()
            );
            self.files.push(file);
        }
    }

    /// Completes the pending attachment and returns the result
    pub fn finish(mut self) -> Extraction {
        self.emit();
        if !self.has_body_attr {
            self.bodies.append(&mut self.mapi_text);
        }
        Extraction {
            files: self.files,
            bodies: self.bodies,
        }
    }
}

fn apply_attachment_props(
    file: &mut ExtractedFile,
    props: &[MapiProperty],
    encoding: &'static Encoding,
) {
    for prop in props {
        let Some(value) = prop.first() else {
            continue;
        };
        match prop.name {
            tags::ATTACH_LONG_FILENAME => {
                if let Some(name) = value.as_string(encoding) {
                    debug!("Attachment long file name: {name:?}");
                    file.name = Some(name);
                }
            }
            tags::ATTACH_DATA_OBJ => match value {
                MapiValue::Binary(data) => file.data = data.clone(),
                MapiValue::Object(data) => {
                    file.data = data.get(OBJECT_IID_SIZE..).unwrap_or_default().to_vec()
                }
                _ => {}
            },
            tags::ATTACH_MIME_TAG => file.mime_type = value.as_string(encoding),
            tags::ATTACH_CONTENT_ID => file.content_id = value.as_string(encoding),
            _ => {}
        }
    }
}

/// Decodes a whole TNEF stream into attachments and bodies
///
/// Nothing is returned unless the entire stream decodes successfully
pub fn extract<R: Read>(
    r: R,
    opts: &ParseOptions,
    sanitize: &SanitizeOptions,
) -> Result<Extraction, TnefError> {
    let reader = TnefReader::new(r, opts.clone())?;
    let mut asm = Assembler::new(opts.clone(), sanitize.clone());
    for attr in reader {
        asm.push(&attr?)?;
    }
    Ok(asm.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::atype;

    fn attr(level: Level, attr_type: u16, name: u16, data: &[u8]) -> Attribute {
        Attribute {
            level,
            attr_type,
            name,
            data: data.to_vec(),
            checksum: crate::checksum::checksum(data),
        }
    }

    fn mapi_list(props: &[(u16, u16, &[u8])]) -> Vec<u8> {
        let mut buf = (props.len() as u32).to_le_bytes().to_vec();
        for (ptype, name, data) in props {
            buf.extend_from_slice(&ptype.to_le_bytes());
            buf.extend_from_slice(&name.to_le_bytes());
            buf.extend_from_slice(&1u32.to_le_bytes());
            buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
            buf.extend_from_slice(data);
            buf.resize(buf.len().next_multiple_of(4), 0);
        }
        buf
    }

    #[test]
    fn attachments() -> Result<(), TnefError> {
        let mut asm = Assembler::new(ParseOptions::default(), SanitizeOptions::default());
        asm.push(&attr(Level::Attachment, atype::BYTE, aname::ATTACHRENDDATA, &[0; 14]))?;
        asm.push(&attr(Level::Attachment, atype::STRING, aname::ATTACHTITLE, b"SHORT~1.TXT\0"))?;
        asm.push(&attr(Level::Attachment, atype::BYTE, aname::ATTACHDATA, b"first"))?;
        let props = mapi_list(&[
            (0x001f, 0x3707, b"l\0o\0n\0g\0.\0t\0x\0t\0\0\0"),
            (0x001e, 0x370e, b"text/plain\0"),
            (0x001e, 0x3712, b"<cid@x>\0"),
        ]);
        asm.push(&attr(Level::Attachment, atype::BYTE, aname::ATTACHMENT, &props))?;
        asm.push(&attr(Level::Attachment, atype::BYTE, aname::ATTACHRENDDATA, &[0; 14]))?;
        asm.push(&attr(Level::Attachment, atype::STRING, aname::ATTACHTITLE, b"..\\..\\x.bat\0"))?;
        let mut obj = vec![0xaa; 16];
        obj.extend_from_slice(b"embedded");
        let props = mapi_list(&[(0x000d, 0x3701, &obj)]);
        asm.push(&attr(Level::Attachment, atype::BYTE, aname::ATTACHMENT, &props))?;
        let ex = asm.finish();

        assert_eq!(ex.files.len(), 2);
        let f = &ex.files[0];
        assert_eq!(f.name.as_deref(), Some("long.txt"));
        assert_eq!(f.sanitized.as_ref().map(|s| s.to_string()).as_deref(), Some("long.txt"));
        assert_eq!(f.data, b"first");
        assert_eq!(f.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(f.content_id.as_deref(), Some("<cid@x>"));
        let f = &ex.files[1];
        assert_eq!(f.sanitized.as_ref().map(|s| s.base.as_str()), Some("x.bat"));
        assert_eq!(f.data, b"embedded");
        assert!(ex.bodies.is_empty());
        Ok(())
    }

    #[test]
    fn implicit_file_and_dates() -> Result<(), TnefError> {
        let mut asm = Assembler::new(ParseOptions::default(), SanitizeOptions::default());
        asm.push(&attr(Level::Attachment, atype::BYTE, aname::ATTACHDATA, b"data"))?;
        let date = [0xd4, 0x07, 1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0];
        asm.push(&attr(Level::Attachment, atype::DATE, aname::ATTACHMODIFYDATE, &date))?;
        let ex = asm.finish();
        assert_eq!(ex.files.len(), 1);
        assert!(ex.files[0].name.is_none());
        assert!(ex.files[0].sanitized.is_none());
        assert_eq!(ex.files[0].modified.map(|d| d.year), Some(2004));

        let mut asm = Assembler::new(ParseOptions::default(), SanitizeOptions::default());
        assert!(asm
            .push(&attr(Level::Attachment, atype::DATE, aname::ATTACHMODIFYDATE, &date[..12]))
            .is_err());
        Ok(())
    }

    #[test]
    fn codepage() -> Result<(), TnefError> {
        let mut asm = Assembler::new(ParseOptions::default(), SanitizeOptions::default());
        asm.push(&attr(Level::Message, atype::DWORD, aname::OEMCODEPAGE, &[0xe3, 0x04, 0, 0]))?;
        asm.push(&attr(Level::Attachment, atype::STRING, aname::ATTACHTITLE, b"\xcf\xf0\xe8.txt\0"))?;
        let ex = asm.finish();
        assert_eq!(ex.files[0].name.as_deref(), Some("При.txt"));
        Ok(())
    }

    #[test]
    fn bodies() -> Result<(), TnefError> {
        let mut rtf = Vec::new();
        for v in [12u32 + 4, 4, crate::crtf::MAGIC_UNCOMPRESSED, 0] {
            rtf.extend_from_slice(&v.to_le_bytes());
        }
        rtf.extend_from_slice(b"{rt}");
        let props = mapi_list(&[
            (0x0102, 0x1013, b"<p>hi</p>"),
            (0x0102, 0x1009, &rtf),
            (0x001e, 0x1000, b"mapi text"),
        ]);
        let mut asm = Assembler::new(ParseOptions::default(), SanitizeOptions::default());
        asm.push(&attr(Level::Message, atype::BYTE, aname::MAPIPROPS, &props))?;
        let ex = asm.finish();
        assert_eq!(ex.bodies.len(), 3);
        assert_eq!(ex.preferred_body("rht").map(|b| b.data.as_slice()), Some(&b"{rt}"[..]));
        assert_eq!(ex.preferred_body("h").map(|b| b.kind), Some(BodyKind::Html));
        assert_eq!(
            ex.preferred_body("tr").map(|b| b.data.as_slice()),
            Some(&b"mapi text"[..])
        );

        let mut asm = Assembler::new(ParseOptions::default(), SanitizeOptions::default());
        asm.push(&attr(Level::Message, atype::TEXT, aname::BODY, b"attr text\0"))?;
        asm.push(&attr(Level::Message, atype::BYTE, aname::MAPIPROPS, &props))?;
        let ex = asm.finish();
        let texts: Vec<_> = ex.bodies.iter().filter(|b| b.kind == BodyKind::Text).collect();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].data, b"attr text");
        assert!(ex.preferred_body("x").is_none());
        Ok(())
    }
}
