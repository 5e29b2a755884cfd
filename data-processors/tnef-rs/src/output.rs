//! Attachment writer
//!
//! Files are staged in a temporary file next to their destination and only
//! moved into place once fully written
use crate::TnefError;
use crate::assemble::Body;
use crate::sanitize::{SanitizeOptions, SanitizedPath, sanitize_name};
use ctxutils::io::{LimitedWriter, is_write_limit_error};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

/// Name used for attachments without a usable name
pub const DEFAULT_NAME: &str = "tnef-tmp";

#[derive(Debug, Clone)]
/// Writer policy
pub struct WriteOptions {
    /// Replace existing files
    pub overwrite: bool,
    /// Pick `name.N` instead of failing when the target exists
    pub number_backups: bool,
    /// Do not write anything, only resolve the target paths
    pub list_only: bool,
    /// Maximum number of bytes written in total
    pub max_processed_size: u64,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            number_backups: false,
            list_only: false,
            max_processed_size: u64::MAX,
        }
    }
}

/// Writes attachments and bodies under an output directory
pub struct FileWriter {
    root: PathBuf,
    opts: WriteOptions,
    written: u64,
}

/// Returns the first `path.N` (N >= 1) which does not exist
fn find_free_number(path: &Path) -> PathBuf {
    let mut counter = 1u64;
    loop {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(format!(".{counter}"));
        let candidate = PathBuf::from(candidate);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

impl FileWriter {
    /// Creates a writer rooted at `root`
    pub fn new<P: Into<PathBuf>>(root: P, opts: WriteOptions) -> Self {
        Self {
            root: root.into(),
            opts,
            written: 0,
        }
    }

    /// Total bytes written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Computes the destination of a file, applying the conflict policy
    pub fn target_path(&self, rel: Option<&SanitizedPath>) -> Result<PathBuf, TnefError> {
        let path = match rel {
            Some(rel) => self.root.join(rel.to_path()),
            None => {
                let path = self.root.join(DEFAULT_NAME);
                if path.exists() {
                    find_free_number(&path)
                } else {
                    path
                }
            }
        };
        if self.opts.list_only || self.opts.overwrite || !path.exists() {
            Ok(path)
        } else if self.opts.number_backups {
            let renamed = find_free_number(&path);
            debug!("Renaming {} to {}", path.display(), renamed.display());
            Ok(renamed)
        } else {
            Err(TnefError::FilesystemConflict(path))
        }
    }

    /// Writes `data` to its destination and returns the final path
    ///
    /// In list mode nothing is written
    pub fn write(&mut self, rel: Option<&SanitizedPath>, data: &[u8]) -> Result<PathBuf, TnefError> {
        let path = self.target_path(rel)?;
        if self.opts.list_only {
            return Ok(path);
        }
        let available = self.opts.max_processed_size.saturating_sub(self.written);
        if data.len() as u64 > available {
            return Err(TnefError::ResourceLimit {
                what: "output",
                requested: self.written.saturating_add(data.len() as u64),
                limit: self.opts.max_processed_size,
            });
        }
        let parent = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent)?;

        let mut writer = LimitedWriter::new(NamedTempFile::new_in(parent)?, available);
        writer.write_all(data).map_err(|e| {
            if is_write_limit_error(&e) {
                TnefError::ResourceLimit {
                    what: "output",
                    requested: self.written.saturating_add(data.len() as u64),
                    limit: self.opts.max_processed_size,
                }
            } else {
                TnefError::IO(e)
            }
        })?;
        writer.flush()?;
        let tmp = writer.into_inner();
        let persisted = if self.opts.overwrite {
            tmp.persist(&path)
        } else {
            tmp.persist_noclobber(&path)
        };
        if let Err(e) = persisted {
            return Err(if e.error.kind() == io::ErrorKind::AlreadyExists {
                TnefError::FilesystemConflict(path)
            } else {
                TnefError::IO(e.error)
            });
        }
        self.written += data.len() as u64;
        info!("Wrote {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }

    /// Writes a message body as `<name>.<ext>`
    pub fn write_body(&mut self, name: &str, body: &Body) -> Result<PathBuf, TnefError> {
        let fname = format!("{name}.{}", body.kind.extension());
        let rel = sanitize_name(&fname, &SanitizeOptions::default());
        self.write(rel.as_ref(), &body.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::BodyKind;

    fn rel(name: &str) -> Option<SanitizedPath> {
        sanitize_name(
            name,
            &SanitizeOptions {
                use_paths: true,
                ..Default::default()
            },
        )
    }

    #[test]
    fn write_and_conflicts() -> Result<(), TnefError> {
        let dir = tempfile::tempdir()?;
        let mut w = FileWriter::new(dir.path(), WriteOptions::default());
        let p = w.write(rel("a.txt").as_ref(), b"one")?;
        assert_eq!(p, dir.path().join("a.txt"));
        assert_eq!(std::fs::read(&p)?, b"one");
        assert!(matches!(
            w.write(rel("a.txt").as_ref(), b"two"),
            Err(TnefError::FilesystemConflict(_))
        ));
        assert_eq!(std::fs::read(&p)?, b"one");

        let mut w = FileWriter::new(
            dir.path(),
            WriteOptions {
                number_backups: true,
                ..Default::default()
            },
        );
        assert_eq!(w.write(rel("a.txt").as_ref(), b"two")?, dir.path().join("a.txt.1"));
        assert_eq!(w.write(rel("a.txt").as_ref(), b"three")?, dir.path().join("a.txt.2"));

        let mut w = FileWriter::new(
            dir.path(),
            WriteOptions {
                overwrite: true,
                ..Default::default()
            },
        );
        w.write(rel("a.txt").as_ref(), b"four")?;
        assert_eq!(std::fs::read(dir.path().join("a.txt"))?, b"four");
        assert_eq!(w.written(), 4);
        Ok(())
    }

    #[test]
    fn default_names_and_dirs() -> Result<(), TnefError> {
        let dir = tempfile::tempdir()?;
        let mut w = FileWriter::new(dir.path(), WriteOptions::default());
        assert_eq!(w.write(None, b"x")?, dir.path().join("tnef-tmp"));
        assert_eq!(w.write(None, b"y")?, dir.path().join("tnef-tmp.1"));
        let p = w.write(rel("..\\sub\\dir\\f.bin").as_ref(), b"z")?;
        assert_eq!(p, dir.path().join("%2E%2E/sub/dir/f.bin"));
        assert!(p.starts_with(dir.path()));
        assert_eq!(std::fs::read(p)?, b"z");
        Ok(())
    }

    #[test]
    fn list_only_and_limits() -> Result<(), TnefError> {
        let dir = tempfile::tempdir()?;
        let mut w = FileWriter::new(
            dir.path(),
            WriteOptions {
                list_only: true,
                ..Default::default()
            },
        );
        let p = w.write(rel("b.txt").as_ref(), b"data")?;
        assert!(!p.exists());

        let mut w = FileWriter::new(
            dir.path(),
            WriteOptions {
                max_processed_size: 5,
                ..Default::default()
            },
        );
        w.write(rel("c.txt").as_ref(), b"abc")?;
        assert!(matches!(
            w.write(rel("d.txt").as_ref(), b"abc"),
            Err(TnefError::ResourceLimit { .. })
        ));
        assert!(!dir.path().join("d.txt").exists());

        let body = Body {
            kind: BodyKind::Html,
            data: b"<p>".to_vec(),
        };
        let mut w = FileWriter::new(dir.path(), WriteOptions::default());
        assert_eq!(w.write_body("message", &body)?, dir.path().join("message.html"));
        Ok(())
    }
}
