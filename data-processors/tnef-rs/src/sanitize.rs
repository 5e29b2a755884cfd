//! Attachment name sanitization
//!
//! Attachment names come straight from the sender. They are reduced to a
//! relative path which, joined to the output directory, can never leave it
//! (unless absolute paths are explicitly allowed). Unsafe characters are
//! replaced by `%XX` escapes of their UTF-8 bytes.
use std::fmt::{self, Write};
use std::path::PathBuf;
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

/// Characters never allowed in a Windows file name
const WINDOWS_ILLEGAL: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];
/// Characters which are troublesome in unix shells
const SHELL_UNSAVORY: &[char] = &[' ', '\'', '"', '`', '[', ']', '(', ')', '{', '}', ';'];

#[derive(Debug, Clone, Default)]
/// Sanitizer policy
pub struct SanitizeOptions {
    /// Keep the directory part of Windows style embedded paths
    pub use_paths: bool,
    /// Keep absolute embedded paths as absolute (dangerous)
    pub allow_absolute: bool,
    /// Also escape non ASCII characters and shell metacharacters
    pub unix_friendly: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A sanitized attachment path
pub struct SanitizedPath {
    /// Directory part, `/` separated, without trailing separator
    pub dir: Option<String>,
    /// File name
    pub base: String,
    /// Whether a directory part was discarded
    pub path_stripped: bool,
}

impl SanitizedPath {
    /// The path relative to the output directory
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(self.to_string())
    }
}

impl fmt::Display for SanitizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dir {
            Some(dir) if dir == "/" => write!(f, "/{}", self.base),
            Some(dir) => write!(f, "{}/{}", dir, self.base),
            None => f.write_str(&self.base),
        }
    }
}

/// Sanitizes an untrusted attachment name
///
/// Returns None if nothing usable is left, in which case the caller picks a
/// default name
pub fn sanitize_name(name: &str, opts: &SanitizeOptions) -> Option<SanitizedPath> {
    let (dir, base, path_stripped) = if opts.use_paths && is_windows_path(name) {
        // Guaranteed to contain a backslash
        let split = name.rfind('\\').unwrap_or(0);
        let dir = name[..=split].replace('\\', "/");
        (Some(dir), &name[split + 1..], false)
    } else if opts.use_paths {
        (None, name, false)
    } else {
        let base = name
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .last()
            .unwrap_or("");
        (None, base, base.len() != name.len())
    };
    if path_stripped {
        debug!("Dropped the directory part of {name:?}");
    }

    let base = sanitize_segment(base, opts);
    if base.is_empty() {
        debug!("Nothing left of attachment name {name:?}");
        return None;
    }
    let dir = dir.and_then(|d| sanitize_dir(&d, name, opts));
    Some(SanitizedPath {
        dir,
        base,
        path_stripped,
    })
}

fn sanitize_dir(dir: &str, name: &str, opts: &SanitizeOptions) -> Option<String> {
    let absolute = dir.starts_with('/');
    if absolute && !opts.allow_absolute {
        info!("Stripping leading separators from the path of {name:?}");
    }
    let joined = dir
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| sanitize_segment(s, opts))
        .collect::<Vec<_>>()
        .join("/");
    match (absolute && opts.allow_absolute, joined.is_empty()) {
        (true, true) => Some("/".to_string()),
        (true, false) => Some(format!("/{joined}")),
        (false, true) => None,
        (false, false) => Some(joined),
    }
}

/// A name is considered a Windows path if it has a backslash which is not the
/// last character and nothing that could not appear in a Windows path
fn is_windows_path(name: &str) -> bool {
    let inner_backslash = name
        .char_indices()
        .any(|(i, c)| c == '\\' && i + 1 < name.len());
    inner_backslash
        && !name.chars().any(|c| {
            c.is_control() || (c != '\\' && WINDOWS_ILLEGAL.contains(&c))
        })
}

fn is_upper_hex(c: char) -> bool {
    c.is_ascii_digit() || ('A'..='F').contains(&c)
}

/// Escapes a single path component
fn sanitize_segment(s: &str, opts: &SanitizeOptions) -> String {
    if s == "." || s == ".." {
        return "%2E".repeat(s.len());
    }
    let mut out = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        let escape = if c == '%' {
            // An existing escape is left alone
            !(chars.get(i + 1).copied().is_some_and(is_upper_hex)
                && chars.get(i + 2).copied().is_some_and(is_upper_hex))
        } else {
            c.is_control()
                || WINDOWS_ILLEGAL.contains(&c)
                || (opts.unix_friendly && (!c.is_ascii() || SHELL_UNSAVORY.contains(&c)))
        };
        if escape {
            let mut utf8 = [0u8; 4];
            for b in c.encode_utf8(&mut utf8).bytes() {
                // Writing to a String cannot fail
                let _ = write!(out, "%{b:02X}");
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(name: &str, opts: &SanitizeOptions) -> Option<String> {
        sanitize_name(name, opts).map(|p| p.to_string())
    }

    const TRICKY: &[&str] = &[
        "foo.txt",
        "..",
        ".",
        "../../etc/passwd",
        "/etc/passwd",
        "..\\..\\windows\\win.ini",
        "C:\\Documents and Settings\\a.doc",
        "\\\\server\\share\\x",
        "a\\",
        "100%",
        "%41%4",
        "%2e%2E",
        "tab\there",
        "new\nline\x7f",
        "smile \u{1f600} (copy) [1];'x'`y`{z}",
        "résumé.pdf",
        "a/b\\c/d",
        "what?<>|*\":",
        "",
        "///",
        "\u{85}next",
    ];

    #[test]
    fn basename_only() {
        let opts = SanitizeOptions::default();
        let p = sanitize_name("C:\\temp\\report.doc", &opts).unwrap();
        assert_eq!(p.dir, None);
        assert_eq!(p.base, "report.doc");
        assert!(p.path_stripped);
        let p = sanitize_name("foo.txt", &opts).unwrap();
        assert_eq!(p.base, "foo.txt");
        assert!(!p.path_stripped);
        assert_eq!(sanitize("dir/sub/", &opts).as_deref(), Some("sub"));
        assert_eq!(sanitize("../../etc/passwd", &opts).as_deref(), Some("passwd"));
        assert_eq!(sanitize("..", &opts).as_deref(), Some("%2E%2E"));
        assert_eq!(sanitize("", &opts), None);
        assert_eq!(sanitize("\\/", &opts), None);
    }

    #[test]
    fn escaping() {
        let opts = SanitizeOptions::default();
        assert_eq!(sanitize("a:b*c?.txt", &opts).as_deref(), Some("a%3Ab%2Ac%3F.txt"));
        assert_eq!(sanitize("x\x01y", &opts).as_deref(), Some("x%01y"));
        assert_eq!(sanitize("\u{85}", &opts).as_deref(), Some("%C2%85"));
        assert_eq!(sanitize("100%", &opts).as_deref(), Some("100%25"));
        assert_eq!(sanitize("%41%4g", &opts).as_deref(), Some("%41%254g"));
        assert_eq!(sanitize("%2e", &opts).as_deref(), Some("%252e"));
        assert_eq!(sanitize("my file (1).doc", &opts).as_deref(), Some("my file (1).doc"));
        assert_eq!(sanitize("résumé", &opts).as_deref(), Some("résumé"));

        let unix = SanitizeOptions {
            unix_friendly: true,
            ..Default::default()
        };
        assert_eq!(
            sanitize("my file (1).doc", &unix).as_deref(),
            Some("my%20file%20%281%29.doc")
        );
        assert_eq!(sanitize("résumé", &unix).as_deref(), Some("r%C3%A9sum%C3%A9"));
        assert_eq!(sanitize("a;b`c'd", &unix).as_deref(), Some("a%3Bb%60c%27d"));
    }

    #[test]
    fn windows_paths() {
        let opts = SanitizeOptions {
            use_paths: true,
            ..Default::default()
        };
        let p = sanitize_name("docs\\2024\\plan.txt", &opts).unwrap();
        assert_eq!(p.dir.as_deref(), Some("docs/2024"));
        assert_eq!(p.base, "plan.txt");
        assert_eq!(p.to_path(), PathBuf::from("docs/2024/plan.txt"));
        // Leading separators stripped
        assert_eq!(
            sanitize("\\temp\\x.txt", &opts).as_deref(),
            Some("temp/x.txt")
        );
        assert_eq!(sanitize("\\x.txt", &opts).as_deref(), Some("x.txt"));
        assert_eq!(
            sanitize("\\\\server\\\\share\\x", &opts).as_deref(),
            Some("server/share/x")
        );
        // Not a Windows path: drive letter, mixed separators, trailing backslash
        assert_eq!(sanitize("C:\\x.txt", &opts).as_deref(), Some("C%3A%5Cx.txt"));
        assert_eq!(sanitize("a/b\\c", &opts).as_deref(), Some("a%2Fb%5Cc"));
        assert_eq!(sanitize("name\\", &opts).as_deref(), Some("name%5C"));
        // Traversal
        assert_eq!(
            sanitize("..\\..\\evil.sh", &opts).as_deref(),
            Some("%2E%2E/%2E%2E/evil.sh")
        );
        assert_eq!(sanitize("a\\.\\..", &opts).as_deref(), Some("a/%2E/%2E%2E"));
        assert_eq!(sanitize("dir\\", &opts).as_deref(), Some("dir%5C"));
        assert_eq!(sanitize("dir\\sub\\", &opts), None);

        let abs = SanitizeOptions {
            use_paths: true,
            allow_absolute: true,
            ..Default::default()
        };
        assert_eq!(sanitize("\\temp\\x.txt", &abs).as_deref(), Some("/temp/x.txt"));
        assert_eq!(sanitize("\\x.txt", &abs).as_deref(), Some("/x.txt"));
    }

    #[test]
    fn idempotence() {
        for opts in [
            SanitizeOptions::default(),
            SanitizeOptions {
                unix_friendly: true,
                ..Default::default()
            },
        ] {
            for name in TRICKY {
                if let Some(once) = sanitize(name, &opts) {
                    assert_eq!(
                        sanitize(&once, &opts).as_deref(),
                        Some(once.as_str()),
                        "{name:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn confinement() {
        for opts in [
            SanitizeOptions::default(),
            SanitizeOptions {
                use_paths: true,
                ..Default::default()
            },
        ] {
            for name in TRICKY
                .iter()
                .copied()
                .chain(["../x", "/x", "\\..\\x", "..\\/x", "a/../../b", "\\\\..\\.."])
            {
                let Some(p) = sanitize(name, &opts) else {
                    continue;
                };
                assert!(!p.starts_with('/'), "{name:?} -> {p:?}");
                assert!(!p.starts_with('\\'), "{name:?} -> {p:?}");
                assert!(
                    !p.split('/').any(|seg| seg == ".." || seg == "."),
                    "{name:?} -> {p:?}"
                );
                assert!(!p.chars().any(|c| c.is_control()), "{name:?} -> {p:?}");
            }
        }
    }
}
