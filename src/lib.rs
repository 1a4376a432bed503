use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::result;

use tracing::debug;

pub mod format;
mod utils;

pub use utils::parse_secret_line;

/// Environment variable naming the exported secrets file.
pub const SECRETS_FILE_ENV: &str = "MURMUR_EXPORT_FILE";
/// Where `murmur export` writes when nothing else is configured.
pub const DEFAULT_SECRETS_FILE: &str = "/tmp/secrets.env";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid key '{key}' for {format} format: {reason}")]
    InvalidKey {
        format: &'static str,
        key: String,
        reason: String,
    },
    #[error("invalid value for key '{key}' in properties format: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("unknown output format '{0}' (expected json, dotenv or properties)")]
    UnknownFormat(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = result::Result<T, Error>;

pub type Secrets = HashMap<String, String>;

/// Picks the configured path if there is one, `/tmp/secrets.env` otherwise.
/// Any set value is used as-is, unicode or not.
pub fn secrets_path_or_default(configured: Option<OsString>) -> PathBuf {
    configured
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_FILE))
}

/// Resolves the secrets file from `MURMUR_EXPORT_FILE`, falling back to
/// `/tmp/secrets.env`.
pub fn resolve_secrets_path() -> PathBuf {
    secrets_path_or_default(env::var_os(SECRETS_FILE_ENV))
}

/// Reads `KEY=VALUE` lines into a map. Later lines overwrite earlier ones
/// with the same key. Any read error aborts the whole read.
pub fn read_secrets<R: BufRead>(reader: R) -> Result<Secrets> {
    let mut secrets = Secrets::new();
    for line in reader.lines() {
        let line = line?;
        if let Some((key, value)) = parse_secret_line(&line) {
            secrets.insert(String::from(key), String::from(value));
        }
    }
    Ok(secrets)
}

pub fn read_secrets_file(path: &Path) -> Result<Secrets> {
    let file = fs::File::open(path)?;
    let secrets = read_secrets(BufReader::new(file))?;
    debug!("read {} secrets from {}", secrets.len(), path.display());
    Ok(secrets)
}

/// Serverless-style entry point. `event` and `context` belong to the
/// invoking runtime and are not inspected.
pub fn handler<E, C>(_event: E, _context: &C) -> Result<Secrets> {
    let path = resolve_secrets_path();
    debug!("reading exported secrets from {}", path.display());
    read_secrets_file(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};

    fn read(input: &str) -> Secrets {
        read_secrets(Cursor::new(input)).unwrap()
    }

    #[test]
    fn it_reads_simple_pairs() {
        let secrets = read("A=1\nB=2\n");
        assert_eq!(secrets.len(), 2);
        assert_eq!(secrets["A"], "1");
        assert_eq!(secrets["B"], "2");
    }

    #[test]
    fn it_skips_comments_and_splits_once() {
        let secrets = read("# comment\nA=1\n\nB=2=3\n");
        assert_eq!(secrets.len(), 2);
        assert_eq!(secrets["A"], "1");
        assert_eq!(secrets["B"], "2=3");
    }

    #[test]
    fn last_occurrence_wins() {
        let secrets = read("A=1\nA=2\n");
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets["A"], "2");
    }

    #[test]
    fn empty_input_gives_empty_map() {
        assert!(read("").is_empty());
    }

    #[test]
    fn lines_without_equals_are_ignored() {
        let secrets = read("garbage\nA=1\n   \n#B=2\n");
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets["A"], "1");
    }

    #[test]
    fn it_handles_crlf_and_missing_trailing_newline() {
        let secrets = read("A=1\r\nB=2");
        assert_eq!(secrets["A"], "1");
        assert_eq!(secrets["B"], "2");
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn read_errors_propagate() {
        let err = read_secrets(BufReader::new(FailingReader)).unwrap_err();
        match err {
            Error::Io(e) => assert_eq!(e.kind(), io::ErrorKind::PermissionDenied),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_is_an_io_error() {
        let err = read_secrets(Cursor::new(vec![b'A', b'=', 0xff, b'\n'])).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn path_falls_back_to_default() {
        assert_eq!(secrets_path_or_default(None), PathBuf::from("/tmp/secrets.env"));
        assert_eq!(
            secrets_path_or_default(Some(OsString::from("/run/app.env"))),
            PathBuf::from("/run/app.env")
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_unicode_path_is_kept() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"/tmp/secr\xffets.env");
        let path = secrets_path_or_default(Some(raw.to_os_string()));
        assert_eq!(path.as_os_str(), raw);
        assert_ne!(path, PathBuf::from(DEFAULT_SECRETS_FILE));
    }

    #[test]
    fn whitespace_around_equals_is_kept() {
        let secrets = read("  A = 1  \n");
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets["A "], " 1");
    }
}
