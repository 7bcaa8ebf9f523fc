// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing a single stat file.
///
/// The scanner never surfaces these: a file that fails to parse is dropped
/// from the batch and the scan continues.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Stat file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading stat file: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required field '{field}' in {path}")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("Invalid value for '{field}' in {path}: {value}")]
    InvalidNumber {
        path: PathBuf,
        field: &'static str,
        value: String,
    },

    #[error("Cannot determine a timestamp for {path}")]
    NoTimestamp { path: PathBuf },
}

impl ParseError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors returned by a directory scan.
///
/// Only the invalid-directory case is terminal; everything else degrades to
/// using less or older data.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Stats directory not found or not a directory: {path}")]
    InvalidDirectory { path: PathBuf },
}

/// Errors raised while reading or writing the persisted run cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied accessing cache file: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error accessing cache {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Cannot serialize cache for {path}: {message}")]
    Serialize { path: PathBuf, message: String },
}

impl CacheError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors raised by the settings store.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error accessing settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot serialize settings for {path}: {message}")]
    Serialize { path: PathBuf, message: String },

    #[error("Home directory not found")]
    HomeDirNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::NotFound {
            path: PathBuf::from("/stats/run - Challenge - x.csv"),
        };
        assert!(err.to_string().contains("/stats/run - Challenge - x.csv"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_parse_error_io_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ParseError::io("/test/path", io_err);
        assert!(matches!(err, ParseError::NotFound { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = ParseError::io("/test/path", io_err);
        assert!(matches!(err, ParseError::PermissionDenied { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout");
        let err = ParseError::io("/test/path", io_err);
        assert!(matches!(err, ParseError::Io { .. }));
    }

    #[test]
    fn test_missing_field_names_the_field() {
        let err = ParseError::MissingField {
            path: PathBuf::from("/a.csv"),
            field: "Score",
        };
        assert!(err.to_string().contains("'Score'"));
    }

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::InvalidDirectory {
            path: PathBuf::from("/stats"),
        };
        assert!(err.to_string().contains("/stats"));
    }

    #[test]
    fn test_cache_error_io_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(
            CacheError::io("/cache/history.json", io_err),
            CacheError::NotFound { .. }
        ));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            CacheError::io("/cache/history.json", io_err),
            CacheError::PermissionDenied { .. }
        ));
    }
}
