use std::path::PathBuf;

use thiserror::Error;

/// Stable caller-visible category shared by every policy denial.
pub const ACCESS_DENIED_CODE: &str = "access_denied";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("io error during {op} ({path}): {source}")]
    IoPath {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    // Denials render identically and echo only the caller's input.
    #[error("path is not accessible: {requested}")]
    OutsideAllowedPaths { requested: String },

    #[error("path is not accessible: {requested}")]
    ExcludedPath { requested: String },

    #[error("path is not accessible: {requested}")]
    HiddenPathAccessDenied { requested: String },

    #[error("path is not accessible: {requested}")]
    FileNotFound { requested: String },

    #[error("path is not a regular file: {0}")]
    NotARegularFile(PathBuf),

    #[error("path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("invalid utf-8 in file: {0}")]
    InvalidEncoding(PathBuf),

    #[error("unreadable document {path}: {reason}")]
    UnreadableDocument { path: PathBuf, reason: String },

    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("time limit of {limit_ms} ms exceeded after {elapsed_ms} ms")]
    TimeLimitExceeded { limit_ms: u64, elapsed_ms: u64 },

    #[error("invalid page parameters: {0}")]
    InvalidPageParameters(String),

    #[error("file is too large ({size_bytes} bytes; max {max_bytes} bytes): {path}")]
    FileTooLarge {
        path: PathBuf,
        size_bytes: u64,
        max_bytes: u64,
    },

    #[error("input is too large ({size_bytes} bytes; max {max_bytes} bytes)")]
    InputTooLarge { size_bytes: u64, max_bytes: u64 },
}

/// Precise error kind, for logging and tests. Callers should key on [`Error::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    Io,
    Json,
    InvalidPolicy,
    InvalidPath,
    OutsideAllowedPaths,
    ExcludedPath,
    HiddenPathAccessDenied,
    FileNotFound,
    NotARegularFile,
    NotADirectory,
    InvalidEncoding,
    UnreadableDocument,
    InvalidPattern,
    TimeLimitExceeded,
    InvalidPageParameters,
    FileTooLarge,
    InputTooLarge,
}

impl Error {
    pub fn io_path(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoPath {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, err: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::IoPath { .. } => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Json,
            Self::InvalidPolicy(_) => ErrorKind::InvalidPolicy,
            Self::InvalidPath(_) => ErrorKind::InvalidPath,
            Self::OutsideAllowedPaths { .. } => ErrorKind::OutsideAllowedPaths,
            Self::ExcludedPath { .. } => ErrorKind::ExcludedPath,
            Self::HiddenPathAccessDenied { .. } => ErrorKind::HiddenPathAccessDenied,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::NotARegularFile(_) => ErrorKind::NotARegularFile,
            Self::NotADirectory(_) => ErrorKind::NotADirectory,
            Self::InvalidEncoding(_) => ErrorKind::InvalidEncoding,
            Self::UnreadableDocument { .. } => ErrorKind::UnreadableDocument,
            Self::InvalidPattern { .. } => ErrorKind::InvalidPattern,
            Self::TimeLimitExceeded { .. } => ErrorKind::TimeLimitExceeded,
            Self::InvalidPageParameters(_) => ErrorKind::InvalidPageParameters,
            Self::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            Self::InputTooLarge { .. } => ErrorKind::InputTooLarge,
        }
    }

    /// `true` for every error that renders as the unified access denial.
    pub fn is_access_denial(&self) -> bool {
        matches!(
            self,
            Self::OutsideAllowedPaths { .. }
                | Self::ExcludedPath { .. }
                | Self::HiddenPathAccessDenied { .. }
                | Self::FileNotFound { .. }
        )
    }

    /// Stable, machine-readable error code.
    pub fn code(&self) -> &'static str {
        if self.is_access_denial() {
            return ACCESS_DENIED_CODE;
        }
        match self {
            Self::Io(_) | Self::IoPath { .. } => "io",
            Self::Json(_) => "json",
            Self::InvalidPolicy(_) => "invalid_policy",
            Self::InvalidPath(_) => "invalid_path",
            Self::NotARegularFile(_) => "not_a_regular_file",
            Self::NotADirectory(_) => "not_a_directory",
            Self::InvalidEncoding(_) => "invalid_encoding",
            Self::UnreadableDocument { .. } => "unreadable_document",
            Self::InvalidPattern { .. } => "invalid_pattern",
            Self::TimeLimitExceeded { .. } => "time_limit_exceeded",
            Self::InvalidPageParameters(_) => "invalid_page_parameters",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::InputTooLarge { .. } => "input_too_large",
            Self::OutsideAllowedPaths { .. }
            | Self::ExcludedPath { .. }
            | Self::HiddenPathAccessDenied { .. }
            | Self::FileNotFound { .. } => ACCESS_DENIED_CODE,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denials_share_code_and_message() {
        let requested = "secret/b.txt".to_string();
        let errors = [
            Error::OutsideAllowedPaths {
                requested: requested.clone(),
            },
            Error::ExcludedPath {
                requested: requested.clone(),
            },
            Error::HiddenPathAccessDenied {
                requested: requested.clone(),
            },
            Error::FileNotFound {
                requested: requested.clone(),
            },
        ];
        let first = errors[0].to_string();
        for err in &errors {
            assert_eq!(err.code(), ACCESS_DENIED_CODE);
            assert_eq!(err.to_string(), first);
            assert!(err.is_access_denial());
        }
        assert_eq!(errors[1].kind(), ErrorKind::ExcludedPath);
    }

    #[test]
    fn non_denials_keep_their_own_code() {
        let err = Error::TimeLimitExceeded {
            limit_ms: 10,
            elapsed_ms: 11,
        };
        assert!(!err.is_access_denial());
        assert_eq!(err.code(), "time_limit_exceeded");
        assert_eq!(
            Error::InvalidPageParameters("page_size must be > 0".to_string()).code(),
            "invalid_page_parameters"
        );
    }
}
