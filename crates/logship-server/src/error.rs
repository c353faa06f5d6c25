use std::fmt;

/// Result type for logship-server operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the server layer
#[derive(Debug)]
pub enum Error {
    /// Database operation failed
    Database(rusqlite::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Report serialization failed
    Json(serde_json::Error),

    /// Owner quota exhausted for this limit type
    QuotaExceeded { retry_after_secs: Option<u64> },

    /// Caller identity does not own the declared target. Rejects the whole
    /// batch; never retried, never partially applied.
    Ownership(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => write!(f, "Database error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::QuotaExceeded { retry_after_secs } => match retry_after_secs {
                Some(secs) => write!(f, "Quota exceeded, retry after {}s", secs),
                None => write!(f, "Quota exceeded"),
            },
            Error::Ownership(msg) => write!(f, "Ownership violation: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::QuotaExceeded { .. } | Error::Ownership(_) => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
