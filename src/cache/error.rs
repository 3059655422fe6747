use std::fmt;
use std::path::PathBuf;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A filesystem call on `path` failed.
    Io { path: PathBuf, message: String },
    /// The OS reports no local application data directory.
    NoLocalDataDirectory,
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io { path, message } => write!(f, "{}: {message}", path.display()),
            CacheError::NoLocalDataDirectory => {
                write!(f, "No local application data directory is available")
            }
        }
    }
}

impl std::error::Error for CacheError {}
