use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error type for the chunk viewer and its data gateway
#[derive(Debug)]
pub enum ViewerError {
    /// File I/O error while touching `path`
    Io {
        /// File or directory being accessed
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },
    /// JSON parse error in `path`
    Json {
        /// File being parsed
        path: PathBuf,
        /// Underlying serde error
        source: serde_json::Error,
    },
    /// Unsupported file format (non-JSON config)
    UnsupportedFormat(String),
    /// A config value is out of range
    InvalidConfig(String),
    /// The requested save directory does not exist
    SaveNotFound(String),
    /// A chunk reference escapes its save directory or is otherwise malformed
    InvalidChunkRef(String),
    /// Copying a chunk into the backup directory failed; nothing was deleted
    Backup {
        /// Backup destination that could not be written
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },
    /// A deletion is already in flight for the current save
    DeleteInProgress,
    /// Confirm was called without an open confirmation step
    NotConfirming,
}

impl ViewerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ViewerError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ViewerError::Json { path, source } => {
                write!(f, "JSON parse error in {}: {}", path.display(), source)
            }
            ViewerError::UnsupportedFormat(ext) => write!(f, "Unsupported file format: {}", ext),
            ViewerError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            ViewerError::SaveNotFound(name) => write!(f, "Save '{}' not found", name),
            ViewerError::InvalidChunkRef(r) => write!(f, "Invalid chunk reference '{}'", r),
            ViewerError::Backup { path, source } => {
                write!(f, "Backup to {} failed: {}", path.display(), source)
            }
            ViewerError::DeleteInProgress => write!(f, "A deletion is already in progress"),
            ViewerError::NotConfirming => write!(f, "No deletion is awaiting confirmation"),
        }
    }
}

impl error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ViewerError::Io { source, .. } | ViewerError::Backup { source, .. } => Some(source),
            ViewerError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}
