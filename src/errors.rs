use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, UtilsError>;

#[derive(Error, Debug)]
pub enum UtilsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to open {uri}: {source}")]
    OpenFailure {
        uri: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read from {uri}: {reason}")]
    ReadFailure { uri: String, reason: String },
    #[error("Failed to seek in {uri}: {reason}")]
    SeekFailure { uri: String, reason: String },
    #[error("Reader is not open")]
    NotOpen,
    #[error("{context}: {} ({source})", .path.display())]
    Fs {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Path error: {0}")]
    Path(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Parsing error: {0}")]
    Parse(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UtilsError {
    /// Wrap an I/O error with the operation and path it failed on
    pub(crate) fn fs(
        context: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Fs {
            context,
            path,
            source,
        }
    }
}

impl From<serde_json::Error> for UtilsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<walkdir::Error> for UtilsError {
    fn from(e: walkdir::Error) -> Self {
        match e.path() {
            Some(path) => Self::Path(format!(
                "Failed to walk {}: {}",
                path.display(),
                e
            )),
            None => Self::Path(e.to_string()),
        }
    }
}

impl From<std::string::FromUtf16Error> for UtilsError {
    fn from(e: std::string::FromUtf16Error) -> Self {
        Self::Encoding(e.to_string())
    }
}

impl From<log::SetLoggerError> for UtilsError {
    fn from(value: log::SetLoggerError) -> Self {
        Self::Other(anyhow::anyhow!(value.to_string()))
    }
}
