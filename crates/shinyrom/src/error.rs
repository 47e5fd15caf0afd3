use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unrecognized ROM format")]
    UnrecognizedFormat,

    #[error("No patch offset found for game code {code}")]
    UnresolvedOffset { code: String },

    #[error("Offset {offset:#x} is out of bounds (region length {len:#x})")]
    OutOfBoundsOffset { offset: usize, len: usize },

    #[error("Container error: {0}")]
    Container(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    pub(crate) fn container<S: Into<String>>(message: S) -> Self {
        Error::Container(message.into())
    }
}
