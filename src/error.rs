use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("File size exceeds {limit_mb}MB limit")]
    FileTooLarge { limit_mb: u64 },

    #[error("Invalid file type. Accepted types: {accepted}")]
    UnsupportedFileType { accepted: &'static str },

    #[error("Database not initialized. Run 'jobtrack init' first.")]
    NotInitialized,

    #[error("Database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to decode document: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        TrackerError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Errors the user fixes by changing their input, as opposed to store failures.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TrackerError::NotFound { .. }
                | TrackerError::Validation(_)
                | TrackerError::FileTooLarge { .. }
                | TrackerError::UnsupportedFileType { .. }
                | TrackerError::NotInitialized
        )
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
