use thiserror::Error;

/// Failure conditions surfaced by tracker operations.
///
/// Every operation is isolated: none of these is fatal to the process and
/// none is retried.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// A required identifier or value was absent or blank.
    #[error("{0} is required")]
    MissingParameter(&'static str),

    /// A referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A value was present but unusable. The message is meant for end users.
    #[error("{0}")]
    InvalidInput(String),

    /// Any lookup or write failure in the storage layer.
    #[error("storage failure: {0:#}")]
    StorageFailure(#[from] anyhow::Error),
}

impl TrackerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Reject absent or whitespace-only identifiers, returning the trimmed value.
pub fn require_param<'a>(value: Option<&'a str>, name: &'static str) -> TrackerResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(TrackerError::MissingParameter(name)),
    }
}
