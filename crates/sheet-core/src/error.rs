//! Error Types

use thiserror::Error;

/// Result type alias for sheet operations
pub type Result<T> = std::result::Result<T, SheetError>;

/// Errors surfaced by the payment sheet
#[derive(Error, Debug)]
pub enum SheetError {
    /// User or caller cancelled the session
    #[error("AbortError: {0}")]
    Aborted(String),

    /// `open` was called while a session was already in flight
    #[error("Sheet is already showing")]
    AlreadyShowing,

    /// Persistence store failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Internal invariant violated (programming defect)
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// Dialog surface misbehaved
    #[error("Dialog error: {0}")]
    Dialog(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl SheetError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, SheetError::Persistence(_) | SheetError::Io(_))
    }

    /// The abort reason, if this is a user abort
    pub fn abort_reason(&self) -> Option<&str> {
        match self {
            SheetError::Aborted(reason) => Some(reason),
            _ => None,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            SheetError::Aborted(reason) => format!("Payment cancelled: {}", reason),
            SheetError::AlreadyShowing => "A payment is already in progress.".into(),
            SheetError::Persistence(_) => "Your details could not be saved.".into(),
            SheetError::Dialog(_) => "The payment sheet could not be displayed.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for SheetError {
    fn from(err: anyhow::Error) -> Self {
        SheetError::Other(err.to_string())
    }
}

/// Persistence store errors
///
/// These never reach the caller of `open`; collectors log and swallow them.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Store could not be opened
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Operation attempted on a closed store
    #[error("Store is closed")]
    Closed,

    /// Stored data could not be decoded
    #[error("Corrupt store: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a step refused to advance
///
/// Invalid input is an expected condition, so this is a value and not an `Err`
/// on the session's outcome path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationFailure {
    /// A required field is empty
    MissingField(String),

    /// The step requires the user to pick something, and only a default is present
    ChoiceRequired(String),

    /// A field is present but unacceptable
    InvalidField { field: String, message: String },
}

impl ValidationFailure {
    /// The field the failure refers to
    pub fn field(&self) -> &str {
        match self {
            ValidationFailure::MissingField(field)
            | ValidationFailure::ChoiceRequired(field)
            | ValidationFailure::InvalidField { field, .. } => field,
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationFailure::MissingField(field) => write!(f, "'{}' is required", field),
            ValidationFailure::ChoiceRequired(field) => write!(f, "please choose a value for '{}'", field),
            ValidationFailure::InvalidField { field, message } => write!(f, "'{}': {}", field, message),
        }
    }
}
