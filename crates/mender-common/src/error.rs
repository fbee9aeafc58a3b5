use thiserror::Error;

/// Errors raised by a DOM driver implementation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DriverError {
    #[error("Driver not ready")]
    NotReady,

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// The element handle no longer refers to an attached node.
    #[error("Stale element handle: {0}")]
    StaleElement(u32),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Driver error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for DriverError {
    fn from(e: serde_json::Error) -> Self {
        DriverError::Script(e.to_string())
    }
}

/// Errors raised by a pattern store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Pattern store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pattern store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Pattern store unavailable: {0}")]
    Unavailable(String),
}

/// Malformed caller input.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Unknown action kind '{0}' (expected click, fill, select or check)")]
    UnknownActionKind(String),

    #[error("Unknown element type '{0}' (expected button, input, link or any)")]
    UnknownElementType(String),
}
