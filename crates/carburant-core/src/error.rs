//! Error types for carburant-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a sheet into a grid
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// The byte source was empty or could not be read as a workbook
    #[error("Empty or unreadable input")]
    EmptyInput,

    /// The byte source is not a supported spreadsheet container
    #[error("Invalid spreadsheet format: {0}")]
    InvalidFormat(String),

    /// A formula could not be evaluated
    #[error("Formula error: {0}")]
    Formula(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
