//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Formula evaluation error (including spreadsheet error results
    /// such as `#DIV/0!`)
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: &'static str,
        actual: usize,
    },

    /// Circular reference
    #[error("Circular reference detected")]
    CircularReference,

    /// Reference to another sheet or an invalid cell
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
}

impl From<FormulaError> for carburant_core::Error {
    fn from(e: FormulaError) -> Self {
        carburant_core::Error::Formula(e.to_string())
    }
}
