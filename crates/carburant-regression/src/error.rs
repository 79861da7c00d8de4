//! Error types for carburant-regression

use thiserror::Error;

/// Result type for fitting; `RegressionResult` names the fit output
pub type FitResult<T> = std::result::Result<T, RegressionError>;

/// Errors that can occur while fitting a model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegressionError {
    /// No observations to fit
    #[error("No data to fit for vehicle type: {0}")]
    NoData(String),

    /// The fit produced a non-finite coefficient, typically because the
    /// predictors are constant or collinear
    #[error("Invalid fit: intercept={intercept}, kilometrage={distance}, tonnage={tonnage}, R²={r_squared}")]
    InvalidFit {
        intercept: f64,
        distance: f64,
        tonnage: f64,
        r_squared: f64,
    },
}
