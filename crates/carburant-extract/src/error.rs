//! Row-level extraction errors

use thiserror::Error;

/// Why a data row produced no record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// The vehicle id column is blank or outside the row
    #[error("no vehicle id")]
    MissingVehicleId,

    /// Neither the registration nor the description names a known vehicle
    #[error("'{0}' is not a recognized vehicle")]
    UnrecognizedVehicle(String),
}
