//! Error types for the carburant facade

use thiserror::Error;

use crate::upload::UploadToken;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while opening a workbook or serving an upload
#[derive(Debug, Error)]
pub enum Error {
    /// Structural errors: missing sheet, or empty or unreadable input
    #[error(transparent)]
    Core(#[from] carburant_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Xlsx(carburant_xlsx::XlsxError),

    #[cfg(feature = "xls")]
    #[error(transparent)]
    Xls(carburant_xls::XlsError),

    /// No upload is stored under this token
    #[error("Unknown upload: {0}")]
    UnknownUpload(UploadToken),
}

impl Error {
    /// The requested sheet does not exist
    pub fn is_sheet_not_found(&self) -> bool {
        matches!(self, Error::Core(carburant_core::Error::SheetNotFound(_)))
    }
}

impl From<carburant_xlsx::XlsxError> for Error {
    fn from(e: carburant_xlsx::XlsxError) -> Self {
        use carburant_xlsx::XlsxError;
        match e {
            XlsxError::SheetNotFound(name) => carburant_core::Error::SheetNotFound(name).into(),
            XlsxError::Zip(e) => carburant_core::Error::InvalidFormat(e.to_string()).into(),
            XlsxError::Core(e) => Error::Core(e),
            other => Error::Xlsx(other),
        }
    }
}

#[cfg(feature = "xls")]
impl From<carburant_xls::XlsError> for Error {
    fn from(e: carburant_xls::XlsError) -> Self {
        use carburant_xls::XlsError;
        match e {
            XlsError::SheetNotFound(name) => carburant_core::Error::SheetNotFound(name).into(),
            XlsError::Core(e) => Error::Core(e),
            other => Error::Xls(other),
        }
    }
}
