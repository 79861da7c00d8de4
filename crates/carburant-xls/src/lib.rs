//! # carburant-xls
//!
//! XLS (BIFF8) reader for carburant.
//!
//! Handles the legacy Excel binary format (.xls): the `Workbook` stream of
//! a Compound File Binary container. Formulas are read through their cached
//! results only.

pub mod biff;
pub mod error;
pub mod reader;

mod formats;

pub use error::{XlsError, XlsResult};
pub use reader::XlsReader;
