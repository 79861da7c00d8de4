//! # carburant-xlsx
//!
//! XLSX (Office Open XML) reader for carburant. Decodes worksheets into
//! [`carburant_core::SheetData`]: values, cached formula results, number
//! format date flags and merged regions.

pub mod error;
pub mod reader;

mod styles;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
