//! # carburant
//!
//! Reads fleet fuel-consumption workbooks (XLSX, XLS), extracts one record
//! per vehicle and month, aggregates them, and fits a consumption model over
//! distance and tonnage.
//!
//! ## Features
//!
//! - Content-based format detection, no file extension needed
//! - Merged month cells carried down their block, formulas resolved from
//!   cached values or evaluated
//! - Header classification tolerant of French and English column names
//! - Monthly summaries, per-vehicle performance and OLS regression
//! - [`UploadStore`] for serving several uploads at once
//!
//! ## Example
//!
//! ```rust,no_run
//! use carburant::prelude::*;
//!
//! let workbook = Workbook::open("consommation_2024.xlsx")?;
//! for name in workbook.sheet_names() {
//!     let extraction = workbook.extract_sheet(name, &ExtractOptions::default())?;
//!     let model = fit_or_default(&extraction.records, name, &RegressionOptions::default());
//!     println!("{}: {}", name, model.regression_equation);
//! }
//! # Ok::<(), carburant::Error>(())
//! ```

pub mod error;
pub mod format;
pub mod prelude;
pub mod upload;
pub mod workbook;

pub use error::{Error, Result};
pub use format::SpreadsheetFormat;
pub use upload::{UploadStore, UploadStoreOptions, UploadToken};
pub use workbook::{extract_sheet, sheet_names, Workbook};

// Re-export the pipeline crates
pub use carburant_extract as extract;
pub use carburant_regression as regression;

pub use carburant_core::{Cell, CellValue, Grid, SheetData};
pub use carburant_extract::{
    filter_for_regression, merge_records, month_number, monthly_summary, vehicle_performance,
    ColumnRoles, ExtractOptions, Extraction, MergeMode, MonthlySummary, MonthlyTotals, RowIssue,
    VehiclePerformance, VehicleRecord, VehicleType,
};
pub use carburant_regression::{
    fit, fit_by_type, fit_or_default, FitDiagnostics, RegressionError, RegressionOptions,
    RegressionResult,
};
