//! # carburant-extract
//!
//! Turns a resolved sheet [`Grid`](carburant_core::Grid) into vehicle fuel
//! records:
//! - [`classify_columns`] - assigns metric roles to header columns
//! - [`extract`] / [`extract_grid`] - reads data rows into [`VehicleRecord`]s
//!   and running [`MonthlyTotals`]
//! - [`monthly_summary`], [`vehicle_performance`] - aggregates over a record set
//! - [`merge_records`] - combines a fresh extraction with stored records
//!
//! ## Example
//!
//! ```rust
//! use carburant_core::{Cell, CellValue, Grid};
//! use carburant_extract::{extract_grid, ExtractOptions, VehicleType};
//!
//! let text = |s: &str| Cell::new(CellValue::text(s));
//! let grid = Grid::from_rows(vec![
//!     vec![text("Mois"), text("Matricule"), text("Consommation (L)"), text("Kilométrage")],
//!     vec![text("janvier"), text("1682 TU 147"), Cell::new(50.0.into()), Cell::new(1000.0.into())],
//! ]);
//!
//! let extraction = extract_grid(&grid, "Camions", &ExtractOptions::default());
//! let record = &extraction.records[0];
//! assert_eq!(record.vehicle_type, VehicleType::Camion);
//! assert_eq!(record.ipe_l100km, Some(5.0));
//! ```

pub mod aggregate;
pub mod error;
pub mod extractor;
pub mod merge;
pub mod options;
pub mod parse;
pub mod performance;
pub mod record;
pub mod roles;
pub mod vehicle;

pub use aggregate::{
    filter_for_regression, month_number, monthly_summary, round_metric, MonthlySummary,
};
pub use error::RowError;
pub use extractor::{extract, extract_grid, performance_indices, Extraction, RowIssue};
pub use merge::{merge_records, MergeMode, MergeStats};
pub use options::{ExtractOptions, DEFAULT_MONTH_LABEL};
pub use parse::{parse_currency, parse_currency_text, parse_numeric, parse_numeric_text};
pub use performance::{vehicle_performance, MonthlyMetrics, VehiclePerformance};
pub use record::{format_currency, MonthTotals, MonthlyTotals, VehicleRecord};
pub use roles::{classify_columns, is_valid_roles, ColumnRoles, Role};
pub use vehicle::{classify_vehicle, VehicleType};
