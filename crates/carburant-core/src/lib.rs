//! # carburant-core
//!
//! Core data structures shared by the carburant readers and the extraction
//! pipeline:
//! - [`CellValue`] and [`Cell`] - typed values with a pre-rendered display string
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing
//! - [`SheetData`] - the sparse sheet a reader produces
//! - [`Grid`] - the rectangular, merge-resolved view the extractor consumes
//!
//! ## Example
//!
//! ```rust
//! use carburant_core::{CellRange, CellValue, Grid, SheetData};
//! use carburant_core::grid::CachedOnly;
//!
//! let mut sheet = SheetData::new("Camions");
//! sheet.set_value(0, 0, "Mois");
//! sheet.set_value(1, 0, "janvier");
//! sheet.add_merged_region(CellRange::parse("A2:A4").unwrap());
//!
//! let grid = Grid::build(&sheet, &CachedOnly);
//! assert_eq!(grid.row_count(), 2);
//! assert_eq!(grid.cell(1, 0).unwrap().value(), &CellValue::from("janvier"));
//! ```

pub mod cell;
pub mod error;
pub mod grid;
pub mod number_format;
pub mod sheet;

pub use cell::{Cell, CellAddress, CellRange, CellValue};
pub use error::{Error, Result};
pub use grid::{FormulaResolver, Grid};
pub use number_format::{DateSystem, NumberFormat};
pub use sheet::{RawCell, SheetData};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// French month names, January first. Used to render date cells.
pub const FRENCH_MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];
