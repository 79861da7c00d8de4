//! Sparse sheet contents as decoded by a reader

use ahash::AHashMap;

use crate::cell::{CellRange, CellValue};
use crate::number_format::DateSystem;

/// A stored cell before grid resolution
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    /// A constant. Error literals are stored as `Empty` with their text kept
    /// in `display`.
    Value {
        value: CellValue,
        display: Option<String>,
    },

    /// A formula with its cached result when the file carried one
    Formula {
        /// Formula source, with a leading `=` (empty when the format does
        /// not expose it)
        source: String,
        cached: Option<CellValue>,
        /// The cell's number format is a date format
        date_formatted: bool,
    },
}

impl RawCell {
    pub fn value(value: CellValue) -> Self {
        RawCell::Value {
            value,
            display: None,
        }
    }

    /// An error literal such as `#DIV/0!`: no value, but visible text
    pub fn error<S: Into<String>>(text: S) -> Self {
        RawCell::Value {
            value: CellValue::Empty,
            display: Some(text.into()),
        }
    }

    pub fn formula<S: Into<String>>(source: S, cached: Option<CellValue>) -> Self {
        RawCell::Formula {
            source: source.into(),
            cached,
            date_formatted: false,
        }
    }

    /// The value a formula reference to this cell sees
    pub fn current_value(&self) -> CellValue {
        match self {
            RawCell::Value { value, .. } => value.clone(),
            RawCell::Formula { cached, .. } => cached.clone().unwrap_or(CellValue::Empty),
        }
    }
}

/// One worksheet's decoded contents: sparse cells plus merged regions
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    name: String,
    cells: AHashMap<(u32, u16), RawCell>,
    merged: Vec<CellRange>,
    date_system: DateSystem,
}

impl SheetData {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn date_system(&self) -> DateSystem {
        self.date_system
    }

    pub fn set_date_system(&mut self, date_system: DateSystem) {
        self.date_system = date_system;
    }

    pub fn set(&mut self, row: u32, col: u16, cell: RawCell) {
        self.cells.insert((row, col), cell);
    }

    pub fn set_value<V: Into<CellValue>>(&mut self, row: u32, col: u16, value: V) {
        self.set(row, col, RawCell::value(value.into()));
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&RawCell> {
        self.cells.get(&(row, col))
    }

    pub fn get_mut(&mut self, row: u32, col: u16) -> Option<&mut RawCell> {
        self.cells.get_mut(&(row, col))
    }

    /// Current value of a cell; formulas report their cached result
    pub fn value_at(&self, row: u32, col: u16) -> CellValue {
        self.get(row, col)
            .map(RawCell::current_value)
            .unwrap_or(CellValue::Empty)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> impl Iterator<Item = ((u32, u16), &RawCell)> {
        self.cells.iter().map(|(k, v)| (*k, v))
    }

    pub fn add_merged_region(&mut self, range: CellRange) {
        self.merged.push(range);
    }

    pub fn merged_regions(&self) -> &[CellRange] {
        &self.merged
    }

    /// Rows through the last stored row, and columns through the widest
    /// row's last stored cell. `(0, 0)` for an empty sheet.
    pub fn dimensions(&self) -> (usize, usize) {
        self.cells
            .keys()
            .fold((0, 0), |(rows, cols), &(row, col)| {
                (rows.max(row as usize + 1), cols.max(col as usize + 1))
            })
    }
}
