//! Rectangular, merge-resolved view of a sheet

use crate::cell::{Cell, CellRange, CellValue};
use crate::error::Result;
use crate::sheet::{RawCell, SheetData};

/// Evaluates formulas that arrived without a cached result
pub trait FormulaResolver {
    /// Evaluate the formula `source` stored at (`row`, `col`) of `sheet`
    fn resolve(&self, sheet: &SheetData, row: u32, col: u16, source: &str) -> Result<CellValue>;
}

/// Resolver that trusts cached results and fails on everything else
#[derive(Debug, Clone, Copy, Default)]
pub struct CachedOnly;

impl FormulaResolver for CachedOnly {
    fn resolve(&self, _sheet: &SheetData, row: u32, col: u16, source: &str) -> Result<CellValue> {
        Err(crate::Error::Formula(format!(
            "no cached result for '{}' at row {} col {}",
            source, row, col
        )))
    }
}

/// Rows of cells, all of the same width. Row 0 is the header by convention.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    width: usize,
}

impl Grid {
    /// Build a grid from loose rows, padding ragged rows with empty cells
    pub fn from_rows(mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize_with(width, Cell::empty);
        }
        Self { rows, width }
    }

    /// Resolve a sheet: evaluate formulas, convert date-formatted numbers,
    /// then copy each merged region's top-left cell over the whole region.
    pub fn build(sheet: &SheetData, resolver: &dyn FormulaResolver) -> Self {
        let (row_count, width) = sheet.dimensions();
        let mut rows = vec![vec![Cell::empty(); width]; row_count];

        for ((row, col), raw) in sheet.cells() {
            rows[row as usize][col as usize] = resolve_cell(sheet, row, col, raw, resolver);
        }

        let mut grid = Self { rows, width };
        grid.apply_merged_regions(sheet.merged_regions());
        log::debug!(
            "Built grid for sheet '{}': {} rows x {} columns, {} merged regions",
            sheet.name(),
            grid.row_count(),
            grid.width(),
            sheet.merged_regions().len()
        );
        grid
    }

    /// Overwrite every cell of each region with the region's top-left cell.
    /// Cells outside the grid are skipped.
    pub fn apply_merged_regions(&mut self, regions: &[CellRange]) {
        for region in regions {
            let Some(top_left) = self
                .cell(region.start.row as usize, region.start.col as usize)
                .cloned()
            else {
                continue;
            };

            let last_row = (region.end.row as usize).min(self.rows.len().saturating_sub(1));
            let last_col = (region.end.col as usize).min(self.width.saturating_sub(1));
            for row in &mut self.rows[region.start.row as usize..=last_row] {
                for cell in &mut row[region.start.col as usize..=last_col] {
                    *cell = top_left.clone();
                }
            }
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// The header row, or an empty slice for an empty grid
    pub fn header(&self) -> &[Cell] {
        self.row(0).unwrap_or(&[])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

fn resolve_cell(
    sheet: &SheetData,
    row: u32,
    col: u16,
    raw: &RawCell,
    resolver: &dyn FormulaResolver,
) -> Cell {
    match raw {
        RawCell::Value {
            value,
            display: Some(display),
        } => Cell::with_display(value.clone(), display.clone()),
        RawCell::Value {
            value,
            display: None,
        } => Cell::new(value.clone()),
        RawCell::Formula {
            source,
            cached,
            date_formatted,
        } => {
            let result = match cached {
                Some(value) => Ok(value.clone()),
                None => resolver.resolve(sheet, row, col, source),
            };
            match result {
                Ok(value) if *date_formatted => Cell::new(as_date(sheet, value)),
                Ok(value) => Cell::new(value),
                Err(e) => {
                    log::warn!(
                        "Error evaluating formula in cell {}: {}",
                        crate::CellAddress::new(row, col),
                        e
                    );
                    Cell::new(CellValue::Text(source.clone()))
                }
            }
        }
    }
}

fn as_date(sheet: &SheetData, value: CellValue) -> CellValue {
    match value {
        CellValue::Number(serial) => match sheet.date_system().to_datetime(serial) {
            Some(datetime) => CellValue::Date { serial, datetime },
            None => CellValue::Number(serial),
        },
        other => other,
    }
}
