//! An in-memory workbook and the end-to-end extraction entry points

use std::io::Cursor;
use std::path::Path;

use carburant_core::{Error as CoreError, Grid, SheetData};
use carburant_extract::{extract_grid, ExtractOptions, Extraction};
use carburant_formula::SheetEvaluator;
use carburant_xlsx::XlsxReader;

use crate::error::Result;
use crate::format::SpreadsheetFormat;

/// Workbook bytes with their detected format and sheet list.
///
/// Sheets are decoded on demand; only the sheet list is read up front, which
/// also validates the container.
#[derive(Debug, Clone)]
pub struct Workbook {
    format: SpreadsheetFormat,
    bytes: Vec<u8>,
    sheet_names: Vec<String>,
}

impl Workbook {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let format = SpreadsheetFormat::detect(&bytes)?;
        let sheet_names = read_sheet_names(format, &bytes)?;
        log::debug!(
            "Opened {} workbook ({} bytes) with sheets: {:?}",
            format,
            bytes.len(),
            sheet_names
        );
        Ok(Self {
            format,
            bytes,
            sheet_names,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(bytes)
    }

    pub fn format(&self) -> SpreadsheetFormat {
        self.format
    }

    /// Worksheet names in workbook order
    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheet_names.iter().any(|s| s == name)
    }

    /// Decode one sheet as stored
    pub fn read_sheet(&self, name: &str) -> Result<SheetData> {
        if !self.has_sheet(name) {
            return Err(CoreError::SheetNotFound(name.to_string()).into());
        }
        let cursor = Cursor::new(self.bytes.as_slice());
        match self.format {
            SpreadsheetFormat::Xlsx => Ok(XlsxReader::read_sheet(cursor, name)?),
            #[cfg(feature = "xls")]
            SpreadsheetFormat::Xls => Ok(carburant_xls::XlsReader::read_sheet(cursor, name)?),
            #[cfg(not(feature = "xls"))]
            SpreadsheetFormat::Xls => Err(xls_disabled()),
        }
    }

    /// Decode one sheet and resolve it into a grid, evaluating formulas that
    /// carry no cached result
    pub fn load_grid(&self, name: &str) -> Result<Grid> {
        let sheet = self.read_sheet(name)?;
        Ok(Grid::build(&sheet, &SheetEvaluator::new()))
    }

    /// Run the extraction pipeline over one sheet
    pub fn extract_sheet(&self, name: &str, options: &ExtractOptions) -> Result<Extraction> {
        let grid = self.load_grid(name)?;
        let extraction = extract_grid(&grid, name, options);
        log::info!(
            "Extracted {} records from sheet '{}' ({} rows skipped)",
            extraction.records.len(),
            name,
            extraction.issues.len()
        );
        Ok(extraction)
    }
}

/// Sheet names of a workbook held in memory
pub fn sheet_names(bytes: &[u8]) -> Result<Vec<String>> {
    let format = SpreadsheetFormat::detect(bytes)?;
    read_sheet_names(format, bytes)
}

/// Extract one sheet of a workbook held in memory
pub fn extract_sheet(bytes: &[u8], sheet: &str, options: &ExtractOptions) -> Result<Extraction> {
    Workbook::from_bytes(bytes.to_vec())?.extract_sheet(sheet, options)
}

/// A container that cannot be opened holds no readable workbook
fn read_sheet_names(format: SpreadsheetFormat, bytes: &[u8]) -> Result<Vec<String>> {
    let cursor = Cursor::new(bytes);
    match format {
        SpreadsheetFormat::Xlsx => XlsxReader::sheet_names(cursor).map_err(unreadable),
        #[cfg(feature = "xls")]
        SpreadsheetFormat::Xls => carburant_xls::XlsReader::sheet_names(cursor).map_err(unreadable),
        #[cfg(not(feature = "xls"))]
        SpreadsheetFormat::Xls => Err(xls_disabled()),
    }
}

fn unreadable(cause: impl std::fmt::Display) -> crate::Error {
    log::warn!("Unreadable workbook: {}", cause);
    CoreError::EmptyInput.into()
}

#[cfg(not(feature = "xls"))]
fn xls_disabled() -> crate::Error {
    CoreError::InvalidFormat("XLS support is not enabled".into()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_garbage_is_rejected() {
        let err = Workbook::from_bytes(b"not a workbook".to_vec()).unwrap_err();
        assert!(matches!(err, Error::Core(CoreError::EmptyInput)));
    }

    #[test]
    fn test_truncated_zip_is_empty_input() {
        let err = sheet_names(b"PK\x03\x04\x14\x00").unwrap_err();
        assert!(matches!(err, Error::Core(CoreError::EmptyInput)));
    }

    #[test]
    fn test_zip_without_workbook_is_empty_input() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("notes.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            std::io::Write::write_all(&mut zip, b"janvier").unwrap();
            zip.finish().unwrap();
        }
        let err = Workbook::from_bytes(buf).unwrap_err();
        assert!(matches!(err, Error::Core(CoreError::EmptyInput)));
    }

    #[cfg(feature = "xls")]
    #[test]
    fn test_corrupt_compound_file_is_empty_input() {
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        bytes.extend_from_slice(&[0u8; 64]);
        let err = sheet_names(&bytes).unwrap_err();
        assert!(matches!(err, Error::Core(CoreError::EmptyInput)));
    }
}
