//! Spreadsheet container detection

use std::fmt;

use carburant_core::Error as CoreError;

use crate::error::Result;

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";
const CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Container formats the readers understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpreadsheetFormat {
    /// Office Open XML workbook (zip)
    Xlsx,
    /// BIFF8 workbook inside a compound file
    Xls,
}

impl SpreadsheetFormat {
    /// Identify the container from its leading bytes. Content that is
    /// neither container holds no workbook and reads as empty input.
    pub fn detect(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(CoreError::EmptyInput.into());
        }
        if bytes.starts_with(&ZIP_MAGIC) {
            Ok(SpreadsheetFormat::Xlsx)
        } else if bytes.starts_with(&CFB_MAGIC) {
            Ok(SpreadsheetFormat::Xls)
        } else {
            let shown = bytes.len().min(8);
            log::warn!("Unrecognized workbook signature {:02X?}", &bytes[..shown]);
            Err(CoreError::EmptyInput.into())
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            SpreadsheetFormat::Xlsx => "xlsx",
            SpreadsheetFormat::Xls => "xls",
        }
    }
}

impl fmt::Display for SpreadsheetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
