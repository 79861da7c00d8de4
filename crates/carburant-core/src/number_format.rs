//! Number formats and date serial conversion
//!
//! Readers only need one fact from a cell's number format: whether a number
//! stored in it should be presented as a date.

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// A cell number format, either a built-in id or a custom format code
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NumberFormat {
    #[default]
    General,
    BuiltIn(u32),
    Custom(String),
}

impl NumberFormat {
    /// Resolve a format id against the custom codes declared by the workbook
    pub fn resolve(id: u32, custom: Option<&str>) -> Self {
        match (id, custom) {
            (0, _) => NumberFormat::General,
            (_, Some(code)) => NumberFormat::Custom(code.to_string()),
            (id, None) => NumberFormat::BuiltIn(id),
        }
    }

    /// Check if this is a date/time format
    pub fn is_date_format(&self) -> bool {
        match self {
            NumberFormat::General => false,
            // 14-22 are the date/time built-ins; 45-47 are mm:ss variants
            NumberFormat::BuiltIn(id) => matches!(id, 14..=22 | 45..=47),
            NumberFormat::Custom(code) => is_date_code(code),
        }
    }
}

/// A custom code is a date code when, outside of quoted literals and
/// bracketed sections, it uses a date/time placeholder.
fn is_date_code(code: &str) -> bool {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;

    // Only the first section (positive numbers) decides
    for c in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            ';' if !in_quotes && !in_brackets => break,
            _ if in_quotes || in_brackets => {}
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}

/// Workbook date system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateSystem {
    /// Serial 1 = 1900-01-01, including the phantom 1900-02-29
    #[default]
    Date1900,
    /// Serial 0 = 1904-01-01
    Date1904,
}

impl DateSystem {
    /// Convert a serial number to a calendar date-time.
    ///
    /// Returns `None` for negative serials and values beyond chrono's range.
    pub fn to_datetime(self, serial: f64) -> Option<NaiveDateTime> {
        if !serial.is_finite() || serial < 0.0 {
            return None;
        }

        let days = serial.trunc() as i64;
        let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;

        let base = match self {
            DateSystem::Date1904 => NaiveDate::from_ymd_opt(1904, 1, 1)?,
            // Serials before the phantom leap day are offset by one
            DateSystem::Date1900 if days < 60 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
            DateSystem::Date1900 => NaiveDate::from_ymd_opt(1899, 12, 30)?,
        };

        base.and_hms_opt(0, 0, 0)?
            .checked_add_signed(Duration::days(days))?
            .checked_add_signed(Duration::seconds(seconds))
    }
}
