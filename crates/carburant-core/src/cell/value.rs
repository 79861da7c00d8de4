//! Cell value types

use std::fmt;

use chrono::{Datelike, NaiveDateTime};

use crate::FRENCH_MONTHS;

/// A resolved cell value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// No value
    Empty,

    /// Numeric value
    Number(f64),

    /// Text value
    Text(String),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// A number whose cell format is a date format. The serial form is
    /// kept next to the calendar value.
    Date {
        serial: f64,
        datetime: NaiveDateTime,
    },
}

impl CellValue {
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_date(&self) -> bool {
        matches!(self, CellValue::Date { .. })
    }

    /// The value as a plain number. Dates are deliberately excluded; use
    /// [`CellValue::serial`] to get their numeric form.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric form of a number or a date
    pub fn serial(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Date { serial, .. } => Some(*serial),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Name of the active variant, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
            CellValue::Boolean(_) => "boolean",
            CellValue::Date { .. } => "date",
        }
    }

    /// Render the value the way a spreadsheet shows it in a General cell.
    /// Dates render as `"<mois> <année>"`.
    pub fn render(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => render_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(true) => "TRUE".to_string(),
            CellValue::Boolean(false) => "FALSE".to_string(),
            CellValue::Date { datetime, .. } => format!(
                "{} {}",
                FRENCH_MONTHS[datetime.month0() as usize],
                datetime.year()
            ),
        }
    }
}

fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// A grid cell: the typed value plus its pre-rendered display string.
///
/// The display string is what text-oriented consumers read; it differs from
/// `value.render()` when a reader saw an error literal or when a formula
/// failed and fell back to its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    value: CellValue,
    display: String,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        let display = value.render();
        Self { value, display }
    }

    pub fn with_display<S: Into<String>>(value: CellValue, display: S) -> Self {
        Self {
            value,
            display: display.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(CellValue::Empty)
    }

    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    /// True when the cell holds a value whose display text is non-blank
    pub fn has_text(&self) -> bool {
        !self.value.is_empty() && !self.display.trim().is_empty()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<CellValue> for Cell {
    fn from(value: CellValue) -> Self {
        Cell::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_render_numbers() {
        assert_eq!(CellValue::Number(42.0).render(), "42");
        assert_eq!(CellValue::Number(-3.0).render(), "-3");
        assert_eq!(CellValue::Number(6368.16).render(), "6368.16");
        assert_eq!(CellValue::Number(0.5).render(), "0.5");
    }

    #[test]
    fn test_render_date_in_french() {
        let datetime = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let value = CellValue::Date {
            serial: 45323.0,
            datetime,
        };
        assert_eq!(value.render(), "février 2024");
        assert_eq!(value.as_number(), None);
        assert_eq!(value.serial(), Some(45323.0));
    }

    #[test]
    fn test_cell_has_text() {
        assert!(!Cell::empty().has_text());
        assert!(!Cell::new(CellValue::text("   ")).has_text());
        assert!(Cell::new(CellValue::text("janvier")).has_text());
        assert!(!Cell::with_display(CellValue::Empty, "#DIV/0!").has_text());
    }

    #[test]
    fn test_boolean_render() {
        assert_eq!(Cell::new(true.into()).display(), "TRUE");
        assert_eq!(CellValue::Boolean(false).to_string(), "FALSE");
    }
}
