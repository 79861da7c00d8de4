//! Locale-tolerant number and currency parsing.
//!
//! Neither parser fails: text that cannot be read as a number is 0.0.

use carburant_core::{Cell, CellValue};
use lazy_regex::{regex, regex_is_match};

/// Numeric value of a cell. Plain numbers are used as they are; text goes
/// through [`parse_numeric_text`]. Booleans count as 1 or 0 and dates are
/// not quantities, so they read as 0.
pub fn parse_numeric(cell: &Cell) -> f64 {
    match cell.value() {
        CellValue::Number(n) => *n,
        CellValue::Text(text) => parse_numeric_text(text),
        CellValue::Boolean(true) => 1.0,
        CellValue::Boolean(false) | CellValue::Date { .. } | CellValue::Empty => 0.0,
    }
}

/// Parse free text such as `"1 250,5 L"`.
///
/// A plain `digits[.digits]` string is parsed directly. Otherwise everything
/// except digits, `,`, `.` and `-` is dropped and commas become decimal
/// points.
pub fn parse_numeric_text(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    if regex_is_match!(r"^\d+(\.\d+)?$", text) {
        return text.parse().unwrap_or(0.0);
    }

    let cleaned = regex!(r"[^\d.,\-]").replace_all(text, "").replace(',', ".");
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse().unwrap_or_else(|_| {
        log::debug!("Could not parse numeric value from: '{}'", text);
        0.0
    })
}

/// Monetary value of a cell. Plain numbers are used as they are; anything
/// else is read from its display text with [`parse_currency_text`].
pub fn parse_currency(cell: &Cell) -> f64 {
    match cell.value() {
        CellValue::Number(n) => *n,
        CellValue::Empty => 0.0,
        _ => parse_currency_text(cell.display()),
    }
}

/// Parse an amount such as `"6,368.16 TND"` or `"100,5 DT"`.
///
/// Currency tokens are removed first. When a comma precedes a dot the comma
/// is a thousands separator; a lone comma is the decimal separator.
/// European grouping (`"1.234,56"`) is not recognized.
pub fn parse_currency_text(text: &str) -> f64 {
    let stripped = regex!(r"(?i)(TND|DT|DINAR|د.ت|دينار)").replace_all(text, "");
    let stripped = stripped.trim();

    let normalized = match (stripped.find(','), stripped.find('.')) {
        (Some(comma), Some(dot)) if comma < dot => stripped.replace(',', ""),
        (Some(_), _) => stripped.replace(',', "."),
        _ => stripped.to_string(),
    };

    let cleaned = regex!(r"[^\d.\-]").replace_all(&normalized, "");
    cleaned.parse().unwrap_or_else(|_| {
        log::debug!("Could not parse currency value from: '{}'", text);
        0.0
    })
}
