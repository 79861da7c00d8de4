//! Extraction settings

use serde::Deserialize;

/// Label given to rows that appear before any month cell
pub const DEFAULT_MONTH_LABEL: &str = "Mois non spécifié";

/// Options controlling row extraction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ExtractOptions {
    /// Row holding the column headers; data starts on the next row
    pub header_row: usize,
    /// Month label for rows seen before any month cell
    pub default_month_label: String,
    /// Treat rows whose cells are all `0`/`0.0` like blank rows
    pub skip_zero_rows: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            header_row: 0,
            default_month_label: DEFAULT_MONTH_LABEL.to_string(),
            skip_zero_rows: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options: ExtractOptions = serde_json::from_str(r#"{"header_row": 2}"#).unwrap();
        assert_eq!(options.header_row, 2);
        assert_eq!(options.default_month_label, DEFAULT_MONTH_LABEL);
        assert!(options.skip_zero_rows);
    }
}
