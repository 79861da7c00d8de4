//! A1-style cell addresses and rectangular ranges

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A zero-based cell position.
///
/// `$` markers are accepted when parsing and dropped: the extractor only
/// needs positions, never reference semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Row index (0-based)
    pub row: u32,
    /// Column index (0-based, A=0)
    pub col: u16,
}

impl CellAddress {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse an address such as `B7` or `$C$12`
    ///
    /// ```
    /// use carburant_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$C$12").unwrap();
    /// assert_eq!((addr.row, addr.col), (11, 2));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        if cleaned.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| Error::InvalidAddress(format!("no row number in '{}'", s)))?;
        let (letters, digits) = cleaned.split_at(split);
        if letters.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }

        let col = Self::letters_to_column(letters)?;
        let row: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;
        if row == 0 || row > MAX_ROWS {
            return Err(Error::InvalidAddress(format!(
                "row number out of range in '{}'",
                s
            )));
        }

        Ok(Self::new(row - 1, col))
    }

    /// Convert column letters to a 0-based index (A = 0, AA = 26)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS as u32 {
                return Err(Error::InvalidAddress(format!(
                    "column '{}' out of range",
                    letters
                )));
            }
        }
        if col == 0 {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }
        Ok((col - 1) as u16)
    }

    /// Convert a 0-based column index to letters
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::new();
        let mut n = col as u32 + 1;
        while n > 0 {
            n -= 1;
            letters.push((b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        letters.iter().rev().collect()
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_to_letters(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular block of cells, normalized so `start` is top-left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn from_indices(first_row: u32, first_col: u16, last_row: u32, last_col: u16) -> Self {
        Self::new(
            CellAddress::new(first_row, first_col),
            CellAddress::new(last_row, last_col),
        )
    }

    /// Parse `A1:B10` (or a single address, giving a one-cell range)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((a, b)) => {
                let start = CellAddress::parse(a)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                let end = CellAddress::parse(b)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                Ok(Self::new(start, end))
            }
            None => {
                let addr = CellAddress::parse(s)?;
                Ok(Self::new(addr, addr))
            }
        }
    }

    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.start.row && row <= self.end.row && col >= self.start.col && col <= self.end.col
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Iterate every address in the range, row by row
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (self.start.row..=self.end.row).flat_map(move |row| {
            (self.start.col..=self.end.col).map(move |col| CellAddress::new(row, col))
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}
