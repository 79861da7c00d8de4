//! XLSX reader

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use carburant_core::{CellAddress, CellRange, CellValue, DateSystem, RawCell, SheetData};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use zip::ZipArchive;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::{attr_value, read_styles_xml, DateStyles};

/// Decode Excel's `_xHHHH_` escape sequences in strings (`_x000d_` is CR,
/// `_x005f_` an escaped underscore)
fn decode_excel_escapes(s: &str) -> Cow<'_, str> {
    if !s.contains("_x") {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find("_x") {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match decode_escape(candidate) {
            Some(c) => {
                out.push(c);
                rest = &candidate[7..];
            }
            None => {
                out.push('_');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// `s` starts with `_x`; decode it if it is a full `_xHHHH_`
fn decode_escape(s: &str) -> Option<char> {
    if s.as_bytes().get(6) != Some(&b'_') {
        return None;
    }
    let hex = s.get(2..6)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    char::from_u32(u32::from_str_radix(hex, 16).ok()?)
}

/// Workbook-level parts every worksheet decode needs
struct WorkbookParts {
    /// (name, part path) in workbook order
    sheets: Vec<(String, String)>,
    shared_strings: Vec<String>,
    date_styles: DateStyles,
    date_system: DateSystem,
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read every worksheet of a file
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Vec<SheetData>> {
        let file = File::open(path)?;
        Self::read(file)
    }

    /// Read every worksheet, in workbook order
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Vec<SheetData>> {
        let mut archive = Self::open(reader)?;
        let parts = Self::read_workbook_parts(&mut archive)?;

        parts
            .sheets
            .iter()
            .map(|(name, path)| Self::read_worksheet(&mut archive, name, path, &parts))
            .collect()
    }

    /// Sheet names in workbook order, without decoding any worksheet
    pub fn sheet_names<R: Read + Seek>(reader: R) -> XlsxResult<Vec<String>> {
        let mut archive = Self::open(reader)?;
        let (sheets, _) = Self::read_workbook_xml(&mut archive)?;
        Ok(sheets.into_iter().map(|(name, _)| name).collect())
    }

    /// Read a single worksheet by name
    pub fn read_sheet<R: Read + Seek>(reader: R, sheet_name: &str) -> XlsxResult<SheetData> {
        let mut archive = Self::open(reader)?;
        let parts = Self::read_workbook_parts(&mut archive)?;

        let (name, path) = parts
            .sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .ok_or_else(|| XlsxError::SheetNotFound(sheet_name.to_string()))?;
        Self::read_worksheet(&mut archive, name, path, &parts)
    }

    fn open<R: Read + Seek>(reader: R) -> XlsxResult<ZipArchive<R>> {
        let mut archive = ZipArchive::new(reader)?;

        // Verify this is an XLSX file
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }
        Ok(archive)
    }

    fn read_workbook_parts<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
    ) -> XlsxResult<WorkbookParts> {
        let shared_strings = Self::read_shared_strings(archive)?;
        let date_styles = match archive.by_name("xl/styles.xml") {
            Ok(file) => read_styles_xml(file)?,
            Err(_) => DateStyles::default(),
        };
        let (sheet_info, date_system) = Self::read_workbook_xml(archive)?;
        let sheet_paths = Self::read_workbook_rels(archive)?;

        let mut sheets = Vec::with_capacity(sheet_info.len());
        for (name, r_id) in sheet_info {
            match sheet_paths.get(&r_id) {
                Some(path) => sheets.push((name, path.clone())),
                None => log::warn!("Sheet '{}' has no worksheet part ({}), skipping", name, r_id),
            }
        }

        log::debug!(
            "XLSX workbook: {} sheets, {} shared strings, {:?}",
            sheets.len(),
            shared_strings.len(),
            date_system
        );
        Ok(WorkbookParts {
            sheets,
            shared_strings,
            date_styles,
            date_system,
        })
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(archive: &mut ZipArchive<R>) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings),
        };

        // Untrimmed: rich text runs carry their own spacing
        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    // rich text runs (<r><t>) are concatenated
                    b"t" if in_si => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => strings.push(String::new()),
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current).into_owned());
                        in_si = false;
                    }
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    if let Ok(text) = e.unescape() {
                        current.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Read workbook.xml: sheet names with their rIds, and the date system
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
    ) -> XlsxResult<(Vec<(String, String)>, DateSystem)> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();
        let mut date_system = DateSystem::Date1900;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"sheet" => {
                        let name = attr_value(&e, b"name");
                        let r_id = attr_value(&e, b"r:id");
                        if let (Some(name), Some(r_id)) = (name, r_id) {
                            sheets.push((name, r_id));
                        }
                    }
                    b"workbookPr" => {
                        if matches!(attr_value(&e, b"date1904").as_deref(), Some("1" | "true")) {
                            date_system = DateSystem::Date1904;
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok((sheets, date_system))
    }

    /// Read workbook.xml.rels: rId to worksheet part path
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let id = attr_value(&e, b"Id");
                    let target = attr_value(&e, b"Target");
                    let rel_type = attr_value(&e, b"Type");

                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // relative to xl/ unless absolute
                            let path = match target.strip_prefix('/') {
                                Some(absolute) => absolute.to_string(),
                                None => format!("xl/{}", target),
                            };
                            rels.insert(id, path);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    fn read_worksheet<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        name: &str,
        path: &str,
        parts: &WorkbookParts,
    ) -> XlsxResult<SheetData> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut sheet = SheetData::new(name);
        sheet.set_date_system(parts.date_system);

        let mut buf = Vec::new();
        let mut cell = PendingCell::default();
        // Position used when a <row> or <c> omits its reference
        let mut next_row: u32 = 0;
        let mut next_col: u16 = 0;
        let mut in_cell = false;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_str = false;
        let mut in_inline_text = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"row" => {
                        Self::start_row(&e, &mut next_row);
                        next_col = 0;
                    }
                    b"c" => {
                        cell = PendingCell::from_attributes(&e, next_row, next_col)?;
                        in_cell = true;
                    }
                    b"v" if in_cell => in_value = true,
                    b"f" if in_cell => {
                        in_formula = true;
                        cell.formula.get_or_insert_with(String::new);
                    }
                    b"is" if in_cell => in_inline_str = true,
                    b"t" if in_inline_str => in_inline_text = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"row" => {
                        Self::start_row(&e, &mut next_row);
                        next_row += 1;
                    }
                    // styled blank cell
                    b"c" => {
                        let blank = PendingCell::from_attributes(&e, next_row, next_col)?;
                        next_col = blank.address.col.saturating_add(1);
                    }
                    b"mergeCell" => {
                        if let Some(reference) = attr_value(&e, b"ref") {
                            match CellRange::parse(&reference) {
                                Ok(range) => sheet.add_merged_region(range),
                                Err(err) => log::warn!(
                                    "Ignoring merged region '{}' in '{}': {}",
                                    reference,
                                    name,
                                    err
                                ),
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) if in_value || in_formula || in_inline_text => {
                    let text = e.unescape()?;
                    let target = if in_formula {
                        cell.formula.get_or_insert_with(String::new)
                    } else {
                        cell.value.get_or_insert_with(String::new)
                    };
                    target.push_str(&text);
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"row" => next_row += 1,
                    b"c" => {
                        in_cell = false;
                        next_col = cell.address.col.saturating_add(1);
                        let pending = std::mem::take(&mut cell);
                        let address = pending.address;
                        if let Some(raw) = pending.into_raw(parts, &sheet)? {
                            sheet.set(address.row, address.col, raw);
                        }
                    }
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"is" => in_inline_str = false,
                    b"t" => in_inline_text = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        log::debug!(
            "Read sheet '{}': {} cells, {} merged regions",
            name,
            sheet.cell_count(),
            sheet.merged_regions().len()
        );
        Ok(sheet)
    }

    fn start_row(e: &BytesStart, next_row: &mut u32) {
        if let Some(r) = attr_value(e, b"r").and_then(|s| s.parse::<u32>().ok()) {
            if r > 0 {
                *next_row = r - 1;
            }
        }
    }
}

/// A `<c>` element being accumulated
#[derive(Debug, Default)]
struct PendingCell {
    address: CellAddress,
    cell_type: Option<String>,
    style: Option<usize>,
    value: Option<String>,
    formula: Option<String>,
}

impl PendingCell {
    fn from_attributes(e: &BytesStart, row: u32, col: u16) -> XlsxResult<Self> {
        let address = match attr_value(e, b"r") {
            Some(reference) => CellAddress::parse(&reference).map_err(|err| {
                XlsxError::Parse(format!("Invalid cell reference '{}': {}", reference, err))
            })?,
            None => CellAddress::new(row, col),
        };

        Ok(Self {
            address,
            cell_type: attr_value(e, b"t"),
            style: attr_value(e, b"s").and_then(|s| s.parse().ok()),
            value: None,
            formula: None,
        })
    }

    /// Convert to a stored cell; `None` for a cell with neither value nor
    /// formula
    fn into_raw(self, parts: &WorkbookParts, sheet: &SheetData) -> XlsxResult<Option<RawCell>> {
        let date_formatted = parts.date_styles.is_date(self.style);
        let cell_type = self.cell_type.as_deref();

        // Error literals, cached or not, keep only their text
        if cell_type == Some("e") {
            return Ok(self.value.map(RawCell::error));
        }

        let value = match self.value {
            Some(v) => Some(Self::decode_value(cell_type, &v, &parts.shared_strings)?),
            None => None,
        };

        match self.formula.filter(|f| !f.trim().is_empty()) {
            Some(formula) => {
                let source = if formula.starts_with('=') {
                    formula
                } else {
                    format!("={}", formula)
                };
                Ok(Some(RawCell::Formula {
                    source,
                    cached: value,
                    date_formatted,
                }))
            }
            None => Ok(value.map(|value| {
                let value = match value {
                    CellValue::Number(serial) if date_formatted => {
                        match sheet.date_system().to_datetime(serial) {
                            Some(datetime) => CellValue::Date { serial, datetime },
                            None => CellValue::Number(serial),
                        }
                    }
                    other => other,
                };
                RawCell::value(value)
            })),
        }
    }

    fn decode_value(
        cell_type: Option<&str>,
        value: &str,
        shared_strings: &[String],
    ) -> XlsxResult<CellValue> {
        let decoded = match cell_type {
            // Shared string
            Some("s") => {
                let idx: usize = value.trim().parse().map_err(|_| {
                    XlsxError::Parse(format!("Invalid shared string index: {}", value))
                })?;
                let s = shared_strings.get(idx).ok_or_else(|| {
                    XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
                })?;
                CellValue::Text(s.clone())
            }

            Some("b") => CellValue::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),

            Some("str") | Some("inlineStr") => {
                CellValue::Text(decode_excel_escapes(value).into_owned())
            }

            // Number (default type or explicit "n")
            None | Some("n") => match value.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(value.to_string()),
            },

            Some(_) => CellValue::Text(value.to_string()),
        };
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_decode_excel_escapes() {
        assert_eq!(decode_excel_escapes("Line1_x000d_Line2"), "Line1\rLine2");
        assert_eq!(decode_excel_escapes("Col1_x0009_Col2"), "Col1\tCol2");
        assert_eq!(decode_excel_escapes("a_x005f_b"), "a_b");
        assert_eq!(decode_excel_escapes("Camion TU 123"), "Camion TU 123");
    }

    #[test]
    fn test_decode_excel_escapes_partial_sequence() {
        assert_eq!(decode_excel_escapes("_x00"), "_x00");
        assert_eq!(decode_excel_escapes("_xZZZZ_"), "_xZZZZ_");
        assert_eq!(decode_excel_escapes("end_x"), "end_x");
        assert_eq!(decode_excel_escapes("_x000A_x"), "\nx");
    }

    #[test]
    fn test_missing_content_types_is_rejected() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("hello.txt", options).unwrap();
            zip.write_all(b"not a workbook").unwrap();
            zip.finish().unwrap();
        }

        let err = XlsxReader::read(Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, XlsxError::InvalidFormat(_)));
    }

    #[test]
    fn test_not_a_zip() {
        let err = XlsxReader::read(Cursor::new(b"plain text".to_vec())).unwrap_err();
        assert!(matches!(err, XlsxError::Zip(_)));
    }
}
