//! XLS (BIFF8) reader.
//!
//! Opens the Compound File Binary container, reads the `Workbook` stream,
//! parses the globals substream (strings, sheets, formats, date mode) and
//! decodes each worksheet substream into a [`SheetData`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use carburant_core::{CellRange, CellValue, DateSystem, RawCell, SheetData};

use crate::biff::parser::{read_f64, read_rk, read_u16, read_u32, read_u8, skip};
use crate::biff::records;
use crate::biff::strings::{parse_sst, read_short_string, read_unicode_string};
use crate::biff::{self, BiffRecord};
use crate::error::{XlsError, XlsResult};
use crate::formats::FormatTable;

/// XLS file reader
pub struct XlsReader;

/// Sheet entry from a BOUNDSHEET record
#[derive(Debug)]
struct SheetInfo {
    /// Stream offset of the sheet's BOF
    offset: u32,
    /// 0 = worksheet, 2 = chart, 6 = VBA module
    sheet_type: u8,
    name: String,
}

/// Everything the globals substream contributes
struct Globals {
    sst: Vec<String>,
    sheets: Vec<SheetInfo>,
    date_xfs: Vec<bool>,
    date_system: DateSystem,
}

impl Globals {
    fn is_date_xf(&self, xf: u16) -> bool {
        self.date_xfs.get(xf as usize).copied().unwrap_or(false)
    }

    fn number(&self, xf: u16, value: f64) -> CellValue {
        if self.is_date_xf(xf) {
            if let Some(datetime) = self.date_system.to_datetime(value) {
                return CellValue::Date {
                    serial: value,
                    datetime,
                };
            }
        }
        CellValue::Number(value)
    }
}

impl XlsReader {
    /// Read every worksheet of a file
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsResult<Vec<SheetData>> {
        let file = File::open(path.as_ref())?;
        Self::read(file)
    }

    /// Read every worksheet, in workbook order. Charts and macro sheets are
    /// skipped.
    pub fn read<R: Read + Seek>(reader: R) -> XlsResult<Vec<SheetData>> {
        let records = Self::load_records(reader)?;
        let (globals, sheet_records) = Self::parse_globals(&records)?;
        let groups = Self::split_sheet_records(sheet_records);

        Self::worksheets(&globals)
            .enumerate()
            .map(|(idx, info)| {
                let group = Self::group_for(&groups, info, idx);
                Self::parse_sheet(info, group, &globals)
            })
            .collect()
    }

    /// Worksheet names in workbook order
    pub fn sheet_names<R: Read + Seek>(reader: R) -> XlsResult<Vec<String>> {
        let records = Self::load_records(reader)?;
        let (globals, _) = Self::parse_globals(&records)?;
        Ok(Self::worksheets(&globals)
            .map(|info| info.name.clone())
            .collect())
    }

    /// Read a single worksheet by name
    pub fn read_sheet<R: Read + Seek>(reader: R, sheet_name: &str) -> XlsResult<SheetData> {
        let records = Self::load_records(reader)?;
        let (globals, sheet_records) = Self::parse_globals(&records)?;
        let groups = Self::split_sheet_records(sheet_records);

        let (idx, info) = Self::worksheets(&globals)
            .enumerate()
            .find(|(_, info)| info.name == sheet_name)
            .ok_or_else(|| XlsError::SheetNotFound(sheet_name.to_string()))?;
        Self::parse_sheet(info, Self::group_for(&groups, info, idx), &globals)
    }

    fn worksheets(globals: &Globals) -> impl Iterator<Item = &SheetInfo> {
        globals
            .sheets
            .iter()
            .filter(|info| info.sheet_type == records::SHEET_TYPE_WORKSHEET)
    }

    fn load_records<R: Read + Seek>(reader: R) -> XlsResult<Vec<BiffRecord>> {
        let mut cfb = cfb::CompoundFile::open(reader)?;

        // "Book" is the BIFF5 stream name; its BOF version is rejected below
        let stream_path = if cfb.exists("/Workbook") {
            "/Workbook"
        } else if cfb.exists("/Book") {
            "/Book"
        } else {
            return Err(XlsError::InvalidFormat(
                "no Workbook or Book stream found in CFB".into(),
            ));
        };

        let mut stream_data = Vec::new();
        cfb.open_stream(stream_path)?.read_to_end(&mut stream_data)?;
        biff::read_all_records(&mut Cursor::new(stream_data))
    }

    /// Parse the globals substream; returns it with the records after it
    fn parse_globals(records: &[BiffRecord]) -> XlsResult<(Globals, &[BiffRecord])> {
        let first = records
            .first()
            .filter(|rec| rec.record_type == records::BOF)
            .ok_or_else(|| XlsError::InvalidFormat("stream does not start with BOF".into()))?;
        let (version, dt) = biff::parse_bof(&first.data)?;
        if dt != records::BOF_WORKBOOK_GLOBALS {
            return Err(XlsError::InvalidFormat(format!(
                "first substream is 0x{dt:04X}, not workbook globals"
            )));
        }
        if version != records::BIFF8_VERSION {
            return Err(XlsError::UnsupportedVersion(format!(
                "expected BIFF8 (0x0600), got 0x{version:04X}"
            )));
        }

        let mut globals = Globals {
            sst: Vec::new(),
            sheets: Vec::new(),
            date_xfs: Vec::new(),
            date_system: DateSystem::Date1900,
        };
        let mut formats = FormatTable::default();

        for (idx, rec) in records.iter().enumerate().skip(1) {
            match rec.record_type {
                records::EOF => {
                    globals.date_xfs = formats.date_flags();
                    log::debug!(
                        "XLS globals: {} sheets, {} shared strings, {:?}",
                        globals.sheets.len(),
                        globals.sst.len(),
                        globals.date_system
                    );
                    return Ok((globals, &records[idx + 1..]));
                }
                records::SST => globals.sst = parse_sst(&rec.data, &rec.continue_offsets)?,
                records::BOUNDSHEET => globals.sheets.push(Self::parse_boundsheet(&rec.data)?),
                records::DATEMODE => {
                    let mut off = 0;
                    if read_u16(&rec.data, &mut off)? == 1 {
                        globals.date_system = DateSystem::Date1904;
                    }
                }
                records::FORMAT => {
                    if let Err(e) = formats.add_format(&rec.data) {
                        log::warn!("Skipping malformed FORMAT record: {}", e);
                    }
                }
                records::XF => {
                    if let Err(e) = formats.add_xf(&rec.data) {
                        log::warn!("Skipping malformed XF record: {}", e);
                    }
                }
                _ => {}
            }
        }

        Err(XlsError::InvalidFormat(
            "workbook globals have no EOF".into(),
        ))
    }

    /// BOUNDSHEET: bof_offset(4) + visibility(1) + type(1) + short string
    fn parse_boundsheet(data: &[u8]) -> XlsResult<SheetInfo> {
        let mut off = 0;
        let offset = read_u32(data, &mut off)?;
        let _visibility = read_u8(data, &mut off)?;
        let sheet_type = read_u8(data, &mut off)?;
        let name = read_short_string(data, &mut off)?;

        Ok(SheetInfo {
            offset,
            sheet_type,
            name,
        })
    }

    /// Split the records after the globals into BOF..EOF substreams, keyed
    /// by the stream offset of their BOF. Nested substreams (embedded
    /// charts) stay inside their parent.
    fn split_sheet_records(records: &[BiffRecord]) -> Vec<(u64, Vec<&BiffRecord>)> {
        let mut groups = Vec::new();
        let mut current: Option<(u64, Vec<&BiffRecord>)> = None;
        let mut depth = 0usize;

        for rec in records {
            match rec.record_type {
                records::BOF => {
                    if depth == 0 {
                        current = Some((rec.stream_offset, Vec::new()));
                    }
                    depth += 1;
                }
                records::EOF if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        groups.extend(current.take());
                    }
                }
                _ if depth == 1 => {
                    if let Some((_, group)) = current.as_mut() {
                        group.push(rec);
                    }
                }
                _ => {}
            }
        }

        groups
    }

    /// The substream a BOUNDSHEET points at, falling back to position when
    /// the offsets do not line up
    fn group_for<'a>(
        groups: &'a [(u64, Vec<&'a BiffRecord>)],
        info: &SheetInfo,
        worksheet_idx: usize,
    ) -> &'a [&'a BiffRecord] {
        let by_offset: HashMap<u64, usize> = groups
            .iter()
            .enumerate()
            .map(|(i, (offset, _))| (*offset, i))
            .collect();

        match by_offset.get(&(info.offset as u64)) {
            Some(&i) => &groups[i].1,
            None => {
                log::debug!(
                    "Sheet '{}' BOF offset {} not found, matching by position",
                    info.name,
                    info.offset
                );
                groups
                    .get(worksheet_idx)
                    .map(|(_, group)| group.as_slice())
                    .unwrap_or(&[])
            }
        }
    }

    fn parse_sheet(
        info: &SheetInfo,
        records: &[&BiffRecord],
        globals: &Globals,
    ) -> XlsResult<SheetData> {
        let mut sheet = SheetData::new(info.name.as_str());
        sheet.set_date_system(globals.date_system);

        // A FORMULA with a string result is followed by a STRING record
        let mut pending_string: Option<(u32, u16)> = None;

        for rec in records {
            let data = rec.data.as_slice();
            match rec.record_type {
                records::FORMULA => {
                    pending_string = Self::parse_formula(data, &mut sheet, globals)?;
                    continue;
                }
                records::STRING => {
                    if let Some((row, col)) = pending_string.take() {
                        let mut off = 0;
                        let text = read_unicode_string(data, &mut off)?;
                        if let Some(RawCell::Formula { cached, .. }) = sheet.get_mut(row, col) {
                            *cached = Some(CellValue::Text(text));
                        }
                    }
                    continue;
                }
                records::LABELSST => Self::parse_labelsst(data, &mut sheet, globals)?,
                records::LABEL => Self::parse_label(data, &mut sheet)?,
                records::NUMBER => Self::parse_number(data, &mut sheet, globals)?,
                records::RK => Self::parse_rk(data, &mut sheet, globals)?,
                records::MULRK => Self::parse_mulrk(data, &mut sheet, globals)?,
                records::BOOLERR => Self::parse_boolerr(data, &mut sheet)?,
                records::MERGECELLS => Self::parse_mergecells(data, &mut sheet)?,
                // formatted blanks carry no value
                records::BLANK | records::MULBLANK => {}
                _ => continue,
            }
            pending_string = None;
        }

        log::debug!(
            "Read sheet '{}': {} cells, {} merged regions",
            info.name,
            sheet.cell_count(),
            sheet.merged_regions().len()
        );
        Ok(sheet)
    }

    /// row(2) + col(2) + xf(2), common to every cell record
    fn cell_header(data: &[u8], off: &mut usize) -> XlsResult<(u32, u16, u16)> {
        let row = read_u16(data, off)? as u32;
        let col = read_u16(data, off)?;
        let xf = read_u16(data, off)?;
        Ok((row, col, xf))
    }

    /// LABELSST: header + sst_index(4)
    fn parse_labelsst(data: &[u8], sheet: &mut SheetData, globals: &Globals) -> XlsResult<()> {
        let mut off = 0;
        let (row, col, _) = Self::cell_header(data, &mut off)?;
        let idx = read_u32(data, &mut off)? as usize;

        match globals.sst.get(idx) {
            Some(s) => sheet.set_value(row, col, s.as_str()),
            None => log::warn!("SST index {} out of bounds at ({}, {})", idx, row, col),
        }
        Ok(())
    }

    /// LABEL: header + unicode string
    fn parse_label(data: &[u8], sheet: &mut SheetData) -> XlsResult<()> {
        let mut off = 0;
        let (row, col, _) = Self::cell_header(data, &mut off)?;
        let text = read_unicode_string(data, &mut off)?;
        sheet.set_value(row, col, text);
        Ok(())
    }

    /// NUMBER: header + f64
    fn parse_number(data: &[u8], sheet: &mut SheetData, globals: &Globals) -> XlsResult<()> {
        let mut off = 0;
        let (row, col, xf) = Self::cell_header(data, &mut off)?;
        let value = read_f64(data, &mut off)?;
        sheet.set_value(row, col, globals.number(xf, value));
        Ok(())
    }

    /// RK: header + rk(4)
    fn parse_rk(data: &[u8], sheet: &mut SheetData, globals: &Globals) -> XlsResult<()> {
        let mut off = 0;
        let (row, col, xf) = Self::cell_header(data, &mut off)?;
        let value = read_rk(data, &mut off)?;
        sheet.set_value(row, col, globals.number(xf, value));
        Ok(())
    }

    /// MULRK: row(2) + first_col(2) + [xf(2) + rk(4)]* + last_col(2)
    fn parse_mulrk(data: &[u8], sheet: &mut SheetData, globals: &Globals) -> XlsResult<()> {
        if data.len() < 6 {
            return Err(XlsError::Parse("MULRK record too short".into()));
        }
        let mut off = 0;
        let row = read_u16(data, &mut off)? as u32;
        let first_col = read_u16(data, &mut off)?;
        let end = data.len() - 2;

        let mut col = first_col;
        while off + 6 <= end {
            let xf = read_u16(data, &mut off)?;
            let value = read_rk(data, &mut off)?;
            sheet.set_value(row, col, globals.number(xf, value));
            col = col.saturating_add(1);
        }
        Ok(())
    }

    /// BOOLERR: header + value(1) + is_error(1)
    fn parse_boolerr(data: &[u8], sheet: &mut SheetData) -> XlsResult<()> {
        let mut off = 0;
        let (row, col, _) = Self::cell_header(data, &mut off)?;
        let value = read_u8(data, &mut off)?;
        let is_error = read_u8(data, &mut off)? != 0;

        if is_error {
            sheet.set(row, col, RawCell::error(error_text(value)));
        } else {
            sheet.set_value(row, col, value != 0);
        }
        Ok(())
    }

    /// FORMULA: header + result(8) + options(2) + reserved(4) + parsed
    /// expression. The expression tokens are not decoded; only the cached
    /// result is kept.
    ///
    /// Returns the cell position when a STRING record should follow.
    fn parse_formula(
        data: &[u8],
        sheet: &mut SheetData,
        globals: &Globals,
    ) -> XlsResult<Option<(u32, u16)>> {
        let mut off = 0;
        let (row, col, xf) = Self::cell_header(data, &mut off)?;
        let mut result = [0u8; 8];
        result.copy_from_slice(
            data.get(off..off + 8)
                .ok_or_else(|| XlsError::Parse("FORMULA record too short".into()))?,
        );
        skip(data, &mut off, 8)?;

        let date_formatted = globals.is_date_xf(xf);
        let formula = |cached: CellValue| RawCell::Formula {
            source: String::new(),
            cached: Some(cached),
            date_formatted,
        };

        // bytes 6-7 = 0xFFFF mark a non-numeric result, typed by byte 0
        if result[6] != 0xFF || result[7] != 0xFF {
            sheet.set(row, col, formula(CellValue::Number(f64::from_le_bytes(result))));
            return Ok(None);
        }

        match result[0] {
            0x00 => {
                sheet.set(row, col, formula(CellValue::Text(String::new())));
                return Ok(Some((row, col)));
            }
            0x01 => sheet.set(row, col, formula(CellValue::Boolean(result[2] != 0))),
            0x02 => sheet.set(row, col, RawCell::error(error_text(result[2]))),
            0x03 => sheet.set(row, col, formula(CellValue::Text(String::new()))),
            other => log::warn!(
                "Unknown FORMULA result type 0x{:02X} at ({}, {})",
                other,
                row,
                col
            ),
        }
        Ok(None)
    }

    /// MERGECELLS: count(2) + [first_row(2) + last_row(2) + first_col(2) + last_col(2)]*
    fn parse_mergecells(data: &[u8], sheet: &mut SheetData) -> XlsResult<()> {
        let mut off = 0;
        let count = read_u16(data, &mut off)?;

        for _ in 0..count {
            let first_row = read_u16(data, &mut off)? as u32;
            let last_row = read_u16(data, &mut off)? as u32;
            let first_col = read_u16(data, &mut off)?;
            let last_col = read_u16(data, &mut off)?;
            sheet.add_merged_region(CellRange::from_indices(
                first_row, first_col, last_row, last_col,
            ));
        }
        Ok(())
    }
}

/// Display text of a BIFF error code
fn error_text(code: u8) -> &'static str {
    match code {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        _ => "#VALUE!",
    }
}
