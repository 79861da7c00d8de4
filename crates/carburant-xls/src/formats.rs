//! FORMAT and XF records: which XF indexes display numbers as dates

use std::collections::HashMap;

use carburant_core::NumberFormat;

use crate::biff::parser::{read_u16, skip};
use crate::biff::strings::read_unicode_string;
use crate::error::XlsResult;

/// Collects FORMAT and XF records from the globals substream
#[derive(Debug, Default)]
pub(crate) struct FormatTable {
    custom: HashMap<u16, String>,
    xf_formats: Vec<u16>,
}

impl FormatTable {
    /// FORMAT: ifmt(2) + unicode string
    pub(crate) fn add_format(&mut self, data: &[u8]) -> XlsResult<()> {
        let mut off = 0;
        let id = read_u16(data, &mut off)?;
        let code = read_unicode_string(data, &mut off)?;
        self.custom.insert(id, code);
        Ok(())
    }

    /// XF: ifnt(2) + ifmt(2) + 16 bytes of layout we do not need
    pub(crate) fn add_xf(&mut self, data: &[u8]) -> XlsResult<()> {
        let mut off = 0;
        skip(data, &mut off, 2)?;
        let ifmt = read_u16(data, &mut off)?;
        self.xf_formats.push(ifmt);
        Ok(())
    }

    /// Date flag per XF index
    pub(crate) fn date_flags(&self) -> Vec<bool> {
        self.xf_formats
            .iter()
            .map(|id| {
                NumberFormat::resolve(*id as u32, self.custom.get(id).map(String::as_str))
                    .is_date_format()
            })
            .collect()
    }
}
