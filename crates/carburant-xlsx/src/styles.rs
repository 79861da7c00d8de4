//! `xl/styles.xml`: which cell formats display numbers as dates

use std::collections::HashMap;
use std::io::{BufReader, Read};

use carburant_core::NumberFormat;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};

/// Date flag per `cellXfs` index (the `s` attribute of a cell)
#[derive(Debug, Clone, Default)]
pub(crate) struct DateStyles(Vec<bool>);

impl DateStyles {
    pub(crate) fn is_date(&self, style: Option<usize>) -> bool {
        style
            .and_then(|idx| self.0.get(idx))
            .copied()
            .unwrap_or(false)
    }
}

pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<DateStyles> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut custom_formats: HashMap<u32, String> = HashMap::new();
    let mut xf_format_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"numFmt" => {
                    let id = attr_value(&e, b"numFmtId").and_then(|s| s.parse().ok());
                    let code = attr_value(&e, b"formatCode");
                    if let (Some(id), Some(code)) = (id, code) {
                        custom_formats.insert(id, code);
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let id = attr_value(&e, b"numFmtId")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);
                    xf_format_ids.push(id);
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    let flags = xf_format_ids
        .into_iter()
        .map(|id| {
            NumberFormat::resolve(id, custom_formats.get(&id).map(String::as_str)).is_date_format()
        })
        .collect::<Vec<_>>();
    log::debug!(
        "Read {} cell formats ({} date formats)",
        flags.len(),
        flags.iter().filter(|f| **f).count()
    );
    Ok(DateStyles(flags))
}

pub(crate) fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_styles() {
        let xml = br##"<?xml version="1.0"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="2">
    <numFmt numFmtId="164" formatCode="mmmm\ yyyy"/>
    <numFmt numFmtId="165" formatCode="#,##0.000&quot; DT&quot;"/>
  </numFmts>
  <cellStyleXfs count="1"><xf numFmtId="14"/></cellStyleXfs>
  <cellXfs count="5">
    <xf numFmtId="0"/>
    <xf numFmtId="164" applyNumberFormat="1"/>
    <xf numFmtId="165" applyNumberFormat="1"/>
    <xf numFmtId="14" applyNumberFormat="1"/>
    <xf numFmtId="4"/>
  </cellXfs>
</styleSheet>"##;

        let styles = read_styles_xml(&xml[..]).unwrap();
        assert!(!styles.is_date(Some(0)));
        assert!(styles.is_date(Some(1)));
        assert!(!styles.is_date(Some(2)));
        assert!(styles.is_date(Some(3)));
        assert!(!styles.is_date(Some(4)));
        assert!(!styles.is_date(Some(99)));
        assert!(!styles.is_date(None));
    }
}
