//! BIFF8 Unicode strings.
//!
//! A string is a character count (u8 or u16), a flags byte, optional rich
//! run count (u16, flag 0x08) and extension size (u32, flag 0x04), the
//! characters, then the skipped run and extension data. Flag 0x01 selects
//! UTF-16LE; otherwise each character is one Latin-1 byte.
//!
//! Inside the SST a string may cross a CONTINUE boundary. The continuation
//! then starts with a new flags byte whose 0x01 bit governs the rest of the
//! characters.

use super::parser::{read_u16, read_u32, read_u8, skip};
use crate::error::{XlsError, XlsResult};

const FLAG_WIDE: u8 = 0x01;
const FLAG_EXT: u8 = 0x04;
const FLAG_RICH: u8 = 0x08;

/// String header fields that follow the character count
struct StringHeader {
    chars: usize,
    wide: bool,
    trailing_bytes: usize,
}

impl StringHeader {
    fn read(data: &[u8], offset: &mut usize, chars: usize) -> XlsResult<Self> {
        let flags = read_u8(data, offset)?;
        let runs = if flags & FLAG_RICH != 0 {
            read_u16(data, offset)? as usize
        } else {
            0
        };
        let ext = if flags & FLAG_EXT != 0 {
            read_u32(data, offset)? as usize
        } else {
            0
        };
        Ok(Self {
            chars,
            wide: flags & FLAG_WIDE != 0,
            trailing_bytes: runs * 4 + ext,
        })
    }
}

/// String with a 1-byte character count (BOUNDSHEET names)
pub fn read_short_string(data: &[u8], offset: &mut usize) -> XlsResult<String> {
    let chars = read_u8(data, offset)? as usize;
    let header = StringHeader::read(data, offset, chars)?;
    read_characters(data, offset, header, &[])
}

/// String with a 2-byte character count (LABEL, STRING, FORMAT)
pub fn read_unicode_string(data: &[u8], offset: &mut usize) -> XlsResult<String> {
    read_continued_string(data, offset, &[])
}

/// Like [`read_unicode_string`], honoring CONTINUE boundaries at
/// `continue_offsets`
pub fn read_continued_string(
    data: &[u8],
    offset: &mut usize,
    continue_offsets: &[usize],
) -> XlsResult<String> {
    let chars = read_u16(data, offset)? as usize;
    let header = StringHeader::read(data, offset, chars)?;
    read_characters(data, offset, header, continue_offsets)
}

fn read_characters(
    data: &[u8],
    offset: &mut usize,
    header: StringHeader,
    continue_offsets: &[usize],
) -> XlsResult<String> {
    let mut units: Vec<u16> = Vec::with_capacity(header.chars);
    let mut remaining = header.chars;
    let mut wide = header.wide;

    loop {
        let limit = continue_offsets
            .iter()
            .copied()
            .find(|b| *b > *offset)
            .unwrap_or(data.len());
        let width = if wide { 2 } else { 1 };
        let count = ((limit - (*offset).min(limit)) / width).min(remaining);

        let bytes = &data[*offset..*offset + count * width];
        if wide {
            units.extend(
                bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
            );
        } else {
            units.extend(bytes.iter().map(|&b| b as u16));
        }
        *offset += count * width;
        remaining -= count;

        if remaining == 0 {
            break;
        }
        if *offset != limit || limit >= data.len() {
            return Err(XlsError::Parse(format!(
                "string data truncated at offset {}, {} characters missing",
                *offset, remaining
            )));
        }
        // continuation restarts with its own flags byte
        wide = read_u8(data, offset)? & FLAG_WIDE != 0;
    }

    skip(data, offset, header.trailing_bytes)?;
    String::from_utf16(&units).map_err(|e| XlsError::Parse(format!("invalid UTF-16 string: {e}")))
}

/// Parse the Shared String Table: total reference count (u32), unique
/// count (u32), then the strings. A malformed tail is logged and dropped.
pub fn parse_sst(data: &[u8], continue_offsets: &[usize]) -> XlsResult<Vec<String>> {
    let mut offset = 0;
    let _total = read_u32(data, &mut offset)?;
    let unique = read_u32(data, &mut offset)? as usize;

    let mut strings = Vec::with_capacity(unique.min(u16::MAX as usize));
    for i in 0..unique {
        match read_continued_string(data, &mut offset, continue_offsets) {
            Ok(s) => strings.push(s),
            Err(e) => {
                log::warn!("SST parse error at string {i}/{unique}: {e}");
                break;
            }
        }
    }

    Ok(strings)
}
