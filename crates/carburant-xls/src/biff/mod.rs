//! BIFF8 (Binary Interchange File Format) record stream.
//!
//! A BIFF8 stream is a sequence of records, each a 4-byte header (record
//! type, body length; both u16) followed by the body. CONTINUE records
//! (0x003C) extend the previous record past the 8224-byte body limit.

pub mod parser;
pub mod records;
pub mod strings;

use std::io::{ErrorKind, Read, Seek};

use crate::error::{XlsError, XlsResult};

/// A single BIFF8 record with its CONTINUE bodies appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiffRecord {
    pub record_type: u16,
    pub data: Vec<u8>,
    /// Offsets into `data` where each CONTINUE body starts. String
    /// decoding needs them: a string split across a boundary restarts
    /// with a fresh flags byte.
    pub continue_offsets: Vec<usize>,
    /// Byte offset of the record header in the stream
    pub stream_offset: u64,
}

/// Read every record of a stream, merging CONTINUE records into their
/// parent. An orphaned CONTINUE is dropped.
pub fn read_all_records<R: Read + Seek>(stream: &mut R) -> XlsResult<Vec<BiffRecord>> {
    let mut records: Vec<BiffRecord> = Vec::new();
    let mut header = [0u8; 4];

    loop {
        let stream_offset = stream.stream_position()?;
        match stream.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(XlsError::Io(e)),
        }

        let record_type = u16::from_le_bytes([header[0], header[1]]);
        let body_len = u16::from_le_bytes([header[2], header[3]]) as usize;

        let mut body = vec![0u8; body_len];
        stream.read_exact(&mut body)?;

        match (record_type, records.last_mut()) {
            (records::CONTINUE, Some(parent)) => {
                parent.continue_offsets.push(parent.data.len());
                parent.data.extend_from_slice(&body);
            }
            (records::CONTINUE, None) => {
                log::warn!("Dropping CONTINUE record at offset {}", stream_offset)
            }
            _ => records.push(BiffRecord {
                record_type,
                data: body,
                continue_offsets: Vec::new(),
                stream_offset,
            }),
        }
    }

    Ok(records)
}

/// Version and substream type of a BOF record body
pub fn parse_bof(data: &[u8]) -> XlsResult<(u16, u16)> {
    let mut off = 0;
    let version = parser::read_u16(data, &mut off)
        .map_err(|_| XlsError::InvalidFormat("BOF record too short".into()))?;
    let dt = parser::read_u16(data, &mut off)
        .map_err(|_| XlsError::InvalidFormat("BOF record too short".into()))?;
    Ok((version, dt))
}
