//! Little-endian readers over record bodies. Each reader advances `offset`.

use crate::error::{XlsError, XlsResult};

fn take<'a>(data: &'a [u8], offset: &mut usize, len: usize) -> XlsResult<&'a [u8]> {
    let end = offset.checked_add(len).filter(|end| *end <= data.len());
    match end {
        Some(end) => {
            let bytes = &data[*offset..end];
            *offset = end;
            Ok(bytes)
        }
        None => Err(XlsError::Parse(format!(
            "unexpected end of data at offset {}, need {} bytes",
            *offset, len
        ))),
    }
}

#[inline]
pub fn read_u8(data: &[u8], offset: &mut usize) -> XlsResult<u8> {
    Ok(take(data, offset, 1)?[0])
}

#[inline]
pub fn read_u16(data: &[u8], offset: &mut usize) -> XlsResult<u16> {
    let b = take(data, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

#[inline]
pub fn read_u32(data: &[u8], offset: &mut usize) -> XlsResult<u32> {
    let b = take(data, offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[inline]
pub fn read_f64(data: &[u8], offset: &mut usize) -> XlsResult<f64> {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(take(data, offset, 8)?);
    Ok(f64::from_le_bytes(bytes))
}

/// Skip `len` bytes
#[inline]
pub fn skip(data: &[u8], offset: &mut usize, len: usize) -> XlsResult<()> {
    take(data, offset, len).map(|_| ())
}

/// Decode an RK-encoded number.
///
/// Bit 0 set: divide by 100. Bit 1 set: bits 2..31 are a signed 30-bit
/// integer; clear: they are the upper 30 bits of an IEEE double whose low
/// 34 bits are zero.
#[inline]
pub fn decode_rk(rk: u32) -> f64 {
    let value = if rk & 0x02 != 0 {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk & 0xFFFF_FFFC) as u64) << 32)
    };

    if rk & 0x01 != 0 {
        value / 100.0
    } else {
        value
    }
}

#[inline]
pub fn read_rk(data: &[u8], offset: &mut usize) -> XlsResult<f64> {
    read_u32(data, offset).map(decode_rk)
}
