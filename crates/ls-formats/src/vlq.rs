//! Variable-length quantities: big-endian base-128, high bit marks continuation.

use std::io::Write;

use crate::FormatError;

/// Largest value representable in the four bytes SMF allows.
pub const MAX_VLQ: u32 = 0x0FFF_FFFF;

pub fn write_vlq(w: &mut impl Write, value: u32) -> Result<(), FormatError> {
    if value > MAX_VLQ {
        return Err(FormatError::VlqOverflow);
    }
    let mut buf = [0u8; 4];
    let mut start = 3;
    buf[3] = (value & 0x7F) as u8;
    let mut rest = value >> 7;
    while rest > 0 {
        start -= 1;
        buf[start] = (rest & 0x7F) as u8 | 0x80;
        rest >>= 7;
    }
    w.write_all(&buf[start..])?;
    Ok(())
}

/// Read a quantity starting at `*pos`, advancing past it.
pub fn read_vlq(bytes: &[u8], pos: &mut usize) -> Result<u32, FormatError> {
    let mut value: u32 = 0;
    for _ in 0..4 {
        let byte = *bytes.get(*pos).ok_or(FormatError::UnexpectedEof)?;
        *pos += 1;
        value = (value << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(FormatError::VlqOverflow)
}
