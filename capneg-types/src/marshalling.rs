//! 7-bit-safe integer encoding for message payloads.
//!
//! Every payload byte must keep its high bit clear, so a `u16` is written as
//! three 7-bit groups, least significant first.

/// Append `value` as three 7-bit bytes.
pub fn write_u16(out: &mut Vec<u8>, value: u16) {
    out.push((value & 0x7f) as u8);
    out.push(((value >> 7) & 0x7f) as u8);
    out.push(((value >> 14) & 0x7f) as u8);
}

/// Read a `u16` written by [`write_u16`], returning the rest of the slice.
pub fn read_u16(bytes: &[u8]) -> Option<(u16, &[u8])> {
    if bytes.len() < 3 || bytes[..3].iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    let value = u16::from(bytes[0]) | (u16::from(bytes[1]) << 7) | (u16::from(bytes[2]) << 14);
    Some((value, &bytes[3..]))
}

/// Details payload: the active count followed by the supported count.
pub fn write_details(active: u16, supported: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(6);
    write_u16(&mut out, active);
    write_u16(&mut out, supported);
    out
}

/// Inverse of [`write_details`], returning `(active, supported)`.
pub fn read_details(bytes: &[u8]) -> Option<(u16, u16)> {
    let (active, rest) = read_u16(bytes)?;
    let (supported, _) = read_u16(rest)?;
    Some((active, supported))
}
