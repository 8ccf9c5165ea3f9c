//! Modified UTF-8, the string encoding of `CONSTANT_Utf8_info`.
//!
//! It differs from standard UTF-8 in two ways: U+0000 is written as the two
//! bytes `C0 80`, and characters outside the BMP are written as their UTF-16
//! surrogate pair, each half encoded on its own in three bytes.

use crate::{buffer::ByteArray, ClassFileError, Result};

/// Appends the modified UTF-8 form of `value` to `out` and returns the number
/// of bytes written. No length prefix is written.
///
/// The common all-ASCII case is copied byte for byte. The first NUL or
/// non-ASCII byte switches to the slow path, which reserves the worst case for
/// the rest of the string up front.
pub fn encode(value: &str, out: &mut ByteArray) -> usize {
    let start = out.len();
    let bytes = value.as_bytes();
    out.ensure_free(bytes.len());

    let data = out.raw_mut();
    for (i, &b) in bytes.iter().enumerate() {
        if b == 0 || b >= 0x80 {
            let rest = &value[i..];
            // A NUL doubles in size, nothing else grows faster.
            out.ensure_free(2 * rest.len());
            encode_units(rest, out.raw_mut());
            return out.len() - start;
        }
        data.push(b);
    }

    out.len() - start
}

fn encode_units(value: &str, data: &mut Vec<u8>) {
    for unit in value.encode_utf16() {
        if unit >= 0x800 {
            data.push(0xE0 | (unit >> 12 & 0x0F) as u8);
            data.push(0x80 | (unit >> 6 & 0x3F) as u8);
            data.push(0x80 | (unit & 0x3F) as u8);
        } else if unit >= 0x80 || unit == 0 {
            data.push(0xC0 | (unit >> 6 & 0x1F) as u8);
            data.push(0x80 | (unit & 0x3F) as u8);
        } else {
            data.push(unit as u8);
        }
    }
}

/// Number of bytes [`encode`] would write for `value`.
pub fn encoded_len(value: &str) -> usize {
    value
        .encode_utf16()
        .map(|unit| match unit {
            0 => 2,
            0x01..=0x7F => 1,
            0x80..=0x7FF => 2,
            _ => 3,
        })
        .sum()
}

/// Decodes trusted modified UTF-8.
///
/// Continuation bytes are not checked. Malformed input yields unspecified
/// characters rather than an error, and unpaired surrogates become U+FFFD.
/// `scratch` is reused across calls and keeps the capacity of the longest
/// string seen so far.
pub fn decode(bytes: &[u8], scratch: &mut Vec<u16>) -> String {
    let Some(first) = bytes.iter().position(|b| b & 0x80 != 0) else {
        return String::from_utf8_lossy(bytes).into_owned();
    };

    scratch.clear();
    scratch.reserve(bytes.len());
    scratch.extend(bytes[..first].iter().map(|&b| b as u16));

    let continuation = |i: usize| bytes.get(i).map_or(0, |b| (b & 0x3F) as u16);
    let mut i = first;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            scratch.push(b as u16);
            i += 1;
        } else if b & 0x20 != 0 {
            scratch.push((b as u16 & 0x0F) << 12 | continuation(i + 1) << 6 | continuation(i + 2));
            i += 3;
        } else {
            scratch.push((b as u16 & 0x1F) << 6 | continuation(i + 1));
            i += 2;
        }
    }

    String::from_utf16_lossy(scratch)
}

/// Decodes modified UTF-8, rejecting raw NUL bytes, bad lead or continuation
/// bytes, truncated sequences and unpaired surrogates.
pub fn decode_checked(bytes: &[u8], scratch: &mut Vec<u16>) -> Result<String> {
    scratch.clear();
    scratch.reserve(bytes.len());

    let continuation = |i: usize| match bytes.get(i) {
        Some(b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
        _ => Err(ClassFileError::MalformedUtf8 { offset: i }),
    };
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            0x01..=0x7F => {
                scratch.push(b as u16);
                i += 1;
            }
            0xC0..=0xDF => {
                scratch.push((b as u16 & 0x1F) << 6 | continuation(i + 1)?);
                i += 2;
            }
            0xE0..=0xEF => {
                scratch.push((b as u16 & 0x0F) << 12 | continuation(i + 1)? << 6 | continuation(i + 2)?);
                i += 3;
            }
            _ => return Err(ClassFileError::MalformedUtf8 { offset: i }),
        }
    }

    String::from_utf16(scratch).map_err(|_| ClassFileError::UnpairedSurrogate)
}
