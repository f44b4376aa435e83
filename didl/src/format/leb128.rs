// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::error::IdlError;
use alloc::vec::Vec;

const CONTINUATION: u8 = 0x80;
const SIGN_BIT: u8 = 0x40;

/// Decodes an unsigned LEB128 integer from the start of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_uleb128(bytes: &[u8]) -> Result<(u64, usize), IdlError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let chunk = u64::from(b & 0x7f);
        if shift >= 64 {
            if chunk != 0 {
                return Err(IdlError::Overflow);
            }
        } else {
            let shifted = chunk << shift;
            if (shifted >> shift) != chunk {
                return Err(IdlError::Overflow);
            }
            value |= shifted;
        }
        if (b & CONTINUATION) == 0 {
            return Ok((value, i + 1));
        }
        shift = shift.saturating_add(7);
    }
    Err(IdlError::Truncated)
}

/// Decodes a signed LEB128 integer from the start of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_sleb128(bytes: &[u8]) -> Result<(i64, usize), IdlError> {
    let mut value: i128 = 0;
    let mut shift: u32 = 0;
    let mut last: u8 = CONTINUATION;
    let mut consumed = 0;

    for &b in bytes {
        // Past 64 bits only pure sign-extension bytes are acceptable, and those end the number.
        if shift >= 64 && b != 0x00 && b != 0x7f {
            return Err(IdlError::Overflow);
        }
        last = b;
        consumed += 1;
        value |= i128::from(b & 0x7f) << shift;
        shift += 7;
        if (b & CONTINUATION) == 0 {
            break;
        }
    }

    if (last & CONTINUATION) != 0 {
        return Err(IdlError::Truncated);
    }
    if (last & SIGN_BIT) != 0 && shift < 128 {
        value |= -(1_i128 << shift);
    }
    let value = i64::try_from(value).map_err(|_| IdlError::Overflow)?;
    Ok((value, consumed))
}

/// Returns the byte length of a well-formed LEB128 number of any magnitude.
///
/// Used for arbitrary-precision `nat`/`int`, which are kept as raw bytes.
pub fn scan_leb128(bytes: &[u8]) -> Result<usize, IdlError> {
    bytes
        .iter()
        .position(|b| (b & CONTINUATION) == 0)
        .map(|i| i + 1)
        .ok_or(IdlError::Truncated)
}

/// Encodes `value` as unsigned LEB128 into `out`, returning the number of bytes written.
///
/// Fails with [`IdlError::Overflow`] if `out` is too small.
pub fn encode_uleb128(mut value: u64, out: &mut [u8]) -> Result<usize, IdlError> {
    let mut n = 0;
    loop {
        let slot = out.get_mut(n).ok_or(IdlError::Overflow)?;
        let mut b = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            b |= CONTINUATION;
        }
        *slot = b;
        n += 1;
        if value == 0 {
            return Ok(n);
        }
    }
}

/// Encodes `value` as signed LEB128 into `out`, returning the number of bytes written.
///
/// Fails with [`IdlError::Overflow`] if `out` is too small.
pub fn encode_sleb128(mut value: i64, out: &mut [u8]) -> Result<usize, IdlError> {
    let mut n = 0;
    loop {
        let slot = out.get_mut(n).ok_or(IdlError::Overflow)?;
        let b = (value & 0x7f) as u8;
        value >>= 6;
        n += 1;
        if value == 0 || value == -1 {
            *slot = b;
            return Ok(n);
        }
        value >>= 1;
        *slot = b | CONTINUATION;
    }
}

/// Reads an unsigned LEB128 integer as `u64`, updating `offset`.
pub fn read_uleb128_u64(bytes: &[u8], offset: &mut usize) -> Result<u64, IdlError> {
    let rest = bytes.get(*offset..).ok_or(IdlError::Truncated)?;
    let (value, n) = decode_uleb128(rest)?;
    *offset += n;
    Ok(value)
}

/// Reads a signed LEB128 integer as `i64`, updating `offset`.
pub fn read_sleb128_i64(bytes: &[u8], offset: &mut usize) -> Result<i64, IdlError> {
    let rest = bytes.get(*offset..).ok_or(IdlError::Truncated)?;
    let (value, n) = decode_sleb128(rest)?;
    *offset += n;
    Ok(value)
}

/// Writes an unsigned LEB128 integer.
pub fn write_uleb128_u64(out: &mut Vec<u8>, value: u64) {
    let mut buf = [0_u8; 10];
    if let Ok(n) = encode_uleb128(value, &mut buf) {
        out.extend_from_slice(&buf[..n]);
    }
}

/// Writes a signed LEB128 integer.
pub fn write_sleb128_i64(out: &mut Vec<u8>, value: i64) {
    let mut buf = [0_u8; 10];
    if let Ok(n) = encode_sleb128(value, &mut buf) {
        out.extend_from_slice(&buf[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uleb128_roundtrip() {
        let values = [0, 1, 2, 127, 128, 129, 16_384, u64::MAX];
        for &v in &values {
            let mut buf = Vec::new();
            write_uleb128_u64(&mut buf, v);
            let (back, n) = decode_uleb128(&buf).unwrap();
            assert_eq!(back, v);
            assert_eq!(n, buf.len());
        }
    }

    #[test]
    fn sleb128_roundtrip() {
        let values = [0, 1, -1, 63, 64, -64, -65, i64::MIN, i64::MAX];
        for &v in &values {
            let mut buf = Vec::new();
            write_sleb128_i64(&mut buf, v);
            let (back, n) = decode_sleb128(&buf).unwrap();
            assert_eq!(back, v);
            assert_eq!(n, buf.len());
        }
    }

    #[test]
    fn known_encodings() {
        let mut buf = [0_u8; 10];
        assert_eq!(encode_uleb128(624_485, &mut buf), Ok(3));
        assert_eq!(&buf[..3], &[0xe5, 0x8e, 0x26]);
        assert_eq!(encode_sleb128(-123_456, &mut buf), Ok(3));
        assert_eq!(&buf[..3], &[0xc0, 0xbb, 0x78]);
        assert_eq!(encode_sleb128(42, &mut buf), Ok(1));
        assert_eq!(buf[0], 0x2a);
    }

    #[test]
    fn encode_into_short_buffer_overflows() {
        let mut buf = [0_u8; 1];
        assert_eq!(encode_uleb128(300, &mut buf), Err(IdlError::Overflow));
        assert_eq!(encode_sleb128(-300, &mut buf), Err(IdlError::Overflow));
        let mut empty: [u8; 0] = [];
        assert_eq!(encode_uleb128(0, &mut empty), Err(IdlError::Overflow));
    }

    #[test]
    fn uleb128_accepts_non_canonical_zero() {
        let buf = [0x80, 0x00];
        assert_eq!(decode_uleb128(&buf), Ok((0, 2)));
    }

    #[test]
    fn uleb128_rejects_overlong_input() {
        let mut buf = [0xff_u8; 11];
        buf[10] = 0x02;
        assert_eq!(decode_uleb128(&buf), Err(IdlError::Overflow));
    }

    #[test]
    fn uleb128_rejects_bits_past_u64() {
        let buf = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x02];
        assert_eq!(decode_uleb128(&buf), Err(IdlError::Overflow));
    }

    #[test]
    fn truncated_inputs() {
        assert_eq!(decode_uleb128(&[]), Err(IdlError::Truncated));
        assert_eq!(decode_uleb128(&[0x80, 0x80]), Err(IdlError::Truncated));
        assert_eq!(decode_sleb128(&[0xff]), Err(IdlError::Truncated));
        assert_eq!(decode_sleb128(&[]), Err(IdlError::Truncated));
        assert_eq!(scan_leb128(&[0x81, 0x81]), Err(IdlError::Truncated));
    }

    #[test]
    fn sleb128_accepts_non_canonical_zero() {
        assert_eq!(decode_sleb128(&[0x80, 0x00]), Ok((0, 2)));
    }

    #[test]
    fn sleb128_rejects_out_of_range() {
        // 2^63 does not fit in i64.
        let buf = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert_eq!(decode_sleb128(&buf), Err(IdlError::Overflow));
        let buf = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert_eq!(decode_sleb128(&buf), Err(IdlError::Overflow));
    }

    #[test]
    fn scan_handles_wide_numbers() {
        let mut buf = [0xff_u8; 20];
        buf[19] = 0x01;
        assert_eq!(scan_leb128(&buf), Ok(20));
        assert_eq!(scan_leb128(&[0x05, 0xaa]), Ok(1));
    }

    #[test]
    fn offset_readers_advance() {
        let buf = [0x2a, 0x7f, 0xe5, 0x8e, 0x26];
        let mut off = 0;
        assert_eq!(read_uleb128_u64(&buf, &mut off), Ok(42));
        assert_eq!(read_sleb128_i64(&buf, &mut off), Ok(-1));
        assert_eq!(read_uleb128_u64(&buf, &mut off), Ok(624_485));
        assert_eq!(off, buf.len());
        assert_eq!(read_uleb128_u64(&buf, &mut off), Err(IdlError::Truncated));
    }
}
