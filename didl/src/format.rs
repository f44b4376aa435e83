// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Byte-level primitives for the DIDL wire format.

mod leb128;

pub use leb128::{
    decode_sleb128, decode_uleb128, encode_sleb128, encode_uleb128, read_sleb128_i64,
    read_uleb128_u64, scan_leb128, write_sleb128_i64, write_uleb128_u64,
};

use crate::error::IdlError;
use alloc::vec::Vec;

/// Magic bytes that open every message.
pub const MAGIC: [u8; 4] = *b"DIDL";

/// A simple byte reader with bounds checks.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader over `bytes`.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Creates a reader over `bytes` positioned at `offset`.
    #[must_use]
    pub fn at(bytes: &'a [u8], offset: usize) -> Self {
        Self { bytes, offset }
    }

    /// Returns the current cursor offset.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], IdlError> {
        let end = self.offset.checked_add(len).ok_or(IdlError::Truncated)?;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(IdlError::Truncated)?;
        self.offset = end;
        Ok(slice)
    }

    /// Reads a `u8`.
    pub fn read_u8(&mut self) -> Result<u8, IdlError> {
        Ok(self.take(1)?[0])
    }

    /// Reads exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], IdlError> {
        let mut out = [0_u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads an unsigned LEB128 integer as `u64`.
    pub fn read_uleb128_u64(&mut self) -> Result<u64, IdlError> {
        read_uleb128_u64(self.bytes, &mut self.offset)
    }

    /// Reads an unsigned LEB128 length and checks it fits in `usize`.
    pub fn read_len(&mut self) -> Result<usize, IdlError> {
        let v = self.read_uleb128_u64()?;
        usize::try_from(v).map_err(|_| IdlError::Overflow)
    }

    /// Reads a signed LEB128 integer as `i64`.
    pub fn read_sleb128_i64(&mut self) -> Result<i64, IdlError> {
        read_sleb128_i64(self.bytes, &mut self.offset)
    }

    /// Reads the raw bytes of one LEB128 number of any width.
    pub fn read_leb128_raw(&mut self) -> Result<&'a [u8], IdlError> {
        let rest = self.bytes.get(self.offset..).ok_or(IdlError::Truncated)?;
        let len = scan_leb128(rest)?;
        self.take(len)
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], IdlError> {
        self.take(len)
    }

    /// Skips `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<(), IdlError> {
        self.take(len).map(|_| ())
    }
}

/// An append-only byte writer.
///
/// Growth is geometric (delegated to `Vec`), and allocation failure surfaces as
/// [`IdlError::Alloc`] rather than aborting.
#[derive(Clone, Debug, Default)]
pub struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Returns a reference to the written bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Drops everything past the first `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// Consumes the writer and returns the underlying byte buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    /// Appends a `u8`.
    pub fn write_u8(&mut self, v: u8) -> Result<(), IdlError> {
        self.bytes.try_reserve(1)?;
        self.bytes.push(v);
        Ok(())
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), IdlError> {
        self.bytes.try_reserve(bytes.len())?;
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    /// Appends an unsigned LEB128 integer.
    pub fn write_uleb128_u64(&mut self, v: u64) -> Result<(), IdlError> {
        let mut buf = [0_u8; 10];
        let n = encode_uleb128(v, &mut buf)?;
        self.write_bytes(&buf[..n])
    }

    /// Appends a signed LEB128 integer.
    pub fn write_sleb128_i64(&mut self, v: i64) -> Result<(), IdlError> {
        let mut buf = [0_u8; 10];
        let n = encode_sleb128(v, &mut buf)?;
        self.write_bytes(&buf[..n])
    }

    /// Appends a length as unsigned LEB128.
    pub fn write_len(&mut self, len: usize) -> Result<(), IdlError> {
        let len = u64::try_from(len).map_err(|_| IdlError::Overflow)?;
        self.write_uleb128_u64(len)
    }
}
