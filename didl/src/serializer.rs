// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Writing the value section of a message.

use crate::arena::{Arena, ValueId};
use crate::error::IdlError;
use crate::format::Writer;
use crate::value::{MAX_PRINCIPAL_LEN, Value};
use alloc::vec::Vec;

/// Appends wire-encoded values to a byte buffer.
///
/// Values are written by shape alone: the matching type table is the caller's responsibility
/// (see [`TypeTableBuilder`](crate::type_table::TypeTableBuilder)).
#[derive(Clone, Debug, Default)]
pub struct ValueSerializer {
    out: Writer,
}

impl ValueSerializer {
    /// Creates an empty serializer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes written so far.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.out.as_slice()
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.out.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Drops everything past the first `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.out.truncate(len);
    }

    /// Consumes the serializer and returns its bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.out.into_vec()
    }

    /// `null` occupies no bytes.
    pub fn write_null(&mut self) -> Result<(), IdlError> {
        Ok(())
    }

    /// Writes a `bool` as one byte.
    pub fn write_bool(&mut self, v: bool) -> Result<(), IdlError> {
        self.out.write_u8(u8::from(v))
    }

    /// Writes a `nat8`.
    pub fn write_nat8(&mut self, v: u8) -> Result<(), IdlError> {
        self.out.write_u8(v)
    }

    /// Writes a little-endian `nat16`.
    pub fn write_nat16(&mut self, v: u16) -> Result<(), IdlError> {
        self.out.write_bytes(&v.to_le_bytes())
    }

    /// Writes a little-endian `nat32`.
    pub fn write_nat32(&mut self, v: u32) -> Result<(), IdlError> {
        self.out.write_bytes(&v.to_le_bytes())
    }

    /// Writes a little-endian `nat64`.
    pub fn write_nat64(&mut self, v: u64) -> Result<(), IdlError> {
        self.out.write_bytes(&v.to_le_bytes())
    }

    /// Writes an `int8`.
    pub fn write_int8(&mut self, v: i8) -> Result<(), IdlError> {
        self.out.write_bytes(&v.to_le_bytes())
    }

    /// Writes a little-endian `int16`.
    pub fn write_int16(&mut self, v: i16) -> Result<(), IdlError> {
        self.out.write_bytes(&v.to_le_bytes())
    }

    /// Writes a little-endian `int32`.
    pub fn write_int32(&mut self, v: i32) -> Result<(), IdlError> {
        self.out.write_bytes(&v.to_le_bytes())
    }

    /// Writes a little-endian `int64`.
    pub fn write_int64(&mut self, v: i64) -> Result<(), IdlError> {
        self.out.write_bytes(&v.to_le_bytes())
    }

    /// Writes an IEEE-754 `float32`.
    pub fn write_float32(&mut self, v: f32) -> Result<(), IdlError> {
        self.out.write_bytes(&v.to_bits().to_le_bytes())
    }

    /// Writes an IEEE-754 `float64`.
    pub fn write_float64(&mut self, v: f64) -> Result<(), IdlError> {
        self.out.write_bytes(&v.to_bits().to_le_bytes())
    }

    /// Writes a `nat` that fits a `u64`.
    pub fn write_nat(&mut self, v: u64) -> Result<(), IdlError> {
        self.out.write_uleb128_u64(v)
    }

    /// Writes an `int` that fits an `i64`.
    pub fn write_int(&mut self, v: i64) -> Result<(), IdlError> {
        self.out.write_sleb128_i64(v)
    }

    /// Writes pre-encoded LEB128 bytes of a `nat` or `int` verbatim.
    pub fn write_leb_raw(&mut self, bytes: &[u8]) -> Result<(), IdlError> {
        self.out.write_bytes(bytes)
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_text(&mut self, s: &str) -> Result<(), IdlError> {
        self.write_blob(s.as_bytes())
    }

    /// Writes a length-prefixed byte string (`vec nat8`).
    pub fn write_blob(&mut self, bytes: &[u8]) -> Result<(), IdlError> {
        self.out.write_len(bytes.len())?;
        self.out.write_bytes(bytes)
    }

    /// Writes a principal: flag `1`, then the length-prefixed bytes.
    pub fn write_principal(&mut self, bytes: &[u8]) -> Result<(), IdlError> {
        if bytes.len() > MAX_PRINCIPAL_LEN {
            return Err(IdlError::InvalidArgument);
        }
        self.out.write_u8(1)?;
        self.write_blob(bytes)
    }

    /// Writes the presence flag of an `opt`; a present value must follow.
    pub fn write_opt_tag(&mut self, present: bool) -> Result<(), IdlError> {
        self.out.write_u8(u8::from(present))
    }

    /// Writes the element count of a `vec`; the elements must follow.
    pub fn write_vec_len(&mut self, len: usize) -> Result<(), IdlError> {
        self.out.write_len(len)
    }

    /// Writes the active-field index of a variant; the field value must follow.
    pub fn write_variant_index(&mut self, index: u64) -> Result<(), IdlError> {
        self.out.write_uleb128_u64(index)
    }

    /// Writes a service reference.
    pub fn write_service(&mut self, principal: &[u8]) -> Result<(), IdlError> {
        self.write_principal(principal)
    }

    /// Writes a function reference: flag `1`, the service reference, then the method name.
    pub fn write_func(&mut self, principal: &[u8], method: &str) -> Result<(), IdlError> {
        self.out.write_u8(1)?;
        self.write_service(principal)?;
        self.write_text(method)
    }

    /// Writes any value, recursing through composites.
    pub fn write_value(&mut self, arena: &Arena, value: ValueId) -> Result<(), IdlError> {
        match arena.value(value)? {
            Value::Null | Value::Reserved => self.write_null(),
            Value::Bool(v) => self.write_bool(*v),
            Value::Nat(span) | Value::Int(span) => self.write_leb_raw(arena.bytes(*span)?),
            Value::Nat8(v) => self.write_nat8(*v),
            Value::Nat16(v) => self.write_nat16(*v),
            Value::Nat32(v) => self.write_nat32(*v),
            Value::Nat64(v) => self.write_nat64(*v),
            Value::Int8(v) => self.write_int8(*v),
            Value::Int16(v) => self.write_int16(*v),
            Value::Int32(v) => self.write_int32(*v),
            Value::Int64(v) => self.write_int64(*v),
            Value::Float32(v) => self.write_float32(*v),
            Value::Float64(v) => self.write_float64(*v),
            Value::Text(span) => self.write_text(arena.str(*span)?),
            Value::Blob(span) => self.write_blob(arena.bytes(*span)?),
            Value::Principal(span) => self.write_principal(arena.bytes(*span)?),
            Value::Service(span) => self.write_service(arena.bytes(*span)?),
            Value::Func { service, method } => {
                self.write_func(arena.bytes(*service)?, arena.str(*method)?)
            }
            Value::Opt(inner) => {
                self.write_opt_tag(inner.is_some())?;
                match inner {
                    Some(v) => self.write_value(arena, *v),
                    None => Ok(()),
                }
            }
            Value::Vec(items) => {
                self.write_vec_len(items.len())?;
                for &item in items {
                    self.write_value(arena, item)?;
                }
                Ok(())
            }
            Value::Record(fields) => {
                for f in fields {
                    self.write_value(arena, f.value)?;
                }
                Ok(())
            }
            Value::Variant { index, field } => {
                self.write_variant_index(*index)?;
                self.write_value(arena, field.value)
            }
        }
    }
}
