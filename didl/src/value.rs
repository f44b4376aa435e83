// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The runtime value model.
//!
//! Values mirror the composite shapes of [`Type`](crate::types::Type). Payload-carrying values
//! (text, blob, principal, bignums) hold [`ByteSpan`]s into the arena's byte region, so the
//! caller's buffers never need to outlive construction.

use crate::arena::{Arena, ByteSpan, ValueId};
use crate::error::IdlError;
use crate::format::{
    decode_sleb128, decode_uleb128, scan_leb128, write_sleb128_i64, write_uleb128_u64,
};
use crate::types::Label;
use alloc::vec::Vec;

/// Longest principal accepted by the codec.
pub const MAX_PRINCIPAL_LEN: usize = 29;

/// A record or variant field value.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueField {
    /// Field label.
    pub label: Label,
    /// Field value.
    pub value: ValueId,
}

impl ValueField {
    /// Creates a field value.
    #[must_use]
    pub fn new(label: impl Into<Label>, value: ValueId) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// An IDL value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// `null`
    Null,
    /// `bool`
    Bool(bool),
    /// Arbitrary-precision `nat`, as raw unsigned LEB128 bytes.
    Nat(ByteSpan),
    /// Arbitrary-precision `int`, as raw signed LEB128 bytes.
    Int(ByteSpan),
    /// `nat8`
    Nat8(u8),
    /// `nat16`
    Nat16(u16),
    /// `nat32`
    Nat32(u32),
    /// `nat64`
    Nat64(u64),
    /// `int8`
    Int8(i8),
    /// `int16`
    Int16(i16),
    /// `int32`
    Int32(i32),
    /// `int64`
    Int64(i64),
    /// `float32`
    Float32(f32),
    /// `float64`
    Float64(f64),
    /// UTF-8 `text`.
    Text(ByteSpan),
    /// `reserved`
    Reserved,
    /// Principal bytes.
    Principal(ByteSpan),
    /// `vec nat8` stored as raw bytes.
    Blob(ByteSpan),
    /// `opt`
    Opt(Option<ValueId>),
    /// `vec`
    Vec(Vec<ValueId>),
    /// Record fields in type-table order.
    Record(Vec<ValueField>),
    /// The active variant field and its zero-based index in the variant type.
    Variant {
        /// Index of the active field in the variant type's field list.
        index: u64,
        /// The active field.
        field: ValueField,
    },
    /// A service reference (principal bytes).
    Service(ByteSpan),
    /// A function reference: service principal plus method name.
    Func {
        /// Principal of the service hosting the method.
        service: ByteSpan,
        /// Method name (UTF-8).
        method: ByteSpan,
    },
}

impl Arena {
    /// Stores `text`.
    pub fn text_value(&mut self, s: &str) -> Result<ValueId, IdlError> {
        let span = self.alloc_bytes(s.as_bytes())?;
        self.alloc_value(Value::Text(span))
    }

    /// Stores a `blob` (`vec nat8`).
    pub fn blob_value(&mut self, bytes: &[u8]) -> Result<ValueId, IdlError> {
        let span = self.alloc_bytes(bytes)?;
        self.alloc_value(Value::Blob(span))
    }

    /// Stores a principal. Principals longer than [`MAX_PRINCIPAL_LEN`] are rejected.
    pub fn principal_value(&mut self, bytes: &[u8]) -> Result<ValueId, IdlError> {
        if bytes.len() > MAX_PRINCIPAL_LEN {
            return Err(IdlError::InvalidArgument);
        }
        let span = self.alloc_bytes(bytes)?;
        self.alloc_value(Value::Principal(span))
    }

    /// Stores a `nat` from a `u64`.
    pub fn nat_value(&mut self, v: u64) -> Result<ValueId, IdlError> {
        let mut buf = Vec::new();
        write_uleb128_u64(&mut buf, v);
        self.nat_from_leb(&buf)
    }

    /// Stores an `int` from an `i64`.
    pub fn int_value(&mut self, v: i64) -> Result<ValueId, IdlError> {
        let mut buf = Vec::new();
        write_sleb128_i64(&mut buf, v);
        self.int_from_leb(&buf)
    }

    /// Stores a `nat` from raw unsigned LEB128 bytes of any width.
    ///
    /// `bytes` must hold exactly one well-formed number.
    pub fn nat_from_leb(&mut self, bytes: &[u8]) -> Result<ValueId, IdlError> {
        check_single_leb(bytes)?;
        let span = self.alloc_bytes(bytes)?;
        self.alloc_value(Value::Nat(span))
    }

    /// Stores an `int` from raw signed LEB128 bytes of any width.
    pub fn int_from_leb(&mut self, bytes: &[u8]) -> Result<ValueId, IdlError> {
        check_single_leb(bytes)?;
        let span = self.alloc_bytes(bytes)?;
        self.alloc_value(Value::Int(span))
    }

    /// Stores `opt` with an optional inner value.
    pub fn opt_value(&mut self, inner: Option<ValueId>) -> Result<ValueId, IdlError> {
        self.alloc_value(Value::Opt(inner))
    }

    /// Stores a `vec`.
    pub fn vec_value(&mut self, items: Vec<ValueId>) -> Result<ValueId, IdlError> {
        self.alloc_value(Value::Vec(items))
    }

    /// Stores a record value.
    ///
    /// Fields are put in label-id order, matching how record types order their fields, so the
    /// serializer writes them in type-table order. Duplicate ids are rejected.
    pub fn record_value(&mut self, mut fields: Vec<ValueField>) -> Result<ValueId, IdlError> {
        fields.sort_by_key(|f| f.label.id());
        if fields.windows(2).any(|w| w[0].label.id() == w[1].label.id()) {
            return Err(IdlError::InvalidArgument);
        }
        self.alloc_value(Value::Record(fields))
    }

    /// Stores a tuple-style record whose labels are `0..n`.
    pub fn tuple_value(&mut self, items: &[ValueId]) -> Result<ValueId, IdlError> {
        let fields = (0_u32..)
            .zip(items)
            .map(|(i, &v)| ValueField::new(i, v))
            .collect();
        self.alloc_value(Value::Record(fields))
    }

    /// Stores a variant value activating field `index` of its type.
    pub fn variant_value(
        &mut self,
        index: u64,
        label: impl Into<Label>,
        value: ValueId,
    ) -> Result<ValueId, IdlError> {
        self.alloc_value(Value::Variant {
            index,
            field: ValueField::new(label, value),
        })
    }

    /// Stores a service reference.
    pub fn service_value(&mut self, principal: &[u8]) -> Result<ValueId, IdlError> {
        if principal.len() > MAX_PRINCIPAL_LEN {
            return Err(IdlError::InvalidArgument);
        }
        let span = self.alloc_bytes(principal)?;
        self.alloc_value(Value::Service(span))
    }

    /// Stores a function reference.
    pub fn func_value(&mut self, principal: &[u8], method: &str) -> Result<ValueId, IdlError> {
        if principal.len() > MAX_PRINCIPAL_LEN {
            return Err(IdlError::InvalidArgument);
        }
        let service = self.alloc_bytes(principal)?;
        let method = self.alloc_bytes(method.as_bytes())?;
        self.alloc_value(Value::Func { service, method })
    }

    /// Returns the text behind a `text` value.
    pub fn as_text(&self, id: ValueId) -> Result<&str, IdlError> {
        match self.value(id)? {
            Value::Text(span) => self.str(*span),
            _ => Err(IdlError::InvalidArgument),
        }
    }

    /// Returns the bytes behind a `blob`, `principal`, or `service` value.
    pub fn as_bytes(&self, id: ValueId) -> Result<&[u8], IdlError> {
        match self.value(id)? {
            Value::Blob(span) | Value::Principal(span) | Value::Service(span) => self.bytes(*span),
            _ => Err(IdlError::InvalidArgument),
        }
    }

    /// Interprets a `nat` value (or any fixed-width unsigned value) as `u64`.
    ///
    /// Fails with [`IdlError::Overflow`] when a `nat` does not fit.
    pub fn as_u64(&self, id: ValueId) -> Result<u64, IdlError> {
        match *self.value(id)? {
            Value::Nat(span) => decode_uleb128(self.bytes(span)?).map(|(v, _)| v),
            Value::Nat8(v) => Ok(v.into()),
            Value::Nat16(v) => Ok(v.into()),
            Value::Nat32(v) => Ok(v.into()),
            Value::Nat64(v) => Ok(v),
            _ => Err(IdlError::InvalidArgument),
        }
    }

    /// Interprets an `int` value (or any fixed-width signed value) as `i64`.
    pub fn as_i64(&self, id: ValueId) -> Result<i64, IdlError> {
        match *self.value(id)? {
            Value::Int(span) => decode_sleb128(self.bytes(span)?).map(|(v, _)| v),
            Value::Int8(v) => Ok(v.into()),
            Value::Int16(v) => Ok(v.into()),
            Value::Int32(v) => Ok(v.into()),
            Value::Int64(v) => Ok(v),
            _ => Err(IdlError::InvalidArgument),
        }
    }
}

fn check_single_leb(bytes: &[u8]) -> Result<(), IdlError> {
    if scan_leb128(bytes)? != bytes.len() {
        return Err(IdlError::InvalidArgument);
    }
    Ok(())
}

/// Re-encodes raw unsigned LEB128 bytes as signed LEB128 of the same magnitude.
///
/// A `nat` whose top payload bit is set would read back negative as an `int`, so it gains one
/// zero sign byte.
pub(crate) fn uleb_to_sleb(bytes: &[u8]) -> Result<Vec<u8>, IdlError> {
    let (&last, _) = bytes.split_last().ok_or(IdlError::Truncated)?;
    let mut out = Vec::new();
    out.try_reserve(bytes.len() + 1)?;
    out.extend_from_slice(bytes);
    if (last & 0x40) != 0 {
        if let Some(b) = out.last_mut() {
            *b |= 0x80;
        }
        out.push(0x00);
    }
    Ok(out)
}

/// Deep structural equality between two values, possibly in different arenas.
///
/// Payloads compare by content, labels by id, and floats by bit pattern.
pub fn values_equal(a: &Arena, x: ValueId, b: &Arena, y: ValueId) -> Result<bool, IdlError> {
    let (vx, vy) = (a.value(x)?, b.value(y)?);
    Ok(match (vx, vy) {
        (Value::Null, Value::Null) | (Value::Reserved, Value::Reserved) => true,
        (Value::Bool(p), Value::Bool(q)) => p == q,
        (Value::Nat8(p), Value::Nat8(q)) => p == q,
        (Value::Nat16(p), Value::Nat16(q)) => p == q,
        (Value::Nat32(p), Value::Nat32(q)) => p == q,
        (Value::Nat64(p), Value::Nat64(q)) => p == q,
        (Value::Int8(p), Value::Int8(q)) => p == q,
        (Value::Int16(p), Value::Int16(q)) => p == q,
        (Value::Int32(p), Value::Int32(q)) => p == q,
        (Value::Int64(p), Value::Int64(q)) => p == q,
        (Value::Float32(p), Value::Float32(q)) => p.to_bits() == q.to_bits(),
        (Value::Float64(p), Value::Float64(q)) => p.to_bits() == q.to_bits(),
        (Value::Nat(p), Value::Nat(q))
        | (Value::Int(p), Value::Int(q))
        | (Value::Text(p), Value::Text(q))
        | (Value::Principal(p), Value::Principal(q))
        | (Value::Blob(p), Value::Blob(q))
        | (Value::Service(p), Value::Service(q)) => a.bytes(*p)? == b.bytes(*q)?,
        (
            Value::Func {
                service: s1,
                method: m1,
            },
            Value::Func {
                service: s2,
                method: m2,
            },
        ) => a.bytes(*s1)? == b.bytes(*s2)? && a.bytes(*m1)? == b.bytes(*m2)?,
        (Value::Opt(p), Value::Opt(q)) => match (p, q) {
            (None, None) => true,
            (Some(p), Some(q)) => values_equal(a, *p, b, *q)?,
            _ => false,
        },
        (Value::Vec(p), Value::Vec(q)) => {
            if p.len() != q.len() {
                return Ok(false);
            }
            for (&i, &j) in p.iter().zip(q) {
                if !values_equal(a, i, b, j)? {
                    return Ok(false);
                }
            }
            true
        }
        (Value::Record(p), Value::Record(q)) => {
            if p.len() != q.len() {
                return Ok(false);
            }
            for (f, g) in p.iter().zip(q) {
                if f.label.id() != g.label.id() || !values_equal(a, f.value, b, g.value)? {
                    return Ok(false);
                }
            }
            true
        }
        (
            Value::Variant {
                index: i,
                field: f,
            },
            Value::Variant {
                index: j,
                field: g,
            },
        ) => i == j && f.label.id() == g.label.id() && values_equal(a, f.value, b, g.value)?,
        _ => false,
    })
}
