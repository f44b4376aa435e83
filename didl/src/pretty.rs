// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering values as IDL text.
//!
//! The output follows the textual value syntax, for example
//! `(record { id = 1; name = "a" }, opt 7 : nat8)`. Fixed-width numbers carry a type
//! annotation; `nat` and arbitrary-size `int` values print in full decimal.

use crate::arena::{Arena, ValueId};
use crate::error::IdlError;
use crate::value::{Value, ValueField};
use alloc::vec::Vec;
use core::fmt;

/// [`fmt::Display`] adapter for a single value. See [`display_value`].
#[derive(Copy, Clone)]
pub struct DisplayValue<'a> {
    arena: &'a Arena,
    value: ValueId,
}

impl fmt::Debug for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayValue")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

/// [`fmt::Display`] adapter for an argument list. See [`display_args`].
#[derive(Copy, Clone)]
pub struct DisplayArgs<'a> {
    arena: &'a Arena,
    values: &'a [ValueId],
}

impl fmt::Debug for DisplayArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayArgs")
            .field("len", &self.values.len())
            .finish_non_exhaustive()
    }
}

/// Renders one value.
///
/// Formatting fails with [`fmt::Error`] if `value` is not a live handle of `arena`.
#[must_use]
pub fn display_value(arena: &Arena, value: ValueId) -> DisplayValue<'_> {
    DisplayValue { arena, value }
}

/// Renders an argument list as a parenthesized tuple, `(a, b)`.
#[must_use]
pub fn display_args<'a>(arena: &'a Arena, values: &'a [ValueId]) -> DisplayArgs<'a> {
    DisplayArgs { arena, values }
}

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self.arena, self.value)
    }
}

impl fmt::Display for DisplayArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, &v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_value(f, self.arena, v)?;
        }
        f.write_str(")")
    }
}

fn lookup<T>(r: Result<T, IdlError>) -> Result<T, fmt::Error> {
    r.map_err(|_| fmt::Error)
}

fn write_value(f: &mut fmt::Formatter<'_>, arena: &Arena, id: ValueId) -> fmt::Result {
    match lookup(arena.value(id))? {
        Value::Null => f.write_str("null"),
        Value::Reserved => f.write_str("reserved"),
        Value::Bool(v) => write!(f, "{v}"),
        Value::Nat(span) => write_nat(f, lookup(arena.bytes(*span))?),
        Value::Int(span) => {
            write_int(f, lookup(arena.bytes(*span))?)?;
            f.write_str(" : int")
        }
        Value::Nat8(v) => write!(f, "{v} : nat8"),
        Value::Nat16(v) => write!(f, "{v} : nat16"),
        Value::Nat32(v) => write!(f, "{v} : nat32"),
        Value::Nat64(v) => write!(f, "{v} : nat64"),
        Value::Int8(v) => write!(f, "{v} : int8"),
        Value::Int16(v) => write!(f, "{v} : int16"),
        Value::Int32(v) => write!(f, "{v} : int32"),
        Value::Int64(v) => write!(f, "{v} : int64"),
        Value::Float32(v) => write!(f, "{v} : float32"),
        Value::Float64(v) => write!(f, "{v}"),
        Value::Text(span) => write_text(f, lookup(arena.str(*span))?),
        Value::Blob(span) => {
            f.write_str("blob \"")?;
            for b in lookup(arena.bytes(*span))? {
                write!(f, "\\{b:02x}")?;
            }
            f.write_str("\"")
        }
        Value::Principal(span) => {
            f.write_str("principal ")?;
            write_hex(f, lookup(arena.bytes(*span))?)
        }
        Value::Service(span) => {
            f.write_str("service ")?;
            write_hex(f, lookup(arena.bytes(*span))?)
        }
        Value::Func { service, method } => {
            f.write_str("func ")?;
            write_hex(f, lookup(arena.bytes(*service))?)?;
            f.write_str(".")?;
            f.write_str(lookup(arena.str(*method))?)
        }
        Value::Opt(None) => f.write_str("null"),
        Value::Opt(Some(inner)) => {
            f.write_str("opt ")?;
            write_value(f, arena, *inner)
        }
        Value::Vec(items) => {
            if items.is_empty() {
                return f.write_str("vec {}");
            }
            f.write_str("vec { ")?;
            for (i, &item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str("; ")?;
                }
                write_value(f, arena, item)?;
            }
            f.write_str(" }")
        }
        Value::Record(fields) => {
            if fields.is_empty() {
                return f.write_str("record {}");
            }
            f.write_str("record { ")?;
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    f.write_str("; ")?;
                }
                write_field(f, arena, field)?;
            }
            f.write_str(" }")
        }
        Value::Variant { field, .. } => {
            f.write_str("variant { ")?;
            write_field(f, arena, field)?;
            f.write_str(" }")
        }
    }
}

fn write_field(f: &mut fmt::Formatter<'_>, arena: &Arena, field: &ValueField) -> fmt::Result {
    write!(f, "{} = ", field.label)?;
    write_value(f, arena, field.value)
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    for b in bytes {
        write!(f, "{b:02x}")?;
    }
    f.write_str("\"")
}

fn write_text(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            ' '..='~' => write!(f, "{c}")?,
            _ => {
                let mut buf = [0_u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    write!(f, "\\{b:02x}")?;
                }
            }
        }
    }
    f.write_str("\"")
}

/// Writes unsigned LEB128 bytes in decimal.
fn write_nat(f: &mut fmt::Formatter<'_>, leb: &[u8]) -> fmt::Result {
    let mut limbs = limbs_from_groups(leb.iter().map(|b| b & 0x7f));
    write_decimal(f, &mut limbs)
}

/// Writes signed LEB128 bytes in decimal.
fn write_int(f: &mut fmt::Formatter<'_>, leb: &[u8]) -> fmt::Result {
    let negative = leb.last().is_some_and(|b| b & 0x40 != 0);
    if !negative {
        return write_nat(f, leb);
    }
    // |v| = 2^(7n) - u: invert every group, then add one.
    let mut limbs = limbs_from_groups(leb.iter().map(|b| !b & 0x7f));
    add_small(&mut limbs, 1);
    f.write_str("-")?;
    write_decimal(f, &mut limbs)
}

/// Builds little-endian base-2^32 limbs from little-endian 7-bit groups.
fn limbs_from_groups(groups: impl DoubleEndedIterator<Item = u8>) -> Vec<u32> {
    let mut limbs = Vec::new();
    for g in groups.rev() {
        let mut carry = u64::from(g);
        for limb in &mut limbs {
            let x = (u64::from(*limb) << 7) | carry;
            *limb = x as u32;
            carry = x >> 32;
        }
        if carry != 0 {
            limbs.push(carry as u32);
        }
    }
    limbs
}

fn add_small(limbs: &mut Vec<u32>, v: u32) {
    let mut carry = u64::from(v);
    for limb in limbs.iter_mut() {
        if carry == 0 {
            return;
        }
        let x = u64::from(*limb) + carry;
        *limb = x as u32;
        carry = x >> 32;
    }
    if carry != 0 {
        limbs.push(carry as u32);
    }
}

/// Divides in place by `d`, returning the remainder.
fn div_small(limbs: &mut Vec<u32>, d: u32) -> u32 {
    let mut rem = 0_u64;
    for limb in limbs.iter_mut().rev() {
        let x = (rem << 32) | u64::from(*limb);
        *limb = (x / u64::from(d)) as u32;
        rem = x % u64::from(d);
    }
    while limbs.last() == Some(&0) {
        limbs.pop();
    }
    rem as u32
}

fn write_decimal(f: &mut fmt::Formatter<'_>, limbs: &mut Vec<u32>) -> fmt::Result {
    const CHUNK: u32 = 1_000_000_000;
    while limbs.last() == Some(&0) {
        limbs.pop();
    }
    let mut chunks = Vec::new();
    while !limbs.is_empty() {
        chunks.push(div_small(limbs, CHUNK));
    }
    let Some((first, rest)) = chunks.split_last() else {
        return f.write_str("0");
    };
    write!(f, "{first}")?;
    for chunk in rest.iter().rev() {
        write!(f, "{chunk:09}")?;
    }
    Ok(())
}
