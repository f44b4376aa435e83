// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decoding the arguments of a message.
//!
//! A [`Deserializer`] parses the header up front, then hands out one argument per
//! [`Deserializer::get_value`] call. Every node it allocates goes into the caller's [`Arena`],
//! which must be the same arena for the whole session: the header's type handles live there too.

use crate::arena::{Arena, TypeId, ValueId};
use crate::coerce::{coerce, skip_with};
use crate::env::TypeEnv;
use crate::error::IdlError;
use crate::format::Reader;
use crate::header::Header;
use crate::subtype::{Gamma, OptReport, SubtypeResult, subtype_check_traced};
use crate::trace::{TraceMask, TraceSink};
use crate::types::{Label, Type, TypeKind};
use crate::value::{MAX_PRINCIPAL_LEN, Value, ValueField};
use alloc::vec::Vec;
use core::fmt;

/// Default nesting bound for decoding, skipping and subtype checks.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Decoder knobs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Upper bound on decoding cost. `0` means unlimited.
    ///
    /// The header costs four units per byte; each value costs one unit per byte it reads, and a
    /// `vec` additionally costs one unit per element, charged before any element is decoded.
    pub decoding_quota: usize,
    /// Upper bound on the cost of skipping unread arguments in [`Deserializer::done`].
    /// `0` means unlimited.
    pub skipping_quota: usize,
    /// Policy for the special opt rule in [`Deserializer::get_value_with_type`].
    pub opt_report: OptReport,
    /// Ask sinks to print type details along with warnings.
    pub full_error_message: bool,
    /// Nesting bound for values and for subtype derivations; anything deeper fails with
    /// [`IdlError::Overflow`].
    pub max_depth: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            decoding_quota: 0,
            skipping_quota: 0,
            opt_report: OptReport::Warning,
            full_error_message: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Streaming decoder over one message.
pub struct Deserializer<'a> {
    input: &'a [u8],
    pos: usize,
    header: Header,
    next_arg: usize,
    cost: usize,
    skip_cost: usize,
    config: DecoderConfig,
    trace: Option<&'a mut dyn TraceSink>,
}

impl fmt::Debug for Deserializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deserializer")
            .field("pos", &self.pos)
            .field("len", &self.input.len())
            .field("next_arg", &self.next_arg)
            .field("arg_count", &self.header.arg_types.len())
            .field("cost", &self.cost)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> Deserializer<'a> {
    /// Parses the header of `input` with the default configuration.
    pub fn new(input: &'a [u8], arena: &mut Arena) -> Result<Self, IdlError> {
        Self::new_with_config(input, arena, DecoderConfig::default())
    }

    /// Parses the header of `input` and charges its cost against `config.decoding_quota`.
    pub fn new_with_config(
        input: &'a [u8],
        arena: &mut Arena,
        config: DecoderConfig,
    ) -> Result<Self, IdlError> {
        let (header, consumed) = Header::parse(input, arena)?;
        let mut de = Self {
            input,
            pos: consumed,
            header,
            next_arg: 0,
            cost: 0,
            skip_cost: 0,
            config,
            trace: None,
        };
        de.add_cost(consumed.checked_mul(4).ok_or(IdlError::Overflow)?)?;
        Ok(de)
    }

    /// Attaches a trace sink for the rest of the session.
    pub fn set_trace(&mut self, sink: &'a mut dyn TraceSink) {
        self.trace = Some(sink);
    }

    /// Returns the parsed header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the session's type environment.
    ///
    /// Bind the names used by expected types here before calling
    /// [`Deserializer::get_value_with_type`]. The `tableN` names are taken by the header.
    pub fn env_mut(&mut self) -> &mut TypeEnv {
        &mut self.header.env
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Returns the cost accumulated so far.
    #[must_use]
    pub fn cost(&self) -> usize {
        self.cost
    }

    /// Returns the number of unread input bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    /// Returns the number of arguments declared by the header.
    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.header.arg_types.len()
    }

    /// Returns `true` once every argument has been consumed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.next_arg >= self.header.arg_types.len()
    }

    /// Adds `n` to the decoding cost.
    ///
    /// Fails with [`IdlError::Overflow`] when a non-zero quota is exceeded.
    pub fn add_cost(&mut self, n: usize) -> Result<(), IdlError> {
        self.cost = self.cost.saturating_add(n);
        let total = self.cost;
        self.emit(TraceMask::QUOTA, |sink| sink.cost(n, total));
        if self.config.decoding_quota > 0 && self.cost > self.config.decoding_quota {
            return Err(IdlError::Overflow);
        }
        Ok(())
    }

    fn emit(&mut self, mask: TraceMask, f: impl FnOnce(&mut (dyn TraceSink + 'a))) {
        if let Some(sink) = self.trace.as_deref_mut()
            && sink.mask().contains(mask)
        {
            f(sink);
        }
    }

    /// Decodes the next argument by its wire type.
    ///
    /// Returns the wire type and the value. Fails with [`IdlError::InvalidArgument`] when no
    /// arguments remain. On error the cursor stays at the start of the failed argument.
    pub fn get_value(&mut self, arena: &mut Arena) -> Result<(TypeId, ValueId), IdlError> {
        let index = self.next_arg;
        let ty = *self
            .header
            .arg_types
            .get(index)
            .ok_or(IdlError::InvalidArgument)?;
        let start = self.pos;
        self.emit(TraceMask::DECODE, |sink| sink.arg_start(index, ty, start));

        let mut r = Reader::at(self.input, self.pos);
        let res = self.decode(arena, &mut r, ty, self.config.max_depth);
        let end = r.offset();
        let outcome = res.as_ref().map(|_| ()).map_err(|e| *e);
        self.emit(TraceMask::DECODE, |sink| sink.arg_end(index, end, outcome));

        let value = res?;
        self.pos = end;
        self.next_arg += 1;
        Ok((ty, value))
    }

    /// Decodes the next argument and converts it to `expected`.
    ///
    /// Fails with [`IdlError::InvalidArgument`] if the wire type is not a subtype of `expected`.
    /// When the relation holds only through the special opt rule, the result is `None` at the
    /// affected positions.
    pub fn get_value_with_type(
        &mut self,
        arena: &mut Arena,
        expected: TypeId,
    ) -> Result<ValueId, IdlError> {
        let (wire, value) = self.get_value(arena)?;
        let verdict = subtype_check_traced(
            arena,
            &self.header.env,
            &mut Gamma::new(),
            self.config.opt_report,
            self.config.max_depth,
            wire,
            expected,
            self.trace.as_deref_mut(),
        )?;
        if verdict == SubtypeResult::Fail {
            return Err(IdlError::InvalidArgument);
        }
        coerce(arena, &self.header.env, value, wire, expected)
    }

    /// Skips the next argument without materializing it, charging the skipping quota.
    ///
    /// Returns the number of bytes skipped.
    pub fn skip_arg(&mut self, arena: &Arena) -> Result<usize, IdlError> {
        let ty = *self
            .header
            .arg_types
            .get(self.next_arg)
            .ok_or(IdlError::InvalidArgument)?;
        let quota = self.config.skipping_quota;
        let mut spent = self.skip_cost;
        let mut meter = |n: usize| {
            spent = spent.saturating_add(n);
            if quota > 0 && spent > quota {
                return Err(IdlError::Overflow);
            }
            Ok(())
        };
        let mut r = Reader::at(self.input, self.pos);
        skip_with(
            arena,
            &self.header.env,
            ty,
            &mut r,
            &mut meter,
            self.config.max_depth,
        )?;
        let skipped = r.offset() - self.pos;
        self.skip_cost = spent;
        self.pos = r.offset();
        self.next_arg += 1;
        Ok(skipped)
    }

    /// Skips every unread argument, then rejects trailing bytes.
    pub fn done(&mut self, arena: &Arena) -> Result<(), IdlError> {
        while !self.is_done() {
            self.skip_arg(arena)?;
        }
        if self.pos < self.input.len() {
            return Err(IdlError::InvalidArgument);
        }
        Ok(())
    }

    fn decode(
        &mut self,
        arena: &mut Arena,
        r: &mut Reader<'a>,
        ty: TypeId,
        depth: usize,
    ) -> Result<ValueId, IdlError> {
        let Some(depth) = depth.checked_sub(1) else {
            return Err(IdlError::Overflow);
        };
        let actual = self.header.env.trace(arena, ty)?;
        let start = r.offset();
        // Composite arms copy out the handles they need so the arena can be borrowed mutably.
        let value = match arena.ty(actual)? {
            Type::Null => Value::Null,
            Type::Reserved => Value::Reserved,
            Type::Empty | Type::Var(_) => return Err(IdlError::InvalidArgument),
            Type::Bool => match r.read_u8()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                _ => return Err(IdlError::InvalidArgument),
            },
            Type::Nat8 => Value::Nat8(r.read_u8()?),
            Type::Nat16 => Value::Nat16(u16::from_le_bytes(r.read_array()?)),
            Type::Nat32 => Value::Nat32(u32::from_le_bytes(r.read_array()?)),
            Type::Nat64 => Value::Nat64(u64::from_le_bytes(r.read_array()?)),
            Type::Int8 => Value::Int8(i8::from_le_bytes(r.read_array()?)),
            Type::Int16 => Value::Int16(i16::from_le_bytes(r.read_array()?)),
            Type::Int32 => Value::Int32(i32::from_le_bytes(r.read_array()?)),
            Type::Int64 => Value::Int64(i64::from_le_bytes(r.read_array()?)),
            Type::Float32 => Value::Float32(f32::from_bits(u32::from_le_bytes(r.read_array()?))),
            Type::Float64 => Value::Float64(f64::from_bits(u64::from_le_bytes(r.read_array()?))),
            Type::Nat => Value::Nat(arena.alloc_bytes(r.read_leb128_raw()?)?),
            Type::Int => Value::Int(arena.alloc_bytes(r.read_leb128_raw()?)?),
            Type::Text => Value::Text(arena.alloc_bytes(read_text(r)?.as_bytes())?),
            Type::Principal => Value::Principal(arena.alloc_bytes(read_principal(r)?)?),
            Type::Service(_) => Value::Service(arena.alloc_bytes(read_service(r)?)?),
            Type::Func(_) => {
                let (service, method) = read_func(r)?;
                Value::Func {
                    service: arena.alloc_bytes(service)?,
                    method: arena.alloc_bytes(method.as_bytes())?,
                }
            }
            &Type::Opt(inner) => match r.read_u8()? {
                0 => Value::Opt(None),
                1 => {
                    self.add_cost(r.offset() - start)?;
                    let v = self.decode(arena, r, inner, depth)?;
                    return arena.alloc_value(Value::Opt(Some(v)));
                }
                _ => return Err(IdlError::InvalidArgument),
            },
            &Type::Vec(elem) => {
                let count = r.read_len()?;
                self.add_cost(r.offset() - start)?;
                self.add_cost(count)?;
                if self.header.env.resolve(arena, elem)?.kind() == TypeKind::Nat8 {
                    let bytes = r.read_bytes(count)?;
                    let span = arena.alloc_bytes(bytes)?;
                    return arena.alloc_value(Value::Blob(span));
                }
                let mut items = Vec::new();
                items.try_reserve(count.min(r.remaining()))?;
                for _ in 0..count {
                    items.push(self.decode(arena, r, elem, depth)?);
                }
                return arena.vec_value(items);
            }
            Type::Record(fields) => {
                let len = fields.len();
                let mut out = Vec::new();
                out.try_reserve(len)?;
                for i in 0..len {
                    let (label, field_ty) = field_at(arena, actual, i)?;
                    let v = self.decode(arena, r, field_ty, depth)?;
                    out.push(ValueField::new(label, v));
                }
                return arena.alloc_value(Value::Record(out));
            }
            Type::Variant(_) => {
                let index = r.read_uleb128_u64()?;
                self.add_cost(r.offset() - start)?;
                let (label, field_ty) = usize::try_from(index)
                    .map_err(|_| IdlError::InvalidArgument)
                    .and_then(|i| field_at(arena, actual, i))?;
                let v = self.decode(arena, r, field_ty, depth)?;
                return arena.alloc_value(Value::Variant {
                    index,
                    field: ValueField::new(label, v),
                });
            }
        };
        self.add_cost(r.offset() - start)?;
        arena.alloc_value(value)
    }
}

/// Returns the label and type of field `index` of the record or variant `ty`.
fn field_at(arena: &Arena, ty: TypeId, index: usize) -> Result<(Label, TypeId), IdlError> {
    let field = arena
        .ty(ty)?
        .fields()
        .and_then(|fs| fs.get(index))
        .ok_or(IdlError::InvalidArgument)?;
    Ok((field.label.clone(), field.ty))
}

/// Reads a length-prefixed UTF-8 string.
pub(crate) fn read_text<'a>(r: &mut Reader<'a>) -> Result<&'a str, IdlError> {
    let len = r.read_len()?;
    let bytes = r.read_bytes(len)?;
    core::str::from_utf8(bytes).map_err(|_| IdlError::InvalidArgument)
}

/// Reads the length-prefixed bytes of a principal-like payload.
fn read_principal_body<'a>(r: &mut Reader<'a>) -> Result<&'a [u8], IdlError> {
    let len = r.read_len()?;
    if len > MAX_PRINCIPAL_LEN {
        return Err(IdlError::InvalidArgument);
    }
    r.read_bytes(len)
}

/// Reads a principal: flag `1`, then its bytes.
pub(crate) fn read_principal<'a>(r: &mut Reader<'a>) -> Result<&'a [u8], IdlError> {
    if r.read_u8()? != 1 {
        return Err(IdlError::InvalidArgument);
    }
    read_principal_body(r)
}

/// Reads the flag of a func or service reference. Opaque references are not supported.
fn read_reference_flag(r: &mut Reader<'_>) -> Result<(), IdlError> {
    match r.read_u8()? {
        0 => Err(IdlError::Unsupported),
        1 => Ok(()),
        _ => Err(IdlError::InvalidArgument),
    }
}

/// Reads a service reference and returns its principal bytes.
pub(crate) fn read_service<'a>(r: &mut Reader<'a>) -> Result<&'a [u8], IdlError> {
    read_reference_flag(r)?;
    read_principal_body(r)
}

/// Reads a function reference and returns the service principal and method name.
pub(crate) fn read_func<'a>(r: &mut Reader<'a>) -> Result<(&'a [u8], &'a str), IdlError> {
    read_reference_flag(r)?;
    let service = read_service(r)?;
    let method = read_text(r)?;
    Ok((service, method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;
    use alloc::vec;

    fn decode_one(bytes: &[u8]) -> Result<(Arena, TypeId, ValueId), IdlError> {
        let mut arena = Arena::new();
        let mut de = Deserializer::new(bytes, &mut arena)?;
        let (ty, v) = de.get_value(&mut arena)?;
        Ok((arena, ty, v))
    }

    #[test]
    fn decodes_text_and_int() {
        let bytes = hex::decode("4449444c0002717c0568656c6c6f2a").unwrap();
        let mut arena = Arena::new();
        let mut de = Deserializer::new(&bytes, &mut arena).unwrap();
        assert_eq!(de.arg_count(), 2);
        let (_, t) = de.get_value(&mut arena).unwrap();
        assert_eq!(arena.as_text(t), Ok("hello"));
        let (_, i) = de.get_value(&mut arena).unwrap();
        assert_eq!(arena.as_i64(i), Ok(42));
        assert!(de.is_done());
        de.done(&arena).unwrap();
        assert_eq!(de.get_value(&mut arena), Err(IdlError::InvalidArgument));
    }

    #[test]
    fn header_cost_is_charged_against_quota() {
        let bytes = [0x44, 0x49, 0x44, 0x4c, 0x00, 0x01, 0x7e, 0x01];
        let mut arena = Arena::new();
        let tight = DecoderConfig {
            decoding_quota: 1,
            ..DecoderConfig::default()
        };
        assert_eq!(
            Deserializer::new_with_config(&bytes, &mut arena, tight).err(),
            Some(IdlError::Overflow)
        );
        let roomy = DecoderConfig {
            decoding_quota: 1000,
            ..DecoderConfig::default()
        };
        let mut de = Deserializer::new_with_config(&bytes, &mut arena, roomy).unwrap();
        assert_eq!(de.cost(), 28);
        let (_, v) = de.get_value(&mut arena).unwrap();
        assert_eq!(arena.value(v), Ok(&Value::Bool(true)));
        assert_eq!(de.cost(), 29);
    }

    #[test]
    fn rejects_malformed_primitives() {
        // bool 2
        assert_eq!(decode_one(b"DIDL\x00\x01\x7e\x02").err(), Some(IdlError::InvalidArgument));
        // text with invalid UTF-8
        assert_eq!(
            decode_one(b"DIDL\x00\x01\x71\x02\xc3\x28").err(),
            Some(IdlError::InvalidArgument)
        );
        // principal flag 0
        assert_eq!(
            decode_one(b"DIDL\x00\x01\x68\x00\x00").err(),
            Some(IdlError::InvalidArgument)
        );
        // principal too long
        assert_eq!(
            decode_one(b"DIDL\x00\x01\x68\x01\x1e").err(),
            Some(IdlError::InvalidArgument)
        );
        // empty has no values
        assert_eq!(decode_one(b"DIDL\x00\x01\x6f").err(), Some(IdlError::InvalidArgument));
        // nat64 cut short
        assert_eq!(decode_one(b"DIDL\x00\x01\x78\x01\x02").err(), Some(IdlError::Truncated));
    }

    #[test]
    fn decodes_composites() {
        // table0 = opt text; table1 = vec nat8; table2 = variant { 0: null; 1: table0 }
        let bytes = b"DIDL\x03\x6e\x71\x6d\x7b\x6b\x02\x00\x7f\x01\x00\x03\x00\x01\x02\
                      \x01\x02hi\x02\xaa\xbb\x01\x00";
        let mut arena = Arena::new();
        let mut de = Deserializer::new(bytes, &mut arena).unwrap();
        let (_, o) = de.get_value(&mut arena).unwrap();
        let Value::Opt(Some(inner)) = *arena.value(o).unwrap() else {
            panic!("expected Some");
        };
        assert_eq!(arena.as_text(inner), Ok("hi"));
        let (_, b) = de.get_value(&mut arena).unwrap();
        assert_eq!(arena.as_bytes(b), Ok(&[0xaa_u8, 0xbb][..]));
        let (_, v) = de.get_value(&mut arena).unwrap();
        match arena.value(v).unwrap() {
            Value::Variant { index, field } => {
                assert_eq!(*index, 1);
                assert_eq!(arena.value(field.value), Ok(&Value::Opt(None)));
            }
            other => panic!("unexpected {other:?}"),
        }
        de.done(&arena).unwrap();
    }

    #[test]
    fn vec_of_records_decodes_each_element() {
        // table0 = vec table1; table1 = record { 0: nat8; 1: bool }
        let bytes = b"DIDL\x02\x6d\x01\x6c\x02\x00\x7b\x01\x7e\x01\x00\
                      \x03\x01\x01\x02\x00\x03\x01";
        let (arena, _, v) = decode_one(bytes).unwrap();
        let Value::Vec(items) = arena.value(v).unwrap() else {
            panic!("expected a vec");
        };
        assert_eq!(items.len(), 3);
        for (&item, (n, flag)) in items.iter().zip([(1, true), (2, false), (3, true)]) {
            let Value::Record(fields) = arena.value(item).unwrap() else {
                panic!("expected a record");
            };
            assert_eq!(fields[0].label.id(), 0);
            assert_eq!(fields[1].label.id(), 1);
            assert_eq!(arena.value(fields[0].value), Ok(&Value::Nat8(n)));
            assert_eq!(arena.value(fields[1].value), Ok(&Value::Bool(flag)));
        }
    }

    #[test]
    fn rejects_bad_opt_flag_and_variant_index() {
        assert_eq!(
            decode_one(b"DIDL\x01\x6e\x71\x01\x00\x02").err(),
            Some(IdlError::InvalidArgument)
        );
        assert_eq!(
            decode_one(b"DIDL\x01\x6b\x01\x00\x7f\x01\x00\x01").err(),
            Some(IdlError::InvalidArgument)
        );
    }

    #[test]
    fn self_referential_record_hits_depth_bound() {
        // table0 = record { 0: table0 } consumes no bytes per level.
        let bytes = b"DIDL\x01\x6c\x01\x00\x00\x01\x00";
        let mut arena = Arena::new();
        let config = DecoderConfig {
            max_depth: 32,
            ..DecoderConfig::default()
        };
        let mut de = Deserializer::new_with_config(bytes, &mut arena, config).unwrap();
        assert_eq!(de.get_value(&mut arena), Err(IdlError::Overflow));
    }

    #[test]
    fn long_opt_chain_in_header_fails_typed_decode() {
        // tableN = opt table(N+1), the last one opt nat; one argument of type table0, null.
        const LEN: usize = 2000;
        let mut bytes = b"DIDL".to_vec();
        let mut buf = [0_u8; 10];
        let n = crate::format::encode_uleb128(LEN as u64, &mut buf).unwrap();
        bytes.extend_from_slice(&buf[..n]);
        for i in 1..LEN {
            bytes.push(0x6e);
            let n = crate::format::encode_sleb128(i as i64, &mut buf).unwrap();
            bytes.extend_from_slice(&buf[..n]);
        }
        bytes.extend_from_slice(&[0x6e, 0x7d, 0x01, 0x00, 0x00]);

        let mut arena = Arena::new();
        let mut de = Deserializer::new(&bytes, &mut arena).unwrap();
        let t = arena.var("t").unwrap();
        let opt_t = arena.opt(t).unwrap();
        de.env_mut().insert("t", opt_t).unwrap();
        assert_eq!(
            de.get_value_with_type(&mut arena, t),
            Err(IdlError::Overflow)
        );
    }

    #[test]
    fn vec_count_is_charged_up_front() {
        // vec null claiming 1000 elements.
        let bytes = b"DIDL\x01\x6d\x7f\x01\x00\xe8\x07";
        let mut arena = Arena::new();
        let config = DecoderConfig {
            decoding_quota: 100,
            ..DecoderConfig::default()
        };
        let mut de = Deserializer::new_with_config(bytes, &mut arena, config).unwrap();
        assert_eq!(de.get_value(&mut arena), Err(IdlError::Overflow));
    }

    #[test]
    fn func_and_service_references() {
        // table0 = func () -> (); table1 = service {}
        let head = b"DIDL\x02\x6a\x00\x00\x00\x69\x00\x02\x00\x01";
        let mut bytes = head.to_vec();
        bytes.extend_from_slice(b"\x01\x01\x01\xab\x02go\x01\x01\xcd");
        let mut arena = Arena::new();
        let mut de = Deserializer::new(&bytes, &mut arena).unwrap();
        let (_, f) = de.get_value(&mut arena).unwrap();
        match *arena.value(f).unwrap() {
            Value::Func { service, method } => {
                assert_eq!(arena.bytes(service), Ok(&[0xab_u8][..]));
                assert_eq!(arena.str(method), Ok("go"));
            }
            ref other => panic!("unexpected {other:?}"),
        }
        let (_, s) = de.get_value(&mut arena).unwrap();
        assert_eq!(arena.as_bytes(s), Ok(&[0xcd_u8][..]));
        de.done(&arena).unwrap();

        let opaque = b"DIDL\x01\x69\x00\x01\x00\x00";
        assert_eq!(decode_one(opaque).err(), Some(IdlError::Unsupported));
        let bogus = b"DIDL\x01\x69\x00\x01\x00\x07";
        assert_eq!(decode_one(bogus).err(), Some(IdlError::InvalidArgument));
    }

    #[test]
    fn done_skips_and_rejects_trailing_bytes() {
        let mut arena = Arena::new();
        let bytes = b"DIDL\x00\x02\x71\x7e\x02hi\x01";
        let mut de = Deserializer::new(bytes, &mut arena).unwrap();
        de.done(&arena).unwrap();

        let trailing = b"DIDL\x00\x01\x7e\x01\x00";
        let mut de = Deserializer::new(trailing, &mut arena).unwrap();
        de.get_value(&mut arena).unwrap();
        assert_eq!(de.done(&arena), Err(IdlError::InvalidArgument));
    }

    #[test]
    fn skipping_quota_bounds_done() {
        let mut arena = Arena::new();
        let bytes = b"DIDL\x00\x01\x71\x05hello";
        let config = DecoderConfig {
            skipping_quota: 3,
            ..DecoderConfig::default()
        };
        let mut de = Deserializer::new_with_config(bytes, &mut arena, config).unwrap();
        assert_eq!(de.done(&arena), Err(IdlError::Overflow));
    }

    #[test]
    fn typed_decode_subtypes_and_coerces() {
        // record { 0: nat; 1: text }
        let bytes = b"DIDL\x01\x6c\x02\x00\x7d\x01\x71\x01\x00\x05\x02ok";
        let mut arena = Arena::new();
        let mut de = Deserializer::new(bytes, &mut arena).unwrap();
        let int = arena.primitive(TypeKind::Int).unwrap();
        let null = arena.primitive(TypeKind::Null).unwrap();
        let opt_int = arena.opt(int).unwrap();
        // record { 0: int; 2: opt int; 3: null }
        let expected = arena
            .record(vec![
                Field::new(0_u32, int),
                Field::new(2_u32, opt_int),
                Field::new(3_u32, null),
            ])
            .unwrap();
        let v = de.get_value_with_type(&mut arena, expected).unwrap();
        let Value::Record(fields) = arena.value(v).unwrap().clone() else {
            panic!("expected a record");
        };
        assert_eq!(fields.len(), 3);
        assert_eq!(arena.as_i64(fields[0].value), Ok(5));
        assert_eq!(arena.value(fields[1].value), Ok(&Value::Opt(None)));
        assert_eq!(arena.value(fields[2].value), Ok(&Value::Null));
    }

    #[test]
    fn typed_decode_rejects_incompatible_types() {
        let mut arena = Arena::new();
        let mut de = Deserializer::new(b"DIDL\x00\x01\x71\x00", &mut arena).unwrap();
        let nat = arena.primitive(TypeKind::Nat).unwrap();
        assert_eq!(
            de.get_value_with_type(&mut arena, nat),
            Err(IdlError::InvalidArgument)
        );
    }

    #[derive(Default)]
    struct Events {
        starts: Vec<(usize, usize)>,
        ends: Vec<(usize, Result<(), IdlError>)>,
        charged: usize,
    }

    impl TraceSink for Events {
        fn mask(&self) -> TraceMask {
            TraceMask::DECODE | TraceMask::QUOTA
        }

        fn arg_start(&mut self, index: usize, _wire_type: TypeId, offset: usize) {
            self.starts.push((index, offset));
        }

        fn arg_end(&mut self, index: usize, _offset: usize, outcome: Result<(), IdlError>) {
            self.ends.push((index, outcome));
        }

        fn cost(&mut self, added: usize, _total: usize) {
            self.charged += added;
        }
    }

    #[test]
    fn trace_sees_argument_boundaries() {
        let bytes = b"DIDL\x00\x02\x7e\x7e\x01\x05";
        let mut arena = Arena::new();
        let mut events = Events::default();
        {
            let mut de = Deserializer::new(bytes, &mut arena).unwrap();
            de.set_trace(&mut events);
            de.get_value(&mut arena).unwrap();
            assert!(de.get_value(&mut arena).is_err());
        }
        assert_eq!(events.starts, vec![(0, 8), (1, 9)]);
        assert_eq!(events.ends, vec![(0, Ok(())), (1, Err(IdlError::InvalidArgument))]);
        assert_eq!(events.charged, 1);
    }
}
