// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reshaping decoded values to an expected type, and skipping values on the wire.
//!
//! [`coerce`] assumes the caller already established `wire <: expected` (see
//! [`subtype`](crate::subtype)); it builds a new value in the expected shape and never mutates
//! the input value.

use crate::arena::{Arena, TypeId, ValueId};
use crate::deserializer::{DEFAULT_MAX_DEPTH, read_func, read_principal, read_service, read_text};
use crate::env::TypeEnv;
use crate::error::IdlError;
use crate::format::Reader;
use crate::subtype::is_optional_like;
use crate::types::{Type, TypeKind};
use crate::value::{Value, ValueField, uleb_to_sleb};
use alloc::vec::Vec;

/// Converts `value`, decoded at `wire`, into the shape of `expected`.
///
/// Fails with [`IdlError::InvalidArgument`] when the shapes cannot be reconciled, for example a
/// record missing a required field or a variant tag unknown to `expected`.
pub fn coerce(
    arena: &mut Arena,
    env: &TypeEnv,
    value: ValueId,
    wire: TypeId,
    expected: TypeId,
) -> Result<ValueId, IdlError> {
    if wire == expected {
        return Ok(value);
    }
    let w = env.trace(arena, wire)?;
    let e = env.trace(arena, expected)?;
    if w == e {
        return Ok(value);
    }
    let wt = arena.ty(w)?.clone();
    let et = arena.ty(e)?.clone();
    let (wk, ek) = (wt.kind(), et.kind());
    if ek == TypeKind::Reserved {
        return arena.alloc_value(Value::Reserved);
    }
    if wk == ek && wk.is_primitive() {
        return Ok(value);
    }

    match (&wt, &et) {
        (Type::Nat, Type::Int) => {
            let Value::Nat(span) = *arena.value(value)? else {
                return Err(IdlError::InvalidArgument);
            };
            let bytes = uleb_to_sleb(arena.bytes(span)?)?;
            arena.int_from_leb(&bytes)
        }
        (Type::Null, Type::Opt(_)) => arena.opt_value(None),
        (Type::Opt(wi), Type::Opt(ei)) => {
            let inner = match arena.value(value)? {
                Value::Opt(inner) => *inner,
                _ => return Err(IdlError::InvalidArgument),
            };
            let coerced = match inner {
                Some(v) => coerce_or_none(arena, env, v, *wi, *ei)?,
                None => None,
            };
            arena.opt_value(coerced)
        }
        (_, Type::Opt(ei)) => {
            let coerced = if is_optional_like(arena, env, *ei) {
                None
            } else {
                coerce_or_none(arena, env, value, w, *ei)?
            };
            arena.opt_value(coerced)
        }
        (Type::Vec(wi), Type::Vec(ei)) => coerce_vec(arena, env, value, *wi, *ei),
        (Type::Record(wf), Type::Record(ef)) => {
            let fields = match arena.value(value)? {
                Value::Record(fields) => fields.clone(),
                _ => return Err(IdlError::InvalidArgument),
            };
            let mut out = Vec::new();
            out.try_reserve(ef.len())?;
            for want in ef {
                let id = want.label.id();
                let have_value = fields.iter().find(|f| f.label.id() == id);
                let have_type = wf.iter().find(|f| f.label.id() == id);
                let v = match (have_value, have_type) {
                    (Some(hv), Some(ht)) => coerce(arena, env, hv.value, ht.ty, want.ty)?,
                    _ => missing_field(arena, env, want.ty)?,
                };
                out.push(ValueField::new(want.label.clone(), v));
            }
            arena.alloc_value(Value::Record(out))
        }
        (Type::Variant(wf), Type::Variant(ef)) => {
            let (id, inner) = match arena.value(value)? {
                Value::Variant { field, .. } => (field.label.id(), field.value),
                _ => return Err(IdlError::InvalidArgument),
            };
            let have = wf
                .iter()
                .find(|f| f.label.id() == id)
                .ok_or(IdlError::InvalidArgument)?;
            let (index, want) = ef
                .iter()
                .enumerate()
                .find(|(_, f)| f.label.id() == id)
                .ok_or(IdlError::InvalidArgument)?;
            let v = coerce(arena, env, inner, have.ty, want.ty)?;
            arena.alloc_value(Value::Variant {
                index: u64::try_from(index).map_err(|_| IdlError::Overflow)?,
                field: ValueField::new(want.label.clone(), v),
            })
        }
        _ if wk == ek => Ok(value),
        _ => Err(IdlError::InvalidArgument),
    }
}

/// Like [`coerce`], but a shape mismatch yields `None` instead of an error.
fn coerce_or_none(
    arena: &mut Arena,
    env: &TypeEnv,
    value: ValueId,
    wire: TypeId,
    expected: TypeId,
) -> Result<Option<ValueId>, IdlError> {
    match coerce(arena, env, value, wire, expected) {
        Ok(v) => Ok(Some(v)),
        Err(IdlError::InvalidArgument) => Ok(None),
        Err(e) => Err(e),
    }
}

fn coerce_vec(
    arena: &mut Arena,
    env: &TypeEnv,
    value: ValueId,
    wire_elem: TypeId,
    expected_elem: TypeId,
) -> Result<ValueId, IdlError> {
    let items: Vec<ValueId> = match arena.value(value)? {
        Value::Blob(span) => {
            let span = *span;
            if env.resolve(arena, expected_elem)?.kind() == TypeKind::Nat8 {
                return Ok(value);
            }
            let bytes = arena.bytes(span)?.to_vec();
            let mut items = Vec::new();
            items.try_reserve(bytes.len())?;
            for b in bytes {
                items.push(arena.alloc_value(Value::Nat8(b))?);
            }
            items
        }
        Value::Vec(items) => items.clone(),
        _ => return Err(IdlError::InvalidArgument),
    };
    let mut out = Vec::new();
    out.try_reserve(items.len())?;
    for item in items {
        out.push(coerce(arena, env, item, wire_elem, expected_elem)?);
    }
    arena.vec_value(out)
}

/// The value of an expected record field that the wire value lacks.
fn missing_field(arena: &mut Arena, env: &TypeEnv, ty: TypeId) -> Result<ValueId, IdlError> {
    match env.resolve(arena, ty)?.kind() {
        TypeKind::Opt => arena.opt_value(None),
        TypeKind::Null => arena.alloc_value(Value::Null),
        TypeKind::Reserved => arena.alloc_value(Value::Reserved),
        _ => Err(IdlError::InvalidArgument),
    }
}

/// Advances `pos` over one value of type `ty` without materializing it.
///
/// Validation matches decoding. Returns the number of bytes skipped; on error `pos` is left
/// unchanged.
pub fn skip_value(
    arena: &Arena,
    env: &TypeEnv,
    ty: TypeId,
    input: &[u8],
    pos: &mut usize,
) -> Result<usize, IdlError> {
    let mut r = Reader::at(input, *pos);
    skip_with(arena, env, ty, &mut r, &mut unmetered, DEFAULT_MAX_DEPTH)?;
    let skipped = r.offset() - *pos;
    *pos = r.offset();
    Ok(skipped)
}

fn unmetered(_: usize) -> Result<(), IdlError> {
    Ok(())
}

/// Skips one value, reporting the work done to `meter` as it goes.
///
/// `meter` sees the bytes each node reads and, for a `vec`, its element count before any
/// element is visited.
pub(crate) fn skip_with(
    arena: &Arena,
    env: &TypeEnv,
    ty: TypeId,
    r: &mut Reader<'_>,
    meter: &mut dyn FnMut(usize) -> Result<(), IdlError>,
    depth: usize,
) -> Result<(), IdlError> {
    let Some(depth) = depth.checked_sub(1) else {
        return Err(IdlError::Overflow);
    };
    let node = env.resolve(arena, ty)?;
    let start = r.offset();
    match node {
        Type::Null | Type::Reserved => {}
        Type::Empty | Type::Var(_) => return Err(IdlError::InvalidArgument),
        Type::Bool => {
            if r.read_u8()? > 1 {
                return Err(IdlError::InvalidArgument);
            }
        }
        Type::Nat8 | Type::Int8 => r.skip(1)?,
        Type::Nat16 | Type::Int16 => r.skip(2)?,
        Type::Nat32 | Type::Int32 | Type::Float32 => r.skip(4)?,
        Type::Nat64 | Type::Int64 | Type::Float64 => r.skip(8)?,
        Type::Nat | Type::Int => {
            r.read_leb128_raw()?;
        }
        Type::Text => {
            read_text(r)?;
        }
        Type::Principal => {
            read_principal(r)?;
        }
        Type::Func(_) => {
            read_func(r)?;
        }
        Type::Service(_) => {
            read_service(r)?;
        }
        Type::Opt(inner) => {
            match r.read_u8()? {
                0 => {}
                1 => {
                    meter(r.offset() - start)?;
                    return skip_with(arena, env, *inner, r, meter, depth);
                }
                _ => return Err(IdlError::InvalidArgument),
            }
        }
        Type::Vec(elem) => {
            let count = r.read_len()?;
            meter(r.offset() - start)?;
            meter(count)?;
            if env.resolve(arena, *elem)?.kind() == TypeKind::Nat8 {
                return r.skip(count);
            }
            for _ in 0..count {
                skip_with(arena, env, *elem, r, meter, depth)?;
            }
            return Ok(());
        }
        Type::Record(fields) => {
            for f in fields {
                skip_with(arena, env, f.ty, r, meter, depth)?;
            }
            return Ok(());
        }
        Type::Variant(fields) => {
            let index = r.read_uleb128_u64()?;
            let field = usize::try_from(index)
                .ok()
                .and_then(|i| fields.get(i))
                .ok_or(IdlError::InvalidArgument)?;
            meter(r.offset() - start)?;
            return skip_with(arena, env, field.ty, r, meter, depth);
        }
    }
    meter(r.offset() - start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtype::{SubtypeResult, subtype};
    use crate::types::Field;
    use crate::value::values_equal;
    use alloc::vec;

    #[test]
    fn nat_widens_to_int_with_sign_byte() {
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let nat = arena.primitive(TypeKind::Nat).unwrap();
        let int = arena.primitive(TypeKind::Int).unwrap();
        let v = arena.nat_value(64).unwrap();
        let c = coerce(&mut arena, &env, v, nat, int).unwrap();
        assert_eq!(arena.as_i64(c), Ok(64));
        assert!(matches!(arena.value(c).unwrap(), Value::Int(_)));
    }

    #[test]
    fn record_gains_missing_optional_fields() {
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let nat = arena.primitive(TypeKind::Nat).unwrap();
        let text = arena.primitive(TypeKind::Text).unwrap();
        let opt_text = arena.opt(text).unwrap();
        let wire = arena
            .record(vec![Field::new("a", nat), Field::new("extra", text)])
            .unwrap();
        let expected = arena
            .record(vec![Field::new("a", nat), Field::new("note", opt_text)])
            .unwrap();
        assert_eq!(subtype(&arena, &env, wire, expected), Ok(SubtypeResult::Ok));

        let a = arena.nat_value(7).unwrap();
        let extra = arena.text_value("dropped").unwrap();
        let v = arena
            .record_value(vec![ValueField::new("a", a), ValueField::new("extra", extra)])
            .unwrap();
        let c = coerce(&mut arena, &env, v, wire, expected).unwrap();
        let Value::Record(fields) = arena.value(c).unwrap().clone() else {
            panic!("expected a record");
        };
        assert_eq!(fields.len(), 2);
        let note = fields.iter().find(|f| f.label.name() == Some("note")).unwrap();
        assert_eq!(arena.value(note.value).unwrap(), &Value::Opt(None));
    }

    #[test]
    fn record_missing_required_field_fails() {
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let nat = arena.primitive(TypeKind::Nat).unwrap();
        let wire = arena.record(vec![Field::new("a", nat)]).unwrap();
        let expected = arena
            .record(vec![Field::new("a", nat), Field::new("b", nat)])
            .unwrap();
        let a = arena.nat_value(1).unwrap();
        let v = arena.record_value(vec![ValueField::new("a", a)]).unwrap();
        assert_eq!(
            coerce(&mut arena, &env, v, wire, expected),
            Err(IdlError::InvalidArgument)
        );
    }

    #[test]
    fn variant_index_follows_expected_type() {
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let null = arena.primitive(TypeKind::Null).unwrap();
        let wire = arena.variant(vec![Field::new("b", null)]).unwrap();
        let expected = arena
            .variant(vec![Field::new("a", null), Field::new("b", null)])
            .unwrap();
        let n = arena.alloc_value(Value::Null).unwrap();
        let v = arena.variant_value(0, "b", n).unwrap();
        let c = coerce(&mut arena, &env, v, wire, expected).unwrap();
        match arena.value(c).unwrap() {
            Value::Variant { index, field } => {
                assert_eq!(*index, 1);
                assert_eq!(field.label.name(), Some("b"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn opt_falls_back_to_none() {
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let nat = arena.primitive(TypeKind::Nat).unwrap();
        let text = arena.primitive(TypeKind::Text).unwrap();
        let opt_nat = arena.opt(nat).unwrap();
        let opt_text = arena.opt(text).unwrap();

        let n = arena.nat_value(3).unwrap();
        let some = arena.opt_value(Some(n)).unwrap();
        let c = coerce(&mut arena, &env, some, opt_nat, opt_text).unwrap();
        assert_eq!(arena.value(c).unwrap(), &Value::Opt(None));

        // A bare value lifts into `opt` when it fits the inner type.
        let c = coerce(&mut arena, &env, n, nat, opt_nat).unwrap();
        let Value::Opt(Some(inner)) = *arena.value(c).unwrap() else {
            panic!("expected Some");
        };
        assert_eq!(arena.as_u64(inner), Ok(3));
    }

    #[test]
    fn blob_becomes_vec_when_element_changes() {
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let nat8 = arena.primitive(TypeKind::Nat8).unwrap();
        let reserved = arena.primitive(TypeKind::Reserved).unwrap();
        let blob_ty = arena.vec(nat8).unwrap();
        let other_blob_ty = arena.vec(nat8).unwrap();
        let reserved_vec = arena.vec(reserved).unwrap();
        let blob = arena.blob_value(&[1, 2]).unwrap();

        let same = coerce(&mut arena, &env, blob, blob_ty, other_blob_ty).unwrap();
        assert_eq!(same, blob);
        let widened = coerce(&mut arena, &env, blob, blob_ty, reserved_vec).unwrap();
        match arena.value(widened).unwrap() {
            Value::Vec(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(arena.value(items[0]).unwrap(), &Value::Reserved);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn coercion_is_idempotent() {
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let nat = arena.primitive(TypeKind::Nat).unwrap();
        let int = arena.primitive(TypeKind::Int).unwrap();
        let wire = arena.record(vec![Field::new("x", nat)]).unwrap();
        let expected = arena.record(vec![Field::new("x", int)]).unwrap();
        let x = arena.nat_value(200).unwrap();
        let v = arena.record_value(vec![ValueField::new("x", x)]).unwrap();
        let same_shape = arena.record(vec![Field::new("x", int)]).unwrap();
        let once = coerce(&mut arena, &env, v, wire, expected).unwrap();
        let twice = coerce(&mut arena, &env, once, expected, same_shape).unwrap();
        assert_ne!(once, twice);
        assert_eq!(values_equal(&arena, once, &arena, twice), Ok(true));
    }

    #[test]
    fn skip_matches_decoding() {
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let text = arena.primitive(TypeKind::Text).unwrap();
        let nat8 = arena.primitive(TypeKind::Nat8).unwrap();
        let opt_text = arena.opt(text).unwrap();
        let blob = arena.vec(nat8).unwrap();
        let empty = arena.primitive(TypeKind::Empty).unwrap();

        let input = [0x01, 0x02, b'h', b'i', 0x03, 1, 2, 3, 0xff];
        let mut pos = 0;
        assert_eq!(skip_value(&arena, &env, opt_text, &input, &mut pos), Ok(4));
        assert_eq!(skip_value(&arena, &env, blob, &input, &mut pos), Ok(4));
        assert_eq!(pos, 8);
        assert_eq!(
            skip_value(&arena, &env, empty, &input, &mut pos),
            Err(IdlError::InvalidArgument)
        );
        assert_eq!(
            skip_value(&arena, &env, text, &[0x02, 0xc3, 0x28], &mut 0),
            Err(IdlError::InvalidArgument)
        );
        assert_eq!(
            skip_value(&arena, &env, text, &[0x05, b'a'], &mut 0),
            Err(IdlError::Truncated)
        );
    }
}
