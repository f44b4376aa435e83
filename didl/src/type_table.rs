// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building the type table of an outgoing message.
//!
//! [`TypeTableBuilder::build_type`] assigns each distinct composite type one table slot.
//! Primitives never get a slot; they are referenced by their opcode. A slot is reserved and
//! recorded *before* the type's children are visited, so a recursive type refers back to its own
//! slot instead of recursing forever. Both a `var` handle and the handle it resolves to are
//! recorded, so distinct `var` nodes naming the same type share one slot.

use crate::arena::{Arena, TypeId};
use crate::env::TypeEnv;
use crate::error::IdlError;
use crate::format::Writer;
use crate::types::{Type, TypeKind};
use alloc::vec::Vec;
use hashbrown::HashMap;

/// Nesting depth past which structural comparison gives up and reports "not equal".
const MAX_DEDUP_DEPTH: usize = 32;

/// A point to roll a [`TypeTableBuilder`] back to. See [`TypeTableBuilder::checkpoint`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    entries: usize,
    args: usize,
}

/// Incrementally assigns type-table slots and records argument types.
#[derive(Clone, Debug, Default)]
pub struct TypeTableBuilder {
    /// Handle -> table slot.
    slots: HashMap<TypeId, usize>,
    /// Encoded entries in slot order. A slot is empty while its children are being built.
    entries: Vec<Vec<u8>>,
    /// The concrete type registered in each slot.
    registered: Vec<TypeId>,
    args: Vec<TypeId>,
}

impl TypeTableBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of table slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no slot has been assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the argument types pushed so far.
    #[must_use]
    pub fn args(&self) -> &[TypeId] {
        &self.args
    }

    /// Records the current slot and argument counts.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            entries: self.entries.len(),
            args: self.args.len(),
        }
    }

    /// Forgets every slot and argument added since `cp` was taken.
    pub fn rollback(&mut self, cp: Checkpoint) {
        self.entries.truncate(cp.entries);
        self.registered.truncate(cp.entries);
        self.args.truncate(cp.args);
        self.slots.retain(|_, slot| *slot < cp.entries);
    }

    /// Appends an argument type, building its table entries first.
    pub fn push_arg(&mut self, arena: &Arena, env: &TypeEnv, ty: TypeId) -> Result<(), IdlError> {
        self.build_type(arena, env, ty)?;
        self.args.try_reserve(1)?;
        self.args.push(ty);
        Ok(())
    }

    /// Ensures `ty` is representable and returns its wire reference.
    ///
    /// The reference is the negative opcode for primitives and the table slot otherwise.
    pub fn build_type(&mut self, arena: &Arena, env: &TypeEnv, ty: TypeId) -> Result<i64, IdlError> {
        if let Some(&slot) = self.slots.get(&ty) {
            return slot_ref(slot);
        }
        let actual = env.trace(arena, ty)?;
        if let Some(&slot) = self.slots.get(&actual) {
            self.slots.insert(ty, slot);
            return slot_ref(slot);
        }
        let node = arena.ty(actual)?;
        if node.is_primitive() {
            return Ok(node.kind().opcode());
        }
        if let Some(slot) = self.find_structural(arena, env, actual)? {
            self.slots.insert(ty, slot);
            self.slots.insert(actual, slot);
            return slot_ref(slot);
        }

        let slot = self.entries.len();
        self.entries.try_reserve(1)?;
        self.registered.try_reserve(1)?;
        self.slots.try_reserve(2).map_err(|_| IdlError::Alloc)?;
        self.entries.push(Vec::new());
        self.registered.push(actual);
        self.slots.insert(ty, slot);
        self.slots.insert(actual, slot);

        for child in children(node) {
            self.build_type(arena, env, child)?;
        }
        let entry = self.encode_entry(arena, env, node)?;
        self.entries[slot] = entry;
        slot_ref(slot)
    }

    /// Writes the wire reference of an already-built type.
    ///
    /// Fails with [`IdlError::InvalidArgument`] if `ty` is composite and was never built.
    pub fn encode_type_ref(
        &self,
        arena: &Arena,
        env: &TypeEnv,
        ty: TypeId,
        out: &mut Writer,
    ) -> Result<(), IdlError> {
        let node = arena.ty(ty)?;
        if node.is_primitive() {
            return out.write_sleb128_i64(node.kind().opcode());
        }
        if let Some(&slot) = self.slots.get(&ty) {
            return out.write_sleb128_i64(slot_ref(slot)?);
        }
        if node.kind() == TypeKind::Var {
            let actual = env.trace(arena, ty)?;
            let resolved = arena.ty(actual)?;
            if resolved.is_primitive() {
                return out.write_sleb128_i64(resolved.kind().opcode());
            }
            if let Some(&slot) = self.slots.get(&actual) {
                return out.write_sleb128_i64(slot_ref(slot)?);
            }
        }
        Err(IdlError::InvalidArgument)
    }

    /// Serializes the table and argument list (without the magic prefix).
    pub fn serialize(&self, arena: &Arena, env: &TypeEnv) -> Result<Vec<u8>, IdlError> {
        let mut w = Writer::new();
        w.write_len(self.entries.len())?;
        for entry in &self.entries {
            w.write_bytes(entry)?;
        }
        w.write_len(self.args.len())?;
        for &arg in &self.args {
            self.encode_type_ref(arena, env, arg, &mut w)?;
        }
        Ok(w.into_vec())
    }

    fn encode_entry(&self, arena: &Arena, env: &TypeEnv, node: &Type) -> Result<Vec<u8>, IdlError> {
        let mut w = Writer::new();
        w.write_sleb128_i64(node.kind().opcode())?;
        match node {
            Type::Opt(inner) | Type::Vec(inner) => self.encode_type_ref(arena, env, *inner, &mut w)?,
            Type::Record(fields) | Type::Variant(fields) => {
                w.write_len(fields.len())?;
                for f in fields {
                    w.write_uleb128_u64(u64::from(f.label.id()))?;
                    self.encode_type_ref(arena, env, f.ty, &mut w)?;
                }
            }
            Type::Func(func) => {
                w.write_len(func.args.len())?;
                for &a in &func.args {
                    self.encode_type_ref(arena, env, a, &mut w)?;
                }
                w.write_len(func.rets.len())?;
                for &r in &func.rets {
                    self.encode_type_ref(arena, env, r, &mut w)?;
                }
                w.write_len(func.modes.len())?;
                for m in &func.modes {
                    w.write_u8(m.to_wire())?;
                }
            }
            Type::Service(methods) => {
                w.write_len(methods.len())?;
                for m in methods {
                    w.write_len(m.name.len())?;
                    w.write_bytes(m.name.as_bytes())?;
                    self.encode_type_ref(arena, env, m.ty, &mut w)?;
                }
            }
            _ => return Err(IdlError::InvalidArgument),
        }
        Ok(w.into_vec())
    }

    fn find_structural(
        &self,
        arena: &Arena,
        env: &TypeEnv,
        ty: TypeId,
    ) -> Result<Option<usize>, IdlError> {
        for (slot, &existing) in self.registered.iter().enumerate() {
            if types_equal(arena, env, existing, ty, 0)? {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }
}

fn slot_ref(slot: usize) -> Result<i64, IdlError> {
    i64::try_from(slot).map_err(|_| IdlError::Overflow)
}

/// Child type handles of a composite node, in encoding order.
fn children(node: &Type) -> Vec<TypeId> {
    match node {
        Type::Opt(inner) | Type::Vec(inner) => alloc::vec![*inner],
        Type::Record(fields) | Type::Variant(fields) => fields.iter().map(|f| f.ty).collect(),
        Type::Func(func) => func.args.iter().chain(&func.rets).copied().collect(),
        Type::Service(methods) => methods.iter().map(|m| m.ty).collect(),
        _ => Vec::new(),
    }
}

/// Structural equality, bounded by [`MAX_DEDUP_DEPTH`].
///
/// Two `var`s with the same name are equal; otherwise `var`s are resolved first.
fn types_equal(
    arena: &Arena,
    env: &TypeEnv,
    a: TypeId,
    b: TypeId,
    depth: usize,
) -> Result<bool, IdlError> {
    if a == b {
        return Ok(true);
    }
    if depth > MAX_DEDUP_DEPTH {
        return Ok(false);
    }
    if let (Type::Var(x), Type::Var(y)) = (arena.ty(a)?, arena.ty(b)?)
        && x == y
    {
        return Ok(true);
    }
    let (a, b) = (env.trace(arena, a)?, env.trace(arena, b)?);
    if a == b {
        return Ok(true);
    }
    let next = depth + 1;
    let lists_equal = |xs: &[TypeId], ys: &[TypeId]| -> Result<bool, IdlError> {
        if xs.len() != ys.len() {
            return Ok(false);
        }
        for (&x, &y) in xs.iter().zip(ys) {
            if !types_equal(arena, env, x, y, next)? {
                return Ok(false);
            }
        }
        Ok(true)
    };
    Ok(match (arena.ty(a)?, arena.ty(b)?) {
        (Type::Opt(x), Type::Opt(y)) | (Type::Vec(x), Type::Vec(y)) => {
            types_equal(arena, env, *x, *y, next)?
        }
        (Type::Record(xs), Type::Record(ys)) | (Type::Variant(xs), Type::Variant(ys)) => {
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (x, y) in xs.iter().zip(ys) {
                if x.label.id() != y.label.id() || !types_equal(arena, env, x.ty, y.ty, next)? {
                    return Ok(false);
                }
            }
            true
        }
        (Type::Func(x), Type::Func(y)) => {
            x.modes == y.modes && lists_equal(&x.args, &y.args)? && lists_equal(&x.rets, &y.rets)?
        }
        (Type::Service(xs), Type::Service(ys)) => {
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (x, y) in xs.iter().zip(ys) {
                if x.name != y.name || !types_equal(arena, env, x.ty, y.ty, next)? {
                    return Ok(false);
                }
            }
            true
        }
        (x, y) => x.is_primitive() && x.kind() == y.kind(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;
    use alloc::vec;

    #[test]
    fn primitives_take_no_slot() {
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let text = arena.primitive(TypeKind::Text).unwrap();
        let int = arena.primitive(TypeKind::Int).unwrap();
        let mut b = TypeTableBuilder::new();
        b.push_arg(&arena, &env, text).unwrap();
        b.push_arg(&arena, &env, int).unwrap();
        assert!(b.is_empty());
        assert_eq!(hex::encode(b.serialize(&arena, &env).unwrap()), "0002717c");
    }

    #[test]
    fn identical_composites_share_a_slot() {
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let n1 = arena.primitive(TypeKind::Nat8).unwrap();
        let n2 = arena.primitive(TypeKind::Nat8).unwrap();
        let v1 = arena.vec(n1).unwrap();
        let v2 = arena.vec(n2).unwrap();
        let mut b = TypeTableBuilder::new();
        assert_eq!(b.build_type(&arena, &env, v1), Ok(0));
        assert_eq!(b.build_type(&arena, &env, v2), Ok(0));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn recursive_type_refers_to_its_own_slot() {
        // list = opt record { head: nat; tail: list }
        let mut arena = Arena::new();
        let mut env = TypeEnv::new();
        let nat = arena.primitive(TypeKind::Nat).unwrap();
        let list_var = arena.var("list").unwrap();
        let node = arena
            .record(vec![Field::new("head", nat), Field::new("tail", list_var)])
            .unwrap();
        let list = arena.opt(node).unwrap();
        env.insert("list", list).unwrap();

        let mut b = TypeTableBuilder::new();
        b.push_arg(&arena, &env, list_var).unwrap();
        assert_eq!(b.len(), 2);
        let mut w = Writer::new();
        b.encode_type_ref(&arena, &env, list_var, &mut w).unwrap();
        assert_eq!(w.as_slice(), &[0x00]);

        // A second, distinct var node naming the same type reuses the slot.
        let again = arena.var("list").unwrap();
        assert_eq!(b.build_type(&arena, &env, again), Ok(0));
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn unbound_var_is_rejected() {
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let v = arena.var("nope").unwrap();
        let mut b = TypeTableBuilder::new();
        assert_eq!(b.push_arg(&arena, &env, v), Err(IdlError::InvalidArgument));
    }

    #[test]
    fn rollback_forgets_half_built_slots() {
        // record { a: opt nat; b: ghost } reserves slots before the unbound var fails.
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let nat = arena.primitive(TypeKind::Nat).unwrap();
        let opt_nat = arena.opt(nat).unwrap();
        let ghost = arena.var("ghost").unwrap();
        let rec = arena
            .record(vec![Field::new("a", opt_nat), Field::new("b", ghost)])
            .unwrap();

        let mut b = TypeTableBuilder::new();
        b.push_arg(&arena, &env, nat).unwrap();
        let cp = b.checkpoint();
        assert_eq!(b.push_arg(&arena, &env, rec), Err(IdlError::InvalidArgument));
        assert!(!b.is_empty());
        b.rollback(cp);
        assert!(b.is_empty());
        assert_eq!(b.args(), &[nat]);

        // The rolled-back opt is rebuilt into a fresh slot 0.
        assert_eq!(b.build_type(&arena, &env, opt_nat), Ok(0));
        assert_eq!(hex::encode(b.serialize(&arena, &env).unwrap()), "016e7d017d");
    }

    #[test]
    fn unbuilt_composite_has_no_reference() {
        let mut arena = Arena::new();
        let env = TypeEnv::new();
        let t = arena.primitive(TypeKind::Text).unwrap();
        let o = arena.opt(t).unwrap();
        let b = TypeTableBuilder::new();
        let mut w = Writer::new();
        assert_eq!(
            b.encode_type_ref(&arena, &env, o, &mut w),
            Err(IdlError::InvalidArgument)
        );
    }
}
