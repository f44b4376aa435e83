// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Assembling outgoing messages.

use crate::arena::{Arena, TypeId, ValueId};
use crate::env::TypeEnv;
use crate::error::IdlError;
use crate::header::write_header;
use crate::serializer::ValueSerializer;
use crate::type_table::TypeTableBuilder;
use crate::types::TypeKind;
use alloc::string::String;
use alloc::vec::Vec;

/// Collects typed arguments and produces a complete message.
///
/// Types and values live in the caller's [`Arena`]; pass the same arena to every call. An
/// argument that fails to append leaves the builder as it was before the call.
///
/// ```
/// use didl::arena::Arena;
/// use didl::builder::Builder;
///
/// let mut arena = Arena::new();
/// let mut b = Builder::new();
/// b.arg_text(&mut arena, "hello")?;
/// b.arg_int(&mut arena, 42)?;
/// assert_eq!(b.serialize_hex(&arena)?, "4449444c0002717c0568656c6c6f2a");
/// # Ok::<(), didl::error::IdlError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct Builder {
    env: TypeEnv,
    table: TypeTableBuilder,
    values: ValueSerializer,
    primitives: [Option<TypeId>; 25],
}

impl Builder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the environment used to resolve `var`s in argument types.
    #[must_use]
    pub fn env(&self) -> &TypeEnv {
        &self.env
    }

    /// Returns the environment for binding named types before they are used.
    pub fn env_mut(&mut self) -> &mut TypeEnv {
        &mut self.env
    }

    /// Returns the number of arguments added so far.
    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.table.args().len()
    }

    /// Appends an argument of type `ty` with value `value`.
    ///
    /// The value is written by shape; it is the caller's job to pass a value of type `ty`.
    pub fn arg(&mut self, arena: &Arena, ty: TypeId, value: ValueId) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.table.push_arg(arena, &b.env, ty)?;
            b.values.write_value(arena, value)
        })
    }

    /// Runs `f`, undoing the table slots, argument and value bytes it added if it fails.
    fn atomically(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<(), IdlError>,
    ) -> Result<(), IdlError> {
        let table = self.table.checkpoint();
        let values = self.values.len();
        let res = f(self);
        if res.is_err() {
            self.table.rollback(table);
            self.values.truncate(values);
        }
        res
    }

    fn primitive_arg(&mut self, arena: &mut Arena, kind: TypeKind) -> Result<(), IdlError> {
        let slot = usize::try_from(-kind.opcode()).map_err(|_| IdlError::InvalidArgument)?;
        let cached = self
            .primitives
            .get_mut(slot)
            .ok_or(IdlError::InvalidArgument)?;
        let ty = match *cached {
            Some(ty) => ty,
            None => *cached.insert(arena.primitive(kind)?),
        };
        self.table.push_arg(arena, &self.env, ty)
    }

    /// Appends `null`.
    pub fn arg_null(&mut self, arena: &mut Arena) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Null)?;
            b.values.write_null()
        })
    }

    /// Appends a `bool`.
    pub fn arg_bool(&mut self, arena: &mut Arena, v: bool) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Bool)?;
            b.values.write_bool(v)
        })
    }

    /// Appends a `nat8`.
    pub fn arg_nat8(&mut self, arena: &mut Arena, v: u8) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Nat8)?;
            b.values.write_nat8(v)
        })
    }

    /// Appends a `nat16`.
    pub fn arg_nat16(&mut self, arena: &mut Arena, v: u16) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Nat16)?;
            b.values.write_nat16(v)
        })
    }

    /// Appends a `nat32`.
    pub fn arg_nat32(&mut self, arena: &mut Arena, v: u32) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Nat32)?;
            b.values.write_nat32(v)
        })
    }

    /// Appends a `nat64`.
    pub fn arg_nat64(&mut self, arena: &mut Arena, v: u64) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Nat64)?;
            b.values.write_nat64(v)
        })
    }

    /// Appends an `int8`.
    pub fn arg_int8(&mut self, arena: &mut Arena, v: i8) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Int8)?;
            b.values.write_int8(v)
        })
    }

    /// Appends an `int16`.
    pub fn arg_int16(&mut self, arena: &mut Arena, v: i16) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Int16)?;
            b.values.write_int16(v)
        })
    }

    /// Appends an `int32`.
    pub fn arg_int32(&mut self, arena: &mut Arena, v: i32) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Int32)?;
            b.values.write_int32(v)
        })
    }

    /// Appends an `int64`.
    pub fn arg_int64(&mut self, arena: &mut Arena, v: i64) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Int64)?;
            b.values.write_int64(v)
        })
    }

    /// Appends a `nat`.
    pub fn arg_nat(&mut self, arena: &mut Arena, v: u64) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Nat)?;
            b.values.write_nat(v)
        })
    }

    /// Appends an `int`.
    pub fn arg_int(&mut self, arena: &mut Arena, v: i64) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Int)?;
            b.values.write_int(v)
        })
    }

    /// Appends a `float32`.
    pub fn arg_float32(&mut self, arena: &mut Arena, v: f32) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Float32)?;
            b.values.write_float32(v)
        })
    }

    /// Appends a `float64`.
    pub fn arg_float64(&mut self, arena: &mut Arena, v: f64) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Float64)?;
            b.values.write_float64(v)
        })
    }

    /// Appends a `text`.
    pub fn arg_text(&mut self, arena: &mut Arena, v: &str) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Text)?;
            b.values.write_text(v)
        })
    }

    /// Appends a `blob` (`vec nat8`).
    pub fn arg_blob(&mut self, arena: &mut Arena, v: &[u8]) -> Result<(), IdlError> {
        let nat8 = arena.primitive(TypeKind::Nat8)?;
        let ty = arena.vec(nat8)?;
        self.atomically(|b| {
            b.table.push_arg(arena, &b.env, ty)?;
            b.values.write_blob(v)
        })
    }

    /// Appends a `principal`.
    pub fn arg_principal(&mut self, arena: &mut Arena, v: &[u8]) -> Result<(), IdlError> {
        self.atomically(|b| {
            b.primitive_arg(arena, TypeKind::Principal)?;
            b.values.write_principal(v)
        })
    }

    /// Produces the complete message: header followed by the values.
    pub fn serialize(&self, arena: &Arena) -> Result<Vec<u8>, IdlError> {
        let mut out = write_header(&self.table, arena, &self.env)?;
        out.try_reserve(self.values.as_slice().len())?;
        out.extend_from_slice(self.values.as_slice());
        Ok(out)
    }

    /// Produces the complete message as lowercase hex.
    pub fn serialize_hex(&self, arena: &Arena) -> Result<String, IdlError> {
        Ok(hex::encode(self.serialize(arena)?))
    }
}
