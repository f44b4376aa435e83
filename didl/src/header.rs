// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Message preamble: magic, type table, and argument types.
//!
//! Table slot `N` is bound in the header's [`TypeEnv`] under the synthetic name `tableN`, and
//! every non-negative type reference resolves to a `var` of that name. Any slot index below the
//! table length is a valid reference, which is what makes recursive types expressible.

use crate::arena::{Arena, TypeId};
use crate::env::TypeEnv;
use crate::error::IdlError;
use crate::format::{MAGIC, Reader, Writer};
use crate::type_table::TypeTableBuilder;
use crate::types::{Field, FuncMode, FuncType, LOWEST_KNOWN_OPCODE, Label, Method, Type, TypeKind};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// Returns the synthetic environment name of type-table slot `index`.
#[must_use]
pub fn table_var_name(index: usize) -> String {
    format!("table{index}")
}

/// A parsed message header.
#[derive(Clone, Debug, Default)]
pub struct Header {
    /// Bindings for every table slot (`table0`, `table1`, ...).
    pub env: TypeEnv,
    /// The concrete type of each table slot, in table order.
    pub table: Vec<TypeId>,
    /// Wire type of each argument, in argument order.
    pub arg_types: Vec<TypeId>,
}

impl Header {
    /// Parses a header from the start of `bytes`.
    ///
    /// Returns the header and the number of bytes it occupies; the value stream starts right
    /// after.
    pub fn parse(bytes: &[u8], arena: &mut Arena) -> Result<(Self, usize), IdlError> {
        if bytes.len() < MAGIC.len() {
            return Err(IdlError::Truncated);
        }
        if bytes[..MAGIC.len()] != MAGIC {
            return Err(IdlError::InvalidArgument);
        }
        let mut r = Reader::at(bytes, MAGIC.len());
        let table_len = read_count(&mut r)?;

        let mut refs = RefResolver::new(arena, table_len)?;
        let mut env = TypeEnv::new();
        let mut table = Vec::new();
        table.try_reserve(table_len)?;
        for i in 0..table_len {
            let ty = parse_entry(&mut r, arena, &mut refs)?;
            env.insert(&table_var_name(i), ty)?;
            table.push(ty);
        }

        let arg_count = read_count(&mut r)?;
        let mut arg_types = Vec::new();
        arg_types.try_reserve(arg_count)?;
        for _ in 0..arg_count {
            arg_types.push(refs.read(&mut r, arena)?);
        }

        Ok((
            Self {
                env,
                table,
                arg_types,
            },
            r.offset(),
        ))
    }
}

/// Writes `DIDL` followed by the serialized type table and argument references.
pub fn write_header(
    table: &TypeTableBuilder,
    arena: &Arena,
    env: &TypeEnv,
) -> Result<Vec<u8>, IdlError> {
    let body = table.serialize(arena, env)?;
    let mut w = Writer::new();
    w.write_bytes(&MAGIC)?;
    w.write_bytes(&body)?;
    Ok(w.into_vec())
}

/// Reads an element count, rejecting counts that cannot fit in the remaining input.
///
/// Every table entry and argument reference takes at least one byte.
fn read_count(r: &mut Reader<'_>) -> Result<usize, IdlError> {
    let n = r.read_len()?;
    if n > r.remaining() {
        return Err(IdlError::Truncated);
    }
    Ok(n)
}

/// Turns wire type references into handles, sharing one node per slot and per primitive.
struct RefResolver {
    slots: Vec<TypeId>,
    primitives: [Option<TypeId>; 25],
}

impl RefResolver {
    fn new(arena: &mut Arena, table_len: usize) -> Result<Self, IdlError> {
        let mut slots = Vec::new();
        slots.try_reserve(table_len)?;
        for i in 0..table_len {
            slots.push(arena.var(&table_var_name(i))?);
        }
        Ok(Self {
            slots,
            primitives: [None; 25],
        })
    }

    fn read(&mut self, r: &mut Reader<'_>, arena: &mut Arena) -> Result<TypeId, IdlError> {
        let idx = r.read_sleb128_i64()?;
        self.resolve(idx, arena)
    }

    fn resolve(&mut self, idx: i64, arena: &mut Arena) -> Result<TypeId, IdlError> {
        if idx >= 0 {
            let i = usize::try_from(idx).map_err(|_| IdlError::InvalidArgument)?;
            return self.slots.get(i).copied().ok_or(IdlError::InvalidArgument);
        }
        let kind = TypeKind::primitive_from_opcode(idx).ok_or(IdlError::InvalidArgument)?;
        let slot = usize::try_from(-idx).map_err(|_| IdlError::InvalidArgument)?;
        match self.primitives.get(slot).copied().flatten() {
            Some(ty) => Ok(ty),
            None => {
                let ty = arena.primitive(kind)?;
                if let Some(s) = self.primitives.get_mut(slot) {
                    *s = Some(ty);
                }
                Ok(ty)
            }
        }
    }
}

fn parse_fields(
    r: &mut Reader<'_>,
    arena: &mut Arena,
    refs: &mut RefResolver,
) -> Result<Vec<Field>, IdlError> {
    let count = read_count(r)?;
    let mut fields = Vec::new();
    fields.try_reserve(count)?;
    let mut prev: Option<u32> = None;
    for _ in 0..count {
        let id = r.read_uleb128_u64()?;
        let id = u32::try_from(id).map_err(|_| IdlError::InvalidArgument)?;
        if prev.is_some_and(|p| id <= p) {
            return Err(IdlError::InvalidArgument);
        }
        prev = Some(id);
        let ty = refs.read(r, arena)?;
        fields.push(Field {
            label: Label::Id(id),
            ty,
        });
    }
    Ok(fields)
}

fn parse_type_list(
    r: &mut Reader<'_>,
    arena: &mut Arena,
    refs: &mut RefResolver,
) -> Result<Vec<TypeId>, IdlError> {
    let count = read_count(r)?;
    let mut out = Vec::new();
    out.try_reserve(count)?;
    for _ in 0..count {
        out.push(refs.read(r, arena)?);
    }
    Ok(out)
}

fn parse_entry(
    r: &mut Reader<'_>,
    arena: &mut Arena,
    refs: &mut RefResolver,
) -> Result<TypeId, IdlError> {
    let opcode = r.read_sleb128_i64()?;
    let ty = match opcode {
        -18 => Type::Opt(refs.read(r, arena)?),
        -19 => Type::Vec(refs.read(r, arena)?),
        -20 => Type::Record(parse_fields(r, arena, refs)?),
        -21 => Type::Variant(parse_fields(r, arena, refs)?),
        -22 => {
            let args = parse_type_list(r, arena, refs)?;
            let rets = parse_type_list(r, arena, refs)?;
            let mode_count = r.read_uleb128_u64()?;
            if mode_count > 1 {
                return Err(IdlError::InvalidArgument);
            }
            let mut modes = Vec::new();
            for _ in 0..mode_count {
                let m = r.read_uleb128_u64()?;
                modes.push(FuncMode::from_wire(m).ok_or(IdlError::InvalidArgument)?);
            }
            Type::Func(FuncType { args, rets, modes })
        }
        -23 => {
            let count = read_count(r)?;
            let mut methods: Vec<Method> = Vec::new();
            methods.try_reserve(count)?;
            for _ in 0..count {
                let len = r.read_len()?;
                let name = r.read_bytes(len)?;
                let name = core::str::from_utf8(name).map_err(|_| IdlError::InvalidArgument)?;
                if methods
                    .last()
                    .is_some_and(|prev| prev.name.as_bytes() >= name.as_bytes())
                {
                    return Err(IdlError::InvalidArgument);
                }
                let ty = refs.read(r, arena)?;
                methods.push(Method::new(name, ty));
            }
            Type::Service(methods)
        }
        op if op < LOWEST_KNOWN_OPCODE => {
            // A future type: skip its opaque payload.
            let len = r.read_len()?;
            r.skip(len)?;
            Type::Reserved
        }
        _ => return Err(IdlError::InvalidArgument),
    };
    arena.alloc_type(ty)
}
