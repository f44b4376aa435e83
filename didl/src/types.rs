// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The in-memory type model.
//!
//! Types are immutable once stored in an [`Arena`]. Composite types refer to their children by
//! [`TypeId`], and named (possibly recursive) types are expressed with [`Type::Var`], resolved
//! through a [`TypeEnv`](crate::env::TypeEnv).

use crate::arena::{Arena, TypeId};
use crate::error::IdlError;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

/// Hashes a field name into its wire label id.
///
/// `h = h * 223 + byte` over the UTF-8 bytes, wrapping at 32 bits.
#[must_use]
pub fn idl_hash(name: &str) -> u32 {
    name.bytes()
        .fold(0_u32, |h, b| h.wrapping_mul(223).wrapping_add(u32::from(b)))
}

/// A record/variant field label.
///
/// Only the numeric id travels on the wire; the name is kept for display.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    /// A raw numeric id (tuple-style or decoded from the wire).
    Id(u32),
    /// A named label together with its hash.
    Named {
        /// The field name.
        name: Box<str>,
        /// `idl_hash(name)`.
        id: u32,
    },
}

impl Label {
    /// Creates a named label, hashing `name`.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self::Named {
            name: name.into(),
            id: idl_hash(name),
        }
    }

    /// Returns the wire id.
    #[must_use]
    pub fn id(&self) -> u32 {
        match self {
            Self::Id(id) | Self::Named { id, .. } => *id,
        }
    }

    /// Returns the name, if this label has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Named { name, .. } => Some(name),
        }
    }
}

impl From<u32> for Label {
    fn from(id: u32) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Named { name, .. } => write!(f, "{name}"),
        }
    }
}

/// A record or variant field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    /// Field label.
    pub label: Label,
    /// Field type.
    pub ty: TypeId,
}

impl Field {
    /// Creates a field.
    #[must_use]
    pub fn new(label: impl Into<Label>, ty: TypeId) -> Self {
        Self {
            label: label.into(),
            ty,
        }
    }
}

/// Function annotation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FuncMode {
    /// `query`
    Query,
    /// `oneway`
    Oneway,
    /// `composite_query`
    CompositeQuery,
}

impl FuncMode {
    /// Returns the wire byte for this mode.
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        match self {
            Self::Query => 1,
            Self::Oneway => 2,
            Self::CompositeQuery => 3,
        }
    }

    /// Parses a wire mode byte.
    #[must_use]
    pub const fn from_wire(v: u64) -> Option<Self> {
        match v {
            1 => Some(Self::Query),
            2 => Some(Self::Oneway),
            3 => Some(Self::CompositeQuery),
            _ => None,
        }
    }
}

/// A function signature.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FuncType {
    /// Argument types.
    pub args: Vec<TypeId>,
    /// Return types.
    pub rets: Vec<TypeId>,
    /// At most one annotation.
    pub modes: Vec<FuncMode>,
}

/// A service method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Method {
    /// Method name.
    pub name: Box<str>,
    /// Method type (a `func`, possibly behind a `var`).
    pub ty: TypeId,
}

impl Method {
    /// Creates a method.
    #[must_use]
    pub fn new(name: &str, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// The kind of a [`Type`], without payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs, reason = "variant names are the IDL keywords")]
pub enum TypeKind {
    Null,
    Bool,
    Nat,
    Int,
    Nat8,
    Nat16,
    Nat32,
    Nat64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Reserved,
    Empty,
    Principal,
    Opt,
    Vec,
    Record,
    Variant,
    Func,
    Service,
    Var,
}

/// Lowest opcode assigned to a known type. Anything below marks a future extension.
pub const LOWEST_KNOWN_OPCODE: i64 = -24;

impl TypeKind {
    const PRIMITIVES: [Self; 18] = [
        Self::Null,
        Self::Bool,
        Self::Nat,
        Self::Int,
        Self::Nat8,
        Self::Nat16,
        Self::Nat32,
        Self::Nat64,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float32,
        Self::Float64,
        Self::Text,
        Self::Reserved,
        Self::Empty,
        Self::Principal,
    ];

    /// Returns the fixed negative wire tag for this kind.
    ///
    /// `var` has no wire tag of its own (it is written as a table index); it reports `0`.
    #[must_use]
    pub const fn opcode(self) -> i64 {
        match self {
            Self::Null => -1,
            Self::Bool => -2,
            Self::Nat => -3,
            Self::Int => -4,
            Self::Nat8 => -5,
            Self::Nat16 => -6,
            Self::Nat32 => -7,
            Self::Nat64 => -8,
            Self::Int8 => -9,
            Self::Int16 => -10,
            Self::Int32 => -11,
            Self::Int64 => -12,
            Self::Float32 => -13,
            Self::Float64 => -14,
            Self::Text => -15,
            Self::Reserved => -16,
            Self::Empty => -17,
            Self::Opt => -18,
            Self::Vec => -19,
            Self::Record => -20,
            Self::Variant => -21,
            Self::Func => -22,
            Self::Service => -23,
            Self::Principal => -24,
            Self::Var => 0,
        }
    }

    /// Maps a primitive opcode back to its kind.
    #[must_use]
    pub fn primitive_from_opcode(opcode: i64) -> Option<Self> {
        Self::PRIMITIVES
            .into_iter()
            .find(|k| k.opcode() == opcode)
    }

    /// Returns `true` unless this is a composite or `var` kind.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        !matches!(
            self,
            Self::Opt
                | Self::Vec
                | Self::Record
                | Self::Variant
                | Self::Func
                | Self::Service
                | Self::Var
        )
    }

    /// Returns the IDL keyword for this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Nat => "nat",
            Self::Int => "int",
            Self::Nat8 => "nat8",
            Self::Nat16 => "nat16",
            Self::Nat32 => "nat32",
            Self::Nat64 => "nat64",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Text => "text",
            Self::Reserved => "reserved",
            Self::Empty => "empty",
            Self::Principal => "principal",
            Self::Opt => "opt",
            Self::Vec => "vec",
            Self::Record => "record",
            Self::Variant => "variant",
            Self::Func => "func",
            Self::Service => "service",
            Self::Var => "var",
        }
    }
}

/// An IDL type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs, reason = "primitive variant names are the IDL keywords")]
pub enum Type {
    Null,
    Bool,
    Nat,
    Int,
    Nat8,
    Nat16,
    Nat32,
    Nat64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Reserved,
    Empty,
    Principal,
    /// `opt inner`
    Opt(TypeId),
    /// `vec inner`
    Vec(TypeId),
    /// Fields sorted by strictly increasing label id.
    Record(Vec<Field>),
    /// Fields sorted by strictly increasing label id.
    Variant(Vec<Field>),
    /// `func (args) -> (rets) modes`
    Func(FuncType),
    /// Methods sorted by strictly increasing name.
    Service(Vec<Method>),
    /// A named indirection resolved through the type environment.
    Var(Box<str>),
}

impl Type {
    /// Returns the primitive type for `kind`, or `None` for composite kinds.
    #[must_use]
    pub fn primitive(kind: TypeKind) -> Option<Self> {
        Some(match kind {
            TypeKind::Null => Self::Null,
            TypeKind::Bool => Self::Bool,
            TypeKind::Nat => Self::Nat,
            TypeKind::Int => Self::Int,
            TypeKind::Nat8 => Self::Nat8,
            TypeKind::Nat16 => Self::Nat16,
            TypeKind::Nat32 => Self::Nat32,
            TypeKind::Nat64 => Self::Nat64,
            TypeKind::Int8 => Self::Int8,
            TypeKind::Int16 => Self::Int16,
            TypeKind::Int32 => Self::Int32,
            TypeKind::Int64 => Self::Int64,
            TypeKind::Float32 => Self::Float32,
            TypeKind::Float64 => Self::Float64,
            TypeKind::Text => Self::Text,
            TypeKind::Reserved => Self::Reserved,
            TypeKind::Empty => Self::Empty,
            TypeKind::Principal => Self::Principal,
            _ => return None,
        })
    }

    /// Returns the kind of this type.
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Null => TypeKind::Null,
            Self::Bool => TypeKind::Bool,
            Self::Nat => TypeKind::Nat,
            Self::Int => TypeKind::Int,
            Self::Nat8 => TypeKind::Nat8,
            Self::Nat16 => TypeKind::Nat16,
            Self::Nat32 => TypeKind::Nat32,
            Self::Nat64 => TypeKind::Nat64,
            Self::Int8 => TypeKind::Int8,
            Self::Int16 => TypeKind::Int16,
            Self::Int32 => TypeKind::Int32,
            Self::Int64 => TypeKind::Int64,
            Self::Float32 => TypeKind::Float32,
            Self::Float64 => TypeKind::Float64,
            Self::Text => TypeKind::Text,
            Self::Reserved => TypeKind::Reserved,
            Self::Empty => TypeKind::Empty,
            Self::Principal => TypeKind::Principal,
            Self::Opt(_) => TypeKind::Opt,
            Self::Vec(_) => TypeKind::Vec,
            Self::Record(_) => TypeKind::Record,
            Self::Variant(_) => TypeKind::Variant,
            Self::Func(_) => TypeKind::Func,
            Self::Service(_) => TypeKind::Service,
            Self::Var(_) => TypeKind::Var,
        }
    }

    /// Returns `true` if this type never occupies a type-table slot.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.kind().is_primitive()
    }

    /// Returns the fields of a record or variant.
    #[must_use]
    pub fn fields(&self) -> Option<&[Field]> {
        match self {
            Self::Record(fields) | Self::Variant(fields) => Some(fields),
            _ => None,
        }
    }
}

/// Sorts fields by id and rejects duplicate ids.
fn canonical_fields(mut fields: Vec<Field>) -> Result<Vec<Field>, IdlError> {
    fields.sort_by_key(|f| f.label.id());
    if fields.windows(2).any(|w| w[0].label.id() == w[1].label.id()) {
        return Err(IdlError::InvalidArgument);
    }
    Ok(fields)
}

impl Arena {
    /// Stores a primitive type.
    ///
    /// Fails with [`IdlError::InvalidArgument`] for composite kinds.
    pub fn primitive(&mut self, kind: TypeKind) -> Result<TypeId, IdlError> {
        let ty = Type::primitive(kind).ok_or(IdlError::InvalidArgument)?;
        self.alloc_type(ty)
    }

    /// Stores `opt inner`.
    pub fn opt(&mut self, inner: TypeId) -> Result<TypeId, IdlError> {
        self.alloc_type(Type::Opt(inner))
    }

    /// Stores `vec inner`.
    pub fn vec(&mut self, inner: TypeId) -> Result<TypeId, IdlError> {
        self.alloc_type(Type::Vec(inner))
    }

    /// Stores a record type. Fields are put in label-id order; duplicate ids are rejected.
    pub fn record(&mut self, fields: Vec<Field>) -> Result<TypeId, IdlError> {
        let fields = canonical_fields(fields)?;
        self.alloc_type(Type::Record(fields))
    }

    /// Stores a tuple-style record whose labels are `0..n`.
    pub fn tuple(&mut self, tys: &[TypeId]) -> Result<TypeId, IdlError> {
        let fields = (0_u32..)
            .zip(tys)
            .map(|(i, &ty)| Field::new(i, ty))
            .collect();
        self.alloc_type(Type::Record(fields))
    }

    /// Stores a variant type. Fields are put in label-id order; duplicate ids are rejected.
    pub fn variant(&mut self, fields: Vec<Field>) -> Result<TypeId, IdlError> {
        let fields = canonical_fields(fields)?;
        self.alloc_type(Type::Variant(fields))
    }

    /// Stores a function type. More than one mode is rejected.
    pub fn func(&mut self, func: FuncType) -> Result<TypeId, IdlError> {
        if func.modes.len() > 1 {
            return Err(IdlError::InvalidArgument);
        }
        self.alloc_type(Type::Func(func))
    }

    /// Stores a service type. Methods are put in name order; duplicate names are rejected.
    pub fn service(&mut self, mut methods: Vec<Method>) -> Result<TypeId, IdlError> {
        methods.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        if methods.windows(2).any(|w| w[0].name == w[1].name) {
            return Err(IdlError::InvalidArgument);
        }
        self.alloc_type(Type::Service(methods))
    }

    /// Stores a named indirection.
    pub fn var(&mut self, name: &str) -> Result<TypeId, IdlError> {
        self.alloc_type(Type::Var(name.into()))
    }

    /// Returns the kind of the type behind `id`.
    pub fn kind_of(&self, id: TypeId) -> Result<TypeKind, IdlError> {
        Ok(self.ty(id)?.kind())
    }
}
