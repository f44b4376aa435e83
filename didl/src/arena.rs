// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Session-scoped arena storage for types, values, and byte payloads.
//!
//! One encode or decode session owns one [`Arena`]. Every type node, value node, and
//! text/blob/principal/bignum payload created during the session lives here and is freed
//! together by [`Arena::reset`] or by dropping the arena. Nodes refer to each other through
//! compact handles, which is what lets a type table describe recursive types without cyclic
//! ownership.

use crate::error::IdlError;
use crate::types::Type;
use crate::value::Value;
use alloc::vec::Vec;
use core::mem::size_of;

/// Handle to a [`Type`] stored in an [`Arena`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

/// Handle to a [`Value`] stored in an [`Arena`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub(crate) u32);

/// A view of bytes copied into an arena's byte region.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ByteSpan {
    block: u32,
    start: u32,
    len: u32,
}

impl ByteSpan {
    /// Returns the number of bytes in the span.
    #[must_use]
    pub fn len(self) -> usize {
        self.len as usize
    }

    /// Returns `true` if the span is empty.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// Arena sizing knobs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Default capacity of each byte block. Larger payloads get a dedicated block.
    pub block_size: usize,
    /// Upper bound on bytes charged to the arena (payloads plus node storage).
    ///
    /// `None` means unbounded. Exceeding the bound fails with [`IdlError::Alloc`].
    pub max_bytes: Option<usize>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            block_size: 4096,
            max_bytes: None,
        }
    }
}

/// Bump allocator over growable byte blocks.
#[derive(Clone, Debug)]
struct Region {
    blocks: Vec<Vec<u8>>,
    block_size: usize,
}

impl Region {
    fn new(block_size: usize) -> Self {
        Self {
            blocks: Vec::new(),
            block_size: block_size.max(1),
        }
    }

    fn alloc(&mut self, bytes: &[u8]) -> Result<ByteSpan, IdlError> {
        if bytes.is_empty() {
            return Ok(ByteSpan::default());
        }
        let len = u32::try_from(bytes.len()).map_err(|_| IdlError::Alloc)?;
        let fits = self
            .blocks
            .last()
            .is_some_and(|b| b.capacity() - b.len() >= bytes.len());
        if !fits {
            let mut block = Vec::new();
            block.try_reserve_exact(self.block_size.max(bytes.len()))?;
            self.blocks.try_reserve(1)?;
            self.blocks.push(block);
        }
        let block_idx = self.blocks.len() - 1;
        let block = &mut self.blocks[block_idx];
        let start = u32::try_from(block.len()).map_err(|_| IdlError::Alloc)?;
        block.extend_from_slice(bytes);
        Ok(ByteSpan {
            block: u32::try_from(block_idx).map_err(|_| IdlError::Alloc)?,
            start,
            len,
        })
    }

    fn get(&self, span: ByteSpan) -> Option<&[u8]> {
        if span.len == 0 {
            return Some(&[]);
        }
        let block = self.blocks.get(span.block as usize)?;
        let start = span.start as usize;
        block.get(start..start + span.len as usize)
    }

    fn reset(&mut self) {
        self.blocks.clear();
    }
}

/// Session-scoped storage for every type and value node.
#[derive(Clone, Debug)]
pub struct Arena {
    config: ArenaConfig,
    types: Vec<Type>,
    values: Vec<Value>,
    region: Region,
    charged: usize,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    /// Creates an arena with default sizing.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::default())
    }

    /// Creates an arena with explicit sizing.
    #[must_use]
    pub fn with_config(config: ArenaConfig) -> Self {
        Self {
            config,
            types: Vec::new(),
            values: Vec::new(),
            region: Region::new(config.block_size),
            charged: 0,
        }
    }

    /// Returns the arena configuration.
    #[must_use]
    pub fn config(&self) -> ArenaConfig {
        self.config
    }

    /// Frees every node and payload at once. All outstanding handles become invalid.
    pub fn reset(&mut self) {
        self.types.clear();
        self.values.clear();
        self.region.reset();
        self.charged = 0;
    }

    /// Returns the number of bytes charged against [`ArenaConfig::max_bytes`].
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.charged
    }

    /// Returns the number of type nodes.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Returns the number of value nodes.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    fn charge(&mut self, n: usize) -> Result<(), IdlError> {
        let next = self.charged.checked_add(n).ok_or(IdlError::Alloc)?;
        if self.config.max_bytes.is_some_and(|max| next > max) {
            return Err(IdlError::Alloc);
        }
        self.charged = next;
        Ok(())
    }

    /// Stores a type node and returns its handle.
    pub fn alloc_type(&mut self, ty: Type) -> Result<TypeId, IdlError> {
        self.charge(size_of::<Type>())?;
        let id = u32::try_from(self.types.len()).map_err(|_| IdlError::Alloc)?;
        self.types.try_reserve(1)?;
        self.types.push(ty);
        Ok(TypeId(id))
    }

    /// Stores a value node and returns its handle.
    pub fn alloc_value(&mut self, value: Value) -> Result<ValueId, IdlError> {
        self.charge(size_of::<Value>())?;
        let id = u32::try_from(self.values.len()).map_err(|_| IdlError::Alloc)?;
        self.values.try_reserve(1)?;
        self.values.push(value);
        Ok(ValueId(id))
    }

    /// Copies `bytes` into the byte region.
    pub fn alloc_bytes(&mut self, bytes: &[u8]) -> Result<ByteSpan, IdlError> {
        self.charge(bytes.len())?;
        self.region.alloc(bytes)
    }

    /// Returns the type behind `id`.
    ///
    /// Fails with [`IdlError::InvalidArgument`] for a handle from another arena or from before a
    /// [`Arena::reset`].
    pub fn ty(&self, id: TypeId) -> Result<&Type, IdlError> {
        self.types
            .get(id.0 as usize)
            .ok_or(IdlError::InvalidArgument)
    }

    /// Returns the value behind `id`.
    pub fn value(&self, id: ValueId) -> Result<&Value, IdlError> {
        self.values
            .get(id.0 as usize)
            .ok_or(IdlError::InvalidArgument)
    }

    /// Returns the bytes behind `span`.
    pub fn bytes(&self, span: ByteSpan) -> Result<&[u8], IdlError> {
        self.region.get(span).ok_or(IdlError::InvalidArgument)
    }

    /// Returns the bytes behind `span` as UTF-8.
    pub fn str(&self, span: ByteSpan) -> Result<&str, IdlError> {
        core::str::from_utf8(self.bytes(span)?).map_err(|_| IdlError::InvalidArgument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_payloads_share_a_block() {
        let mut arena = Arena::with_config(ArenaConfig {
            block_size: 16,
            max_bytes: None,
        });
        let a = arena.alloc_bytes(b"hello").unwrap();
        let b = arena.alloc_bytes(b"world").unwrap();
        assert_eq!(arena.bytes(a).unwrap(), b"hello");
        assert_eq!(arena.bytes(b).unwrap(), b"world");
        assert_eq!(arena.region.blocks.len(), 1);
    }

    #[test]
    fn oversized_payload_gets_dedicated_block() {
        let mut arena = Arena::with_config(ArenaConfig {
            block_size: 4,
            max_bytes: None,
        });
        let big = [7_u8; 40];
        let a = arena.alloc_bytes(b"ab").unwrap();
        let b = arena.alloc_bytes(&big).unwrap();
        let c = arena.alloc_bytes(b"cd").unwrap();
        assert_eq!(arena.bytes(a).unwrap(), b"ab");
        assert_eq!(arena.bytes(b).unwrap(), &big[..]);
        assert_eq!(arena.bytes(c).unwrap(), b"cd");
        assert_eq!(b.len(), 40);
    }

    #[test]
    fn empty_payload_is_always_readable() {
        let mut arena = Arena::new();
        let s = arena.alloc_bytes(&[]).unwrap();
        assert!(s.is_empty());
        assert_eq!(arena.bytes(s).unwrap(), &[] as &[u8]);
        assert_eq!(arena.str(s).unwrap(), "");
    }

    #[test]
    fn byte_limit_reports_alloc() {
        let mut arena = Arena::with_config(ArenaConfig {
            block_size: 64,
            max_bytes: Some(8),
        });
        arena.alloc_bytes(b"12345678").unwrap();
        assert_eq!(arena.alloc_bytes(b"9"), Err(IdlError::Alloc));
        assert_eq!(arena.alloc_type(Type::Null), Err(IdlError::Alloc));
    }

    #[test]
    fn reset_invalidates_handles() {
        let mut arena = Arena::new();
        let t = arena.alloc_type(Type::Bool).unwrap();
        let s = arena.alloc_bytes(b"x").unwrap();
        arena.reset();
        assert_eq!(arena.type_count(), 0);
        assert_eq!(arena.allocated_bytes(), 0);
        assert_eq!(arena.ty(t), Err(IdlError::InvalidArgument));
        assert_eq!(arena.bytes(s), Err(IdlError::InvalidArgument));
    }
}
