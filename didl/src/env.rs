// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Name-to-type bindings used to resolve [`Type::Var`].

use crate::arena::{Arena, TypeId};
use crate::error::IdlError;
use crate::types::Type;
use alloc::boxed::Box;
use hashbrown::HashMap;

/// A type environment: append-only bindings from names to types.
#[derive(Clone, Debug, Default)]
pub struct TypeEnv {
    map: HashMap<Box<str>, TypeId>,
}

impl TypeEnv {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if there are no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Binds `name` to `ty`.
    ///
    /// Re-binding a name to the same handle is a no-op; binding it to a different handle fails
    /// with [`IdlError::InvalidArgument`].
    pub fn insert(&mut self, name: &str, ty: TypeId) -> Result<(), IdlError> {
        match self.map.get(name) {
            Some(&existing) if existing == ty => Ok(()),
            Some(_) => Err(IdlError::InvalidArgument),
            None => {
                self.map.try_reserve(1).map_err(|_| IdlError::Alloc)?;
                self.map.insert(name.into(), ty);
                Ok(())
            }
        }
    }

    /// Returns the direct binding for `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<TypeId> {
        self.map.get(name).copied()
    }

    /// Looks up `name` and follows `var` links until a non-`var` type is reached.
    ///
    /// Returns `Ok(None)` if `name` is unbound.
    pub fn rec_find(&self, arena: &Arena, name: &str) -> Result<Option<TypeId>, IdlError> {
        match self.find(name) {
            Some(ty) => self.trace(arena, ty).map(Some),
            None => Ok(None),
        }
    }

    /// Follows `var` links from `ty` until a non-`var` type is reached.
    ///
    /// A non-`var` `ty` is returned unchanged. An unbound name, or a chain of `var`s that never
    /// reaches a concrete type, fails with [`IdlError::InvalidArgument`].
    pub fn trace(&self, arena: &Arena, mut ty: TypeId) -> Result<TypeId, IdlError> {
        // Each hop consumes a distinct binding, so a longer chain must be a loop.
        for _ in 0..=self.map.len() {
            match arena.ty(ty)? {
                Type::Var(name) => {
                    ty = self.find(name).ok_or(IdlError::InvalidArgument)?;
                }
                _ => return Ok(ty),
            }
        }
        Err(IdlError::InvalidArgument)
    }

    /// Resolves `ty` and returns the concrete type node.
    pub fn resolve<'a>(&self, arena: &'a Arena, ty: TypeId) -> Result<&'a Type, IdlError> {
        arena.ty(self.trace(arena, ty)?)
    }

    /// Iterates over all bindings in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TypeId)> + '_ {
        self.map.iter().map(|(k, &v)| (&**k, v))
    }
}
