// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural subtyping between wire and expected types.
//!
//! Recursive types are checked coinductively: a pair of types is assumed related while its
//! derivation is in progress. The in-progress pairs live in a [`Gamma`] cache keyed on handle
//! identity, and a pair is dropped from the cache again when its derivation fails.
//!
//! The cache does not bound recursion depth: a table of distinct `opt` entries chained one into
//! the next is as deep as the message is long. Every check therefore carries a nesting budget
//! and fails with [`IdlError::Overflow`] once it is spent.

use crate::arena::{Arena, TypeId};
use crate::deserializer::DEFAULT_MAX_DEPTH;
use crate::env::TypeEnv;
use crate::error::IdlError;
use crate::trace::{TraceMask, TraceSink};
use crate::types::{Type, TypeKind};
use hashbrown::HashSet;

/// Outcome of a subtype check.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SubtypeResult {
    /// The relation holds.
    Ok,
    /// The relation does not hold.
    Fail,
    /// The relation only holds through the special opt rule: the value will coerce to `None`.
    OptSpecial,
}

impl SubtypeResult {
    /// Returns `true` unless the result is [`SubtypeResult::Fail`].
    #[must_use]
    pub fn holds(self) -> bool {
        self != Self::Fail
    }

    /// Combines the results of two sub-derivations that must both hold.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Fail, _) | (_, Self::Fail) => Self::Fail,
            (Self::OptSpecial, _) | (_, Self::OptSpecial) => Self::OptSpecial,
            (Self::Ok, Self::Ok) => Self::Ok,
        }
    }
}

/// Policy for the special opt rule (`T <: opt U` when nothing else applies).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum OptReport {
    /// Accept silently.
    Silence,
    /// Accept and emit a [`TraceSink::opt_special`] event.
    #[default]
    Warning,
    /// Reject.
    Error,
}

/// The set of type pairs whose subtype derivation is in progress.
#[derive(Clone, Debug, Default)]
pub struct Gamma {
    pairs: HashSet<(TypeId, TypeId)>,
}

impl Gamma {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `(t1, t2)`. Returns `false` if it was already present.
    pub fn insert(&mut self, t1: TypeId, t2: TypeId) -> bool {
        self.pairs.insert((t1, t2))
    }

    /// Forgets `(t1, t2)`.
    pub fn remove(&mut self, t1: TypeId, t2: TypeId) {
        self.pairs.remove(&(t1, t2));
    }

    /// Returns `true` if `(t1, t2)` is recorded.
    #[must_use]
    pub fn contains(&self, t1: TypeId, t2: TypeId) -> bool {
        self.pairs.contains(&(t1, t2))
    }

    /// Returns the number of recorded pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Returns `true` if `ty` resolves to `null`, `reserved`, or `opt _`.
///
/// An unresolvable `var` is not optional-like.
#[must_use]
pub fn is_optional_like(arena: &Arena, env: &TypeEnv, ty: TypeId) -> bool {
    env.resolve(arena, ty).is_ok_and(|t| {
        matches!(
            t.kind(),
            TypeKind::Null | TypeKind::Reserved | TypeKind::Opt
        )
    })
}

/// Checks `t1 <: t2` with a fresh cache, the [`OptReport::Warning`] policy and the default
/// nesting budget.
pub fn subtype(
    arena: &Arena,
    env: &TypeEnv,
    t1: TypeId,
    t2: TypeId,
) -> Result<SubtypeResult, IdlError> {
    subtype_check(arena, env, &mut Gamma::new(), OptReport::Warning, t1, t2)
}

/// Checks `t1 <: t2` using a caller-provided cache and the default nesting budget.
pub fn subtype_check(
    arena: &Arena,
    env: &TypeEnv,
    gamma: &mut Gamma,
    report: OptReport,
    t1: TypeId,
    t2: TypeId,
) -> Result<SubtypeResult, IdlError> {
    subtype_check_traced(arena, env, gamma, report, DEFAULT_MAX_DEPTH, t1, t2, None)
}

/// Checks `t1 <: t2`, reporting special-opt decisions to `trace`.
///
/// A handle that does not belong to `arena` fails with [`IdlError::InvalidArgument`]. A
/// derivation nested deeper than `max_depth` fails with [`IdlError::Overflow`]. Every other
/// mismatch is a [`SubtypeResult::Fail`].
pub fn subtype_check_traced<'s>(
    arena: &Arena,
    env: &TypeEnv,
    gamma: &mut Gamma,
    report: OptReport,
    max_depth: usize,
    t1: TypeId,
    t2: TypeId,
    trace: Option<&mut (dyn TraceSink + 's)>,
) -> Result<SubtypeResult, IdlError> {
    let mut checker = Checker {
        arena,
        env,
        gamma,
        report,
        depth: max_depth,
        trace,
    };
    checker.check(t1, t2)
}

struct Checker<'a, 'r, 's> {
    arena: &'a Arena,
    env: &'a TypeEnv,
    gamma: &'r mut Gamma,
    report: OptReport,
    /// Remaining nesting budget.
    depth: usize,
    trace: Option<&'r mut (dyn TraceSink + 's)>,
}

impl Checker<'_, '_, '_> {
    fn check(&mut self, t1: TypeId, t2: TypeId) -> Result<SubtypeResult, IdlError> {
        if t1 == t2 {
            return Ok(SubtypeResult::Ok);
        }
        let Some(depth) = self.depth.checked_sub(1) else {
            return Err(IdlError::Overflow);
        };
        self.depth = depth;
        let res = self.check_node(t1, t2);
        self.depth += 1;
        res
    }

    fn check_node(&mut self, t1: TypeId, t2: TypeId) -> Result<SubtypeResult, IdlError> {
        let (n1, n2) = (self.arena.ty(t1)?, self.arena.ty(t2)?);
        if matches!(n1, Type::Var(_)) || matches!(n2, Type::Var(_)) {
            if !self.gamma.insert(t1, t2) {
                return Ok(SubtypeResult::Ok);
            }
            let (Ok(r1), Ok(r2)) = (
                self.env.trace(self.arena, t1),
                self.env.trace(self.arena, t2),
            ) else {
                self.gamma.remove(t1, t2);
                return Ok(SubtypeResult::Fail);
            };
            let res = self.check(r1, r2)?;
            if res == SubtypeResult::Fail {
                self.gamma.remove(t1, t2);
            }
            return Ok(res);
        }
        self.check_resolved(t1, n1, t2, n2)
    }

    fn check_resolved(
        &mut self,
        t1: TypeId,
        n1: &Type,
        t2: TypeId,
        n2: &Type,
    ) -> Result<SubtypeResult, IdlError> {
        let (k1, k2) = (n1.kind(), n2.kind());
        if k2 == TypeKind::Reserved
            || k1 == TypeKind::Empty
            || (k1 == TypeKind::Nat && k2 == TypeKind::Int)
            || (k1 == k2 && k1.is_primitive())
        {
            return Ok(SubtypeResult::Ok);
        }

        match (n1, n2) {
            (Type::Vec(e1), Type::Vec(e2)) => self.check(*e1, *e2),
            (_, Type::Opt(inner)) => self.check_opt(t1, n1, t2, *inner),
            (Type::Record(f1), Type::Record(f2)) => {
                let mut acc = SubtypeResult::Ok;
                for want in f2 {
                    let id = want.label.id();
                    match f1.iter().find(|f| f.label.id() == id) {
                        Some(have) => {
                            acc = acc.and(self.check(have.ty, want.ty)?);
                            if acc == SubtypeResult::Fail {
                                return Ok(acc);
                            }
                        }
                        None if is_optional_like(self.arena, self.env, want.ty) => {}
                        None => return Ok(SubtypeResult::Fail),
                    }
                }
                Ok(acc)
            }
            (Type::Variant(f1), Type::Variant(f2)) => {
                let mut acc = SubtypeResult::Ok;
                for have in f1 {
                    let id = have.label.id();
                    let Some(want) = f2.iter().find(|f| f.label.id() == id) else {
                        return Ok(SubtypeResult::Fail);
                    };
                    acc = acc.and(self.check(have.ty, want.ty)?);
                    if acc == SubtypeResult::Fail {
                        return Ok(acc);
                    }
                }
                Ok(acc)
            }
            (Type::Func(f1), Type::Func(f2)) => {
                if f1.args.len() != f2.args.len() || f1.rets.len() != f2.rets.len() {
                    return Ok(SubtypeResult::Fail);
                }
                let mut acc = SubtypeResult::Ok;
                // Arguments are contravariant.
                for (&a1, &a2) in f1.args.iter().zip(&f2.args) {
                    acc = acc.and(self.check(a2, a1)?);
                    if acc == SubtypeResult::Fail {
                        return Ok(acc);
                    }
                }
                for (&r1, &r2) in f1.rets.iter().zip(&f2.rets) {
                    acc = acc.and(self.check(r1, r2)?);
                    if acc == SubtypeResult::Fail {
                        return Ok(acc);
                    }
                }
                if f1.modes != f2.modes {
                    return Ok(SubtypeResult::Fail);
                }
                Ok(acc)
            }
            (Type::Service(m1), Type::Service(m2)) => {
                let mut acc = SubtypeResult::Ok;
                for want in m2 {
                    let Some(have) = m1.iter().find(|m| m.name == want.name) else {
                        return Ok(SubtypeResult::Fail);
                    };
                    acc = acc.and(self.check(have.ty, want.ty)?);
                    if acc == SubtypeResult::Fail {
                        return Ok(acc);
                    }
                }
                Ok(acc)
            }
            _ => Ok(SubtypeResult::Fail),
        }
    }

    fn check_opt(
        &mut self,
        t1: TypeId,
        n1: &Type,
        t2: TypeId,
        inner: TypeId,
    ) -> Result<SubtypeResult, IdlError> {
        match n1 {
            Type::Null => return Ok(SubtypeResult::Ok),
            Type::Opt(i1) => {
                let res = self.check(*i1, inner)?;
                if res.holds() {
                    return Ok(res);
                }
            }
            _ => {}
        }
        if !is_optional_like(self.arena, self.env, inner) {
            let res = self.check(t1, inner)?;
            if res.holds() {
                return Ok(res);
            }
        }
        Ok(match self.report {
            OptReport::Silence => SubtypeResult::OptSpecial,
            OptReport::Warning => {
                if let Some(sink) = self.trace.as_deref_mut()
                    && sink.mask().contains(TraceMask::SUBTYPE)
                {
                    sink.opt_special(t1, t2);
                }
                SubtypeResult::OptSpecial
            }
            OptReport::Error => SubtypeResult::Fail,
        })
    }
}
