// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing hooks for decoding and subtype checking.
//!
//! Tracing is optional and `no_std` friendly. The codec only emits events requested by the
//! sink's [`TraceMask`]; with no sink attached nothing is emitted.
//!
//! Attach a sink with [`Deserializer::set_trace`] or pass one to [`subtype_check_traced`].

#[cfg(doc)]
use crate::{deserializer::Deserializer, subtype::subtype_check_traced};

use crate::arena::TypeId;
#[cfg(feature = "std")]
use crate::deserializer::DecoderConfig;
use crate::error::IdlError;

/// A set of trace events requested by a [`TraceSink`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraceMask(u32);

impl core::ops::BitOr for TraceMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for TraceMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl TraceMask {
    /// No tracing.
    pub const NONE: Self = Self(0);
    /// Trace argument decoding.
    ///
    /// Enables:
    /// - [`TraceSink::arg_start`]
    /// - [`TraceSink::arg_end`]
    pub const DECODE: Self = Self(1 << 0);
    /// Trace subtype decisions that relied on the special opt rule.
    ///
    /// Enables:
    /// - [`TraceSink::opt_special`]
    pub const SUBTYPE: Self = Self(1 << 1);
    /// Trace decoding-cost accounting.
    ///
    /// Enables:
    /// - [`TraceSink::cost`]
    pub const QUOTA: Self = Self(1 << 2);

    /// Returns `true` if this mask includes all bits in `other`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// A trace sink that can receive codec events.
pub trait TraceSink {
    /// Returns the set of events the sink wants.
    fn mask(&self) -> TraceMask {
        TraceMask::NONE
    }

    /// Called before an argument is decoded.
    ///
    /// - `index`: zero-based argument index
    /// - `wire_type`: the argument's wire type
    /// - `offset`: input offset of the argument's first byte
    fn arg_start(&mut self, _index: usize, _wire_type: TypeId, _offset: usize) {}

    /// Called after an argument was decoded (or failed to decode).
    fn arg_end(&mut self, _index: usize, _offset: usize, _outcome: Result<(), IdlError>) {}

    /// Called when `wire <: expected` only holds through the special opt rule.
    fn opt_special(&mut self, _wire: TypeId, _expected: TypeId) {}

    /// Called each time decoding cost is charged.
    fn cost(&mut self, _added: usize, _total: usize) {}
}

/// A sink that prints subtype warnings to standard error.
#[cfg(feature = "std")]
#[derive(Copy, Clone, Debug, Default)]
pub struct StderrSink {
    /// Also print the type handles involved.
    pub full_error_message: bool,
}

#[cfg(feature = "std")]
impl StderrSink {
    /// Creates a sink whose verbosity follows `config.full_error_message`.
    #[must_use]
    pub fn for_config(config: &DecoderConfig) -> Self {
        Self {
            full_error_message: config.full_error_message,
        }
    }
}

#[cfg(feature = "std")]
impl TraceSink for StderrSink {
    fn mask(&self) -> TraceMask {
        TraceMask::SUBTYPE
    }

    fn opt_special(&mut self, wire: TypeId, expected: TypeId) {
        if self.full_error_message {
            std::eprintln!(
                "WARNING: subtype coercion via special opt rule (wire #{}, expected #{})",
                wire.0,
                expected.0
            );
        } else {
            std::eprintln!("WARNING: subtype coercion via special opt rule");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_combines_bits() {
        let mut m = TraceMask::DECODE | TraceMask::QUOTA;
        assert!(m.contains(TraceMask::DECODE));
        assert!(!m.contains(TraceMask::SUBTYPE));
        m |= TraceMask::SUBTYPE;
        assert!(m.contains(TraceMask::DECODE | TraceMask::SUBTYPE));
        assert!(m.contains(TraceMask::NONE));
    }
}
