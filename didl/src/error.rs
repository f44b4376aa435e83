// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The error taxonomy shared by every fallible `didl` operation.

use core::fmt;

/// An error raised while encoding, decoding, checking, or coercing IDL data.
///
/// Errors short-circuit: the first failure in a recursive walk aborts the whole operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdlError {
    /// A numeric value did not fit, a destination buffer was too small, or a decoding quota was
    /// exceeded.
    Overflow,
    /// Input ended before a length-prefixed or multi-byte field was complete.
    Truncated,
    /// The arena could not satisfy an allocation.
    Alloc,
    /// Malformed structure or a type/value shape mismatch.
    InvalidArgument,
    /// A recognized construct that this codec does not implement.
    Unsupported,
}

impl fmt::Display for IdlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "numeric overflow or quota exceeded"),
            Self::Truncated => write!(f, "unexpected end of input"),
            Self::Alloc => write!(f, "allocation failed"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::Unsupported => write!(f, "unsupported construct"),
        }
    }
}

impl core::error::Error for IdlError {}

impl From<alloc::collections::TryReserveError> for IdlError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::Alloc
    }
}
