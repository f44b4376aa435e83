// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Profiling adapters for `didl` decoding (currently Tracy).
//!
//! This crate is `std`-only and keeps `didl` itself free of profiling dependencies.
//! It listens for argument start/end callbacks and emits matching profiling scopes.
//!
//! ## Backend
//! This crate currently supports the Tracy backend via `tracy-client`.
//!
//! ## Example
//! ```ignore
//! use didl_profiling::{ArgNameResolver, ProfilingTraceSink};
//!
//! let mut sink = ProfilingTraceSink::with_resolver(ArgNameResolver::new(["to", "amount"]));
//! let mut de = Deserializer::new(&bytes, &mut arena)?;
//! de.set_trace(&mut sink);
//! let (_, to) = de.get_value(&mut arena)?;
//! # Ok::<(), didl::error::IdlError>(())
//! ```

mod resolver;
mod sink;

pub use resolver::{ArgNameResolver, DefaultLabelResolver, LabelResolver};
pub use sink::ProfilingTraceSink;
