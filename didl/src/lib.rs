// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A codec for the DIDL binary interface-description format.
//!
//! A message is the magic `DIDL`, a table of composite type definitions, the list of argument
//! types, and then the argument values. This crate reads and writes such messages, checks
//! structural subtyping between a sender's types and the types a receiver expects, and coerces
//! decoded values into the expected shape.
//!
//! All types and values of one session live in an [`Arena`](arena::Arena) and are addressed
//! through [`TypeId`](arena::TypeId) and [`ValueId`](arena::ValueId) handles.
//!
//! ## Modules
//! - [`format`]: LEB128 varints and bounds-checked byte cursors.
//! - [`types`], [`value`], [`env`]: the type and value model.
//! - [`header`], [`type_table`]: reading and writing the type table.
//! - [`serializer`], [`builder`]: writing values and whole messages.
//! - [`deserializer`]: reading values, with cost quotas and optional tracing.
//! - [`subtype`], [`coerce`]: structural subtyping and value coercion.
//! - [`pretty`]: IDL text rendering.
//!
//! ## Example
//! ```
//! use didl::arena::Arena;
//! use didl::builder::Builder;
//! use didl::deserializer::Deserializer;
//! use didl::pretty::display_args;
//!
//! let mut arena = Arena::new();
//! let mut b = Builder::new();
//! b.arg_bool(&mut arena, true)?;
//! b.arg_text(&mut arena, "hello")?;
//! let bytes = b.serialize(&arena)?;
//!
//! let mut rx = Arena::new();
//! let mut de = Deserializer::new(&bytes, &mut rx)?;
//! let mut args = Vec::new();
//! while !de.is_done() {
//!     let (_, v) = de.get_value(&mut rx)?;
//!     args.push(v);
//! }
//! de.done(&rx)?;
//! assert_eq!(display_args(&rx, &args).to_string(), r#"(true, "hello")"#);
//! # Ok::<(), didl::error::IdlError>(())
//! ```
//!
//! ## Features
//! - `std`: enables [`StderrSink`](trace::StderrSink), which prints subtype warnings.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod arena;
pub mod builder;
pub mod coerce;
pub mod deserializer;
pub mod env;
pub mod error;
pub mod format;
pub mod header;
pub mod pretty;
pub mod serializer;
pub mod subtype;
pub mod trace;
pub mod type_table;
pub mod types;
pub mod value;

pub use arena::{Arena, TypeId, ValueId};
pub use builder::Builder;
pub use deserializer::{DecoderConfig, Deserializer};
pub use error::IdlError;
pub use types::{Type, TypeKind};
pub use value::Value;
