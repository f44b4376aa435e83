// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Builds a sample DIDL message and prints it as hex.
//!
//! The message carries `(true, 42 : nat64, "hello", record { id = 7; tags = vec { "a"; "b" } })`.
//! Pipe the output into `didl_decode` to read it back.

use didl::arena::Arena;
use didl::builder::Builder;
use didl::error::IdlError;
use didl::types::{Field, TypeKind};
use didl::value::ValueField;

fn build(arena: &mut Arena) -> Result<String, IdlError> {
    let mut b = Builder::new();
    b.arg_bool(arena, true)?;
    b.arg_nat64(arena, 42)?;
    b.arg_text(arena, "hello")?;

    let nat = arena.primitive(TypeKind::Nat)?;
    let text = arena.primitive(TypeKind::Text)?;
    let tags_ty = arena.vec(text)?;
    let item_ty = arena.record(vec![Field::new("id", nat), Field::new("tags", tags_ty)])?;

    let id = arena.nat_value(7)?;
    let a = arena.text_value("a")?;
    let b_tag = arena.text_value("b")?;
    let tags = arena.vec_value(vec![a, b_tag])?;
    let item = arena.record_value(vec![ValueField::new("id", id), ValueField::new("tags", tags)])?;
    b.arg(arena, item_ty, item)?;

    b.serialize_hex(arena)
}

fn main() -> Result<(), IdlError> {
    let mut arena = Arena::new();
    println!("{}", build(&mut arena)?);
    Ok(())
}
