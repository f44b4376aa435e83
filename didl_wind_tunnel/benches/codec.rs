// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use didl::arena::{Arena, TypeId, ValueId};
use didl::builder::Builder;
use didl::deserializer::Deserializer;
use didl::env::TypeEnv;
use didl::subtype::{SubtypeResult, subtype};
use didl::types::{Field, TypeKind};
use didl::value::ValueField;

fn bench_codec(c: &mut Criterion) {
    bench_encode_records(c);
    bench_decode_records(c);
    bench_decode_blob(c);
    bench_typed_decode(c);
    bench_subtype_recursive(c);
}

/// `vec record { id : nat; name : text; score : float64 }` with `n` elements.
fn build_records(arena: &mut Arena, n: u64) -> (TypeId, ValueId) {
    let nat = arena.primitive(TypeKind::Nat).unwrap();
    let text = arena.primitive(TypeKind::Text).unwrap();
    let float = arena.primitive(TypeKind::Float64).unwrap();
    let row = arena
        .record(vec![
            Field::new("id", nat),
            Field::new("name", text),
            Field::new("score", float),
        ])
        .unwrap();
    let ty = arena.vec(row).unwrap();
    let mut items = Vec::new();
    for i in 0..n {
        let id = arena.nat_value(i).unwrap();
        let name = arena.text_value("row-name").unwrap();
        let score = arena
            .alloc_value(didl::value::Value::Float64(1.0 / (i as f64 + 1.0)))
            .unwrap();
        items.push(
            arena
                .record_value(vec![
                    ValueField::new("id", id),
                    ValueField::new("name", name),
                    ValueField::new("score", score),
                ])
                .unwrap(),
        );
    }
    (ty, arena.vec_value(items).unwrap())
}

fn encode_records(n: u64) -> Vec<u8> {
    let mut arena = Arena::new();
    let (ty, v) = build_records(&mut arena, n);
    let mut b = Builder::new();
    b.arg(&arena, ty, v).unwrap();
    b.serialize(&arena).unwrap()
}

fn bench_encode_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_records");
    for &n in &[1_u64, 16, 256, 4096] {
        let mut arena = Arena::new();
        let (ty, v) = build_records(&mut arena, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &(ty, v), |b, &(ty, v)| {
            b.iter(|| {
                let mut builder = Builder::new();
                builder.arg(&arena, ty, v).unwrap();
                black_box(builder.serialize(&arena).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_decode_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_records");
    for &n in &[1_u64, 16, 256, 4096] {
        let bytes = encode_records(n);
        let mut arena = Arena::new();
        group.bench_with_input(BenchmarkId::from_parameter(n), &bytes, |b, bytes| {
            b.iter(|| {
                arena.reset();
                let mut de = Deserializer::new(bytes, &mut arena).unwrap();
                let out = de.get_value(&mut arena).unwrap();
                de.done(&arena).unwrap();
                black_box(out);
            });
        });
    }
    group.finish();
}

fn bench_decode_blob(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_blob");
    for &n in &[0_usize, 32, 1024, 65536] {
        let mut arena = Arena::new();
        let mut b = Builder::new();
        b.arg_blob(&mut arena, &vec![0x5a; n]).unwrap();
        let bytes = b.serialize(&arena).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &bytes, |b, bytes| {
            b.iter(|| {
                arena.reset();
                let mut de = Deserializer::new(bytes, &mut arena).unwrap();
                black_box(de.get_value(&mut arena).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_typed_decode(c: &mut Criterion) {
    let bytes = encode_records(256);
    let mut arena = Arena::new();
    c.bench_function("typed_decode_records_256", |b| {
        b.iter(|| {
            arena.reset();
            let mut de = Deserializer::new(&bytes, &mut arena).unwrap();
            // Expect `vec record { id : int }`: widen the id and drop the other fields.
            let int = arena.primitive(TypeKind::Int).unwrap();
            let row = arena.record(vec![Field::new("id", int)]).unwrap();
            let expected = arena.vec(row).unwrap();
            black_box(de.get_value_with_type(&mut arena, expected).unwrap());
        });
    });
}

fn bench_subtype_recursive(c: &mut Criterion) {
    // Two independently named copies of `list = opt record { head : nat; tail : list }`.
    let mut arena = Arena::new();
    let mut env = TypeEnv::new();
    let nat = arena.primitive(TypeKind::Nat).unwrap();
    let mut lists = Vec::new();
    for name in ["list_a", "list_b"] {
        let var = arena.var(name).unwrap();
        let node = arena
            .record(vec![Field::new("head", nat), Field::new("tail", var)])
            .unwrap();
        let list = arena.opt(node).unwrap();
        env.insert(name, list).unwrap();
        lists.push(var);
    }
    c.bench_function("subtype_recursive_list", |b| {
        b.iter(|| {
            let r = subtype(&arena, &env, lists[0], lists[1]).unwrap();
            assert_eq!(r, SubtypeResult::Ok, "recursive copies are equivalent");
            black_box(r);
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(std::time::Duration::from_millis(300))
        .measurement_time(std::time::Duration::from_millis(1200))
        .sample_size(60);
    targets = bench_codec
}
criterion_main!(benches);
