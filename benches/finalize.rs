#![allow(clippy::unwrap_used)]

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use dualval::{value, Buffer, Heap, ParseLimits, Safe, Unsafe};

fn sample_small() -> Heap {
    value!({ a: 1 }).unwrap()
}

fn sample_medium<R: dualval::OwningRefCount>() -> Heap<R> {
    let mut obj = Heap::make_object();
    for i in 0..64_i64 {
        obj.insert(format!("k{i:03}").as_str(), i).unwrap();
    }
    let mut arr = Heap::<R>::make_array();
    for i in 0..32 {
        arr.push_back(format!("item number {i}")).unwrap();
    }
    obj.insert("list", arr).unwrap();
    obj
}

fn bench_finalize(c: &mut Criterion) {
    let small = sample_small();
    c.bench_function("finalize_small", |b| {
        b.iter(|| black_box(small.finalize().unwrap()));
    });

    let medium = sample_medium::<Safe>();
    c.bench_function("finalize_medium_safe", |b| {
        b.iter(|| black_box(medium.finalize().unwrap()));
    });

    let local = sample_medium::<Unsafe>();
    c.bench_function("finalize_medium_unsafe", |b| {
        b.iter(|| black_box(local.finalize().unwrap()));
    });
}

fn bench_buffer(c: &mut Criterion) {
    let bytes = sample_medium::<Safe>().finalize().unwrap().dup_bytes().unwrap();
    let limits = ParseLimits::for_bytes(bytes.len());

    c.bench_function("validate_medium", |b| {
        b.iter(|| dualval::validate(black_box(&bytes), limits).unwrap());
    });

    let buf = Buffer::<Safe>::from_bytes(&bytes).unwrap();
    c.bench_function("lookup_medium", |b| {
        b.iter(|| black_box(buf.at(black_box("k042")).unwrap()));
    });

    c.bench_function("lift_medium", |b| {
        b.iter(|| black_box(buf.lift().unwrap()));
    });
}

criterion_group!(benches, bench_finalize, bench_buffer);
criterion_main!(benches);
