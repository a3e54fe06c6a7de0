// This software is licensed under a dual license model:
//
// GNU Affero General Public License v3 (AGPLv3): You may use, modify, and
// distribute this software under the terms of the AGPLv3.
//
// Elastic License v2 (ELv2): You may also use, modify, and distribute this
// software under the Elastic License v2, which has specific restrictions.
//
// We welcome any commercial collaboration or support. For inquiries
// regarding the licenses, please contact us at:
// vectorchord-inquiry@tensorchord.ai
//
// Copyright (c) 2025 TensorChord Inc.

#![allow(unsafe_code)]

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::rngs::ThreadRng;
use std::hint::black_box;

const VEC_LENGTH: usize = 20_000;
const NUM_VECS: usize = 100;

struct Pool {
    vectors: Vec<Vec<i32>>,
    rng: ThreadRng,
}

impl Pool {
    fn new() -> Self {
        let mut rng = rand::rng();
        let vectors = (0..NUM_VECS)
            .map(|_| {
                (0..VEC_LENGTH)
                    .map(|_| rng.random_range(0..10))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        Self { vectors, rng }
    }

    fn sample(&mut self) -> (&[i32], &[i32]) {
        let i = self.rng.random_range(0..NUM_VECS);
        let j = self.rng.random_range(0..NUM_VECS);
        (&self.vectors[i], &self.vectors[j])
    }
}

fn baseline(c: &mut Criterion) {
    let mut pool = Pool::new();
    c.bench_function("rng select baseline", |b| {
        b.iter(|| {
            let (x, y) = pool.sample();
            black_box((x.as_ptr(), y.as_ptr()))
        })
    });
}

fn scalar(c: &mut Criterion) {
    let mut pool = Pool::new();
    let kernels: [(&str, fn(&[i32], &[i32]) -> i64); 8] = [
        ("scalar::reference", simd::scalar::reference),
        ("scalar::indexed", simd::scalar::indexed),
        ("scalar::zip", simd::scalar::zip),
        ("scalar::filter_map", simd::scalar::filter_map),
        ("scalar::fold", simd::scalar::fold),
        ("scalar::branchless", simd::scalar::branchless),
        ("scalar::unrolled", simd::scalar::unrolled),
        ("scalar::cursor", simd::scalar::cursor),
    ];
    for (name, f) in kernels {
        c.bench_function(name, |b| {
            b.iter(|| {
                let (x, y) = pool.sample();
                f(black_box(x), black_box(y))
            })
        });
    }
}

fn gated_reduce_sum_of_gated_xy(c: &mut Criterion) {
    let mut pool = Pool::new();
    #[cfg(target_arch = "x86_64")]
    if simd::is_cpu_detected!("v4") {
        c.bench_function("gated::reduce_sum_of_gated_xy::v4", |b| {
            b.iter(|| {
                let (x, y) = pool.sample();
                unsafe {
                    simd::gated::reduce_sum_of_gated_xy::reduce_sum_of_gated_xy_v4(
                        black_box(x),
                        black_box(y),
                    )
                }
            })
        });
    }
    #[cfg(target_arch = "x86_64")]
    if simd::is_cpu_detected!("v3") {
        c.bench_function("gated::reduce_sum_of_gated_xy::v3", |b| {
            b.iter(|| {
                let (x, y) = pool.sample();
                unsafe {
                    simd::gated::reduce_sum_of_gated_xy::reduce_sum_of_gated_xy_v3(
                        black_box(x),
                        black_box(y),
                    )
                }
            })
        });
    }
    #[cfg(target_arch = "x86_64")]
    if simd::is_cpu_detected!("v2") {
        c.bench_function("gated::reduce_sum_of_gated_xy::v2", |b| {
            b.iter(|| {
                let (x, y) = pool.sample();
                unsafe {
                    simd::gated::reduce_sum_of_gated_xy::reduce_sum_of_gated_xy_v2(
                        black_box(x),
                        black_box(y),
                    )
                }
            })
        });
    }
    #[cfg(target_arch = "aarch64")]
    if simd::is_cpu_detected!("a2") {
        c.bench_function("gated::reduce_sum_of_gated_xy::a2", |b| {
            b.iter(|| {
                let (x, y) = pool.sample();
                unsafe {
                    simd::gated::reduce_sum_of_gated_xy::reduce_sum_of_gated_xy_a2(
                        black_box(x),
                        black_box(y),
                    )
                }
            })
        });
    }
    c.bench_function("gated::reduce_sum_of_gated_xy", |b| {
        b.iter(|| {
            let (x, y) = pool.sample();
            simd::gated::reduce_sum_of_gated_xy(black_box(x), black_box(y))
        })
    });
}

criterion_group!(benches, baseline, scalar, gated_reduce_sum_of_gated_xy);
criterion_main!(benches);
