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

use criterion::{Criterion, criterion_group, criterion_main};
use simd::bf16;

fn random(n: usize) -> Vec<f32> {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..n).map(|_| rng.random_range(-1.0..=1.0f32)).collect()
}

fn floating_bf16_vector_from_f32(c: &mut Criterion) {
    let x = random(4095);
    let mut out = vec![bf16::ZERO; 4095];
    c.bench_function("floating_bf16::vector_from_f32", |b| {
        b.iter(|| simd::floating_bf16::vector_from_f32(&x, &mut out))
    });
}

fn floating_bf16_reduce_sum_of_xy(c: &mut Criterion) {
    let x = random(4095).into_iter().map(bf16::from_f32).collect::<Vec<_>>();
    let y = random(4095).into_iter().map(bf16::from_f32).collect::<Vec<_>>();
    c.bench_function("floating_bf16::reduce_sum_of_xy", |b| {
        b.iter(|| simd::floating_bf16::reduce_sum_of_xy(&x, &y))
    });
    let panel = random(4095 * 16)
        .into_iter()
        .map(bf16::from_f32)
        .collect::<Vec<_>>();
    c.bench_function("floating_bf16::reduce_sum_of_xy_panel_8", |b| {
        let mut out = [0.0f32; 8];
        b.iter(|| simd::floating_bf16::reduce_sum_of_xy_panel_8(&x, &panel[..4095 * 8], &mut out))
    });
    c.bench_function("floating_bf16::reduce_sum_of_xy_panel_16", |b| {
        let mut out = [0.0f32; 16];
        b.iter(|| simd::floating_bf16::reduce_sum_of_xy_panel_16(&x, &panel, &mut out))
    });
}

fn floating_f32_reduce_sum_of_xy(c: &mut Criterion) {
    let x = random(4095);
    let y = random(4095);
    c.bench_function("floating_f32::reduce_sum_of_xy", |b| {
        b.iter(|| simd::floating_f32::reduce_sum_of_xy(&x, &y))
    });
}

criterion_group!(
    benches,
    floating_bf16_vector_from_f32,
    floating_bf16_reduce_sum_of_xy,
    floating_f32_reduce_sum_of_xy
);
criterion_main!(benches);
