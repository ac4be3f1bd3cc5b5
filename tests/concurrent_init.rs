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

use ipaccel::{AccelOptions, FeatureGate, InnerProduct, Runtime};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ffi::OsString;
use std::sync::Barrier;

fn enabled() -> Option<OsString> {
    Some("1".into())
}

fn options() -> Result<AccelOptions, ipaccel::Error> {
    AccelOptions::parse("threads = 2")
}

static SHARED: Runtime = Runtime::new(FeatureGate::new(enabled), options);

#[test]
fn concurrent_first_calls_construct_once() {
    const THREADS: usize = 16;
    let (m, n, k) = (5, 21, 48);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let x = (0..m * k)
        .map(|_| rng.random_range(-1.0..=1.0))
        .collect::<Vec<f32>>();
    let y = (0..n * k)
        .map(|_| rng.random_range(-1.0..=1.0))
        .collect::<Vec<f32>>();
    let expected = x
        .chunks_exact(k)
        .flat_map(|x| {
            y.chunks_exact(k)
                .map(move |y| x.iter().zip(y).map(|(&a, &b)| a as f64 * b as f64).sum::<f64>())
        })
        .collect::<Vec<_>>();
    let barrier = Barrier::new(THREADS);
    let results = std::thread::scope(|scope| {
        let handles = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    let mut out = vec![0.0f32; m * n];
                    SHARED
                        .inner_product_f32(m, k, n, k, &x, &y, &mut out)
                        .map(|()| out)
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });
    assert_eq!(SHARED.constructions(), 1);
    assert!(SHARED.is_initialized());
    let tolerance = 1e-2 * (k as f64).sqrt() + 1e-3;
    for result in results {
        let out = result.unwrap();
        for (&got, &expected) in out.iter().zip(&expected) {
            assert!((got as f64 - expected).abs() <= tolerance, "{got} vs {expected}");
        }
    }
    let stream = SHARED.accelerator().unwrap().stream();
    assert_eq!(stream.submitted(), 3 * THREADS as u64);
    assert_eq!(stream.completed(), stream.submitted());
}
