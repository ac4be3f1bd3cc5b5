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

use crate::context::ExecutionContext;
use crate::error::Error;
use crate::options::FallbackPolicy;
use crate::runtime::Accelerator;
use bumpalo::Bump;
use engine::{
    Element, Engine, ExecArgs, InnerProductPlan, Layout, Memory, MemoryDesc, MemoryMut,
    Precision, PropKind, Reorder, StreamGuard, describe,
};
use simd::bf16;

/// Binds the caller's buffers: `x` is `xrow × xcol`, `y` is `yrow × ycol`
/// and `out` is `xrow × yrow`, all row-major.
pub(crate) fn bind<'a, 'b, T: Element>(
    xrow: usize,
    xcol: usize,
    yrow: usize,
    ycol: usize,
    x: &'a [T],
    y: &'a [T],
    out: &'b mut [f32],
) -> Result<(Memory<'a, T>, Memory<'a, T>, MemoryMut<'b, f32>), Error> {
    if xcol != ycol {
        return Err(engine::Error::ShapeMismatch(format!(
            "{xrow}x{xcol} by {yrow}x{ycol}"
        ))
        .into());
    }
    let x = Memory::new(describe(xrow, xcol, T::PRECISION, Layout::RowMajor)?, x)?;
    let y = Memory::new(describe(yrow, ycol, T::PRECISION, Layout::RowMajor)?, y)?;
    let out = MemoryMut::new(describe(xrow, yrow, Precision::F32, Layout::RowMajor)?, out)?;
    Ok((x, y, out))
}

/// Plan of an entry point call. The output is not assumed to be the final
/// consumer.
pub fn build_plan(
    engine: &Engine,
    src: MemoryDesc,
    weights: MemoryDesc,
    dst: MemoryDesc,
) -> engine::Result<InnerProductPlan> {
    InnerProductPlan::new(engine, PropKind::ForwardTraining, src, weights, dst)
}

/// Allocates a buffer for `target` in `arena` and fills it from `src`.
pub fn convert<'a>(
    engine: &Engine,
    stream: &mut StreamGuard<'_>,
    src: Memory<'_, f32>,
    target: MemoryDesc,
    arena: &'a Bump,
) -> engine::Result<MemoryMut<'a, bf16>> {
    let reorder = Reorder::new(engine, src.desc(), target)?;
    let mut dst = MemoryMut::scratch(target, arena)?;
    reorder.execute(stream, src, &mut dst)?;
    Ok(dst)
}

/// One dot product per output element, without the engine.
pub(crate) fn rows<T: Element>(
    x: Memory<'_, T>,
    y: Memory<'_, T>,
    mut out: MemoryMut<'_, f32>,
    dot: fn(&[T], &[T]) -> f32,
) -> Result<(), Error> {
    let k = x.desc().cols();
    let n = y.desc().rows();
    for (x, out) in x.data().chunks_exact(k).zip(out.data_mut().chunks_exact_mut(n)) {
        for (y, out) in y.data().chunks_exact(k).zip(out.iter_mut()) {
            *out = dot(x, y);
        }
    }
    Ok(())
}

fn fallback(accelerator: &Accelerator, error: engine::Error) -> Result<(), Error> {
    match error {
        engine::Error::Unsupported(reason)
            if accelerator.options().fallback == FallbackPolicy::FullPrecision =>
        {
            tracing::warn!(%reason, "unsupported configuration, computing in full precision");
            Ok(())
        }
        error => Err(error.into()),
    }
}

pub(crate) fn f32bf16f32(
    accelerator: &Accelerator,
    xrow: usize,
    xcol: usize,
    yrow: usize,
    ycol: usize,
    x: &[f32],
    y: &[f32],
    out: &mut [f32],
) -> Result<(), Error> {
    let (x, y, out) = bind(xrow, xcol, yrow, ycol, x, y, out)?;
    let src = describe(xrow, xcol, Precision::Bf16, Layout::Any)?;
    let weights = describe(yrow, ycol, Precision::Bf16, Layout::Any)?;
    let engine = accelerator.engine();
    let plan = match build_plan(engine, src, weights, out.desc()) {
        Ok(plan) => plan,
        Err(error) => {
            fallback(accelerator, error)?;
            return rows(x, y, out, simd::floating_f32::reduce_sum_of_xy);
        }
    };
    ExecutionContext::scope(|arena| {
        let mut stream = accelerator.stream().lock();
        let src = convert(engine, &mut stream, x, plan.src_desc(), arena)?;
        let weights = convert(engine, &mut stream, y, plan.weights_desc(), arena)?;
        plan.execute(
            &mut stream,
            ExecArgs {
                src: src.as_memory(),
                weights: weights.as_memory(),
                dst: out,
            },
        )?;
        stream.wait();
        Ok(())
    })
}

pub(crate) fn bf16bf16f32(
    accelerator: &Accelerator,
    xrow: usize,
    xcol: usize,
    yrow: usize,
    ycol: usize,
    x: &[bf16],
    y: &[bf16],
    out: &mut [f32],
) -> Result<(), Error> {
    let (x, y, out) = bind(xrow, xcol, yrow, ycol, x, y, out)?;
    let plan = match build_plan(accelerator.engine(), x.desc(), y.desc(), out.desc()) {
        Ok(plan) => plan,
        Err(error) => {
            fallback(accelerator, error)?;
            return rows(x, y, out, simd::floating_bf16::reduce_sum_of_xy);
        }
    };
    ExecutionContext::scope(|_| {
        let mut stream = accelerator.stream().lock();
        plan.execute(
            &mut stream,
            ExecArgs {
                src: x,
                weights: y,
                dst: out,
            },
        )?;
        stream.wait();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AccelOptions;
    use engine::Kernel;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn accelerator(options: &str) -> Accelerator {
        Accelerator::new(AccelOptions::parse(options).unwrap()).unwrap()
    }

    fn matrix(rng: &mut ChaCha8Rng, len: usize) -> Vec<f32> {
        (0..len).map(|_| rng.random_range(-1.0..=1.0)).collect()
    }

    fn reference(k: usize, x: &[f32], y: &[f32]) -> Vec<f64> {
        let mut out = Vec::new();
        for x in x.chunks_exact(k) {
            for y in y.chunks_exact(k) {
                out.push(x.iter().zip(y).map(|(&a, &b)| a as f64 * b as f64).sum());
            }
        }
        out
    }

    #[test]
    fn single_query() {
        let accelerator = accelerator("");
        let mut out = [0.0f32; 1];
        f32bf16f32(
            &accelerator,
            1,
            4,
            1,
            4,
            &[1.0, 2.0, 3.0, 4.0],
            &[1.0, 2.0, 3.0, 4.0],
            &mut out,
        )
        .unwrap();
        assert!((out[0] - 30.0).abs() < 1e-3, "{}", out[0]);
    }

    #[test]
    fn error_is_bounded() {
        let accelerator = accelerator("");
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for (m, n, k) in [(1, 1, 1), (3, 5, 7), (17, 33, 64), (8, 100, 300)] {
            let x = matrix(&mut rng, m * k);
            let y = matrix(&mut rng, n * k);
            let mut out = vec![f32::NAN; m * n];
            f32bf16f32(&accelerator, m, k, n, k, &x, &y, &mut out).unwrap();
            let tolerance = 1e-2 * (k as f64).sqrt() + 1e-3;
            for (i, (&got, expected)) in out.iter().zip(reference(k, &x, &y)).enumerate() {
                assert!(
                    (got as f64 - expected).abs() <= tolerance,
                    "({m}, {n}, {k}) element {i}: {got} vs {expected}"
                );
            }
        }
    }

    #[test]
    fn output_is_query_rows_by_database_rows() {
        let accelerator = accelerator("");
        let x = [1.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let y = [2.0, 0.0, 0.0, 4.0];
        let mut out = [0.0f32; 6];
        f32bf16f32(&accelerator, 3, 2, 2, 2, &x, &y, &mut out).unwrap();
        assert_eq!(out, [2.0, 0.0, 0.0, 4.0, 2.0, 4.0]);
    }

    #[test]
    fn waits_for_every_submission() {
        let accelerator = accelerator("");
        let mut out = [0.0f32; 4];
        f32bf16f32(&accelerator, 2, 3, 2, 3, &[1.0; 6], &[2.0; 6], &mut out).unwrap();
        assert_eq!(out, [6.0; 4]);
        let stream = accelerator.stream();
        // two conversions and the multiply
        assert_eq!(stream.submitted(), 3);
        assert_eq!(stream.completed(), 3);
    }

    #[test]
    fn bf16_inputs_skip_conversion() {
        let accelerator = accelerator("threads = 2");
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let (m, n, k) = (9, 13, 40);
        let x = matrix(&mut rng, m * k);
        let y = matrix(&mut rng, n * k);
        let reduced = |v: &[f32]| v.iter().map(|&v| bf16::from_f32(v)).collect::<Vec<_>>();
        let (xb, yb) = (reduced(&x), reduced(&y));
        let plan = {
            let mut out = vec![0.0f32; m * n];
            let (x, y, out) = bind(m, k, n, k, &xb, &yb, &mut out).unwrap();
            build_plan(accelerator.engine(), x.desc(), y.desc(), out.desc()).unwrap()
        };
        assert_eq!(plan.kernel(), Kernel::Rows);
        let mut accelerated = vec![0.0f32; m * n];
        bf16bf16f32(&accelerator, m, k, n, k, &xb, &yb, &mut accelerated).unwrap();
        let mut converted = vec![0.0f32; m * n];
        f32bf16f32(&accelerator, m, k, n, k, &x, &y, &mut converted).unwrap();
        for (a, b) in accelerated.iter().zip(&converted) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
        assert_eq!(accelerator.stream().submitted(), 4);
    }

    #[test]
    fn scratch_is_released_after_the_call() {
        let accelerator = accelerator("");
        let (m, n, k) = (4, 2048, 256);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let x = matrix(&mut rng, m * k);
        let y = matrix(&mut rng, n * k);
        let mut out = vec![0.0f32; m * n];
        f32bf16f32(&accelerator, m, k, n, k, &x, &y, &mut out).unwrap();
        let retained = ExecutionContext::retained_bytes();
        assert!(
            retained <= crate::context::RETAINED_BYTES,
            "{retained} bytes of scratch held after the call"
        );
    }

    #[test]
    fn invalid_calls_are_rejected() {
        let accelerator = accelerator("");
        let mut out = [0.0f32; 4];
        assert!(matches!(
            f32bf16f32(&accelerator, 2, 3, 2, 4, &[0.0; 6], &[0.0; 8], &mut out),
            Err(Error::Engine(engine::Error::ShapeMismatch(_)))
        ));
        assert!(matches!(
            f32bf16f32(&accelerator, 0, 3, 2, 3, &[], &[0.0; 6], &mut []),
            Err(Error::Engine(engine::Error::EmptyShape { .. }))
        ));
        assert!(matches!(
            f32bf16f32(&accelerator, 2, 3, 2, 3, &[0.0; 5], &[0.0; 6], &mut out),
            Err(Error::Engine(engine::Error::BufferSize { .. }))
        ));
        assert!(matches!(
            f32bf16f32(&accelerator, 2, 3, 2, 3, &[0.0; 6], &[0.0; 6], &mut out[..3]),
            Err(Error::Engine(engine::Error::BufferSize { .. }))
        ));
        assert_eq!(accelerator.stream().submitted(), 0);
    }

    #[test]
    fn unsupported_configuration_follows_policy() {
        // the reduced operands need 2 * 4 * 64 bytes at least
        let strict = accelerator("max_scratch_bytes = 64");
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let x = matrix(&mut rng, 4 * 64);
        let y = matrix(&mut rng, 4 * 64);
        let mut out = [0.0f32; 16];
        assert!(matches!(
            f32bf16f32(&strict, 4, 64, 4, 64, &x, &y, &mut out),
            Err(Error::Engine(engine::Error::Unsupported(_)))
        ));
        let lenient = accelerator("max_scratch_bytes = 64\nfallback = \"full_precision\"");
        f32bf16f32(&lenient, 4, 64, 4, 64, &x, &y, &mut out).unwrap();
        for (&got, expected) in out.iter().zip(reference(64, &x, &y)) {
            assert!((got as f64 - expected).abs() < 1e-4, "{got} vs {expected}");
        }
        assert_eq!(lenient.stream().submitted(), 0);
    }
}
