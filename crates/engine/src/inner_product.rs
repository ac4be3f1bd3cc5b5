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

use crate::desc::{Layout, MemoryDesc, Precision};
use crate::engine::{Engine, EngineId};
use crate::error::{Error, Result};
use crate::memory::{Memory, MemoryMut};
use crate::stream::StreamGuard;
use rayon::prelude::*;
use simd::bf16;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    /// The destination may be consumed by later primitives.
    ForwardTraining,
    /// The destination is the final consumer.
    ForwardInference,
}

/// Algorithm selected by a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    /// Weights stay row-major; one dot product per output element.
    Rows,
    /// Weights packed in panels of 8 rows.
    Panel8,
    /// Weights packed in panels of 16 rows.
    Panel16,
}

impl Kernel {
    pub fn name(self) -> &'static str {
        match self {
            Kernel::Rows => "rows",
            Kernel::Panel8 => "panel8",
            Kernel::Panel16 => "panel16",
        }
    }
}

/// Arguments of an inner product execution.
pub struct ExecArgs<'a, 'b> {
    pub src: Memory<'a, bf16>,
    pub weights: Memory<'a, bf16>,
    pub dst: MemoryMut<'b, f32>,
}

/// An inner product `dst = src · weightsᵗ` resolved for concrete shapes,
/// precisions and layouts.
///
/// `src` is `m × k`, `weights` is `n × k` and `dst` is `m × n`. Descriptors
/// given with [`Layout::Any`] are resolved by the plan; read the resolved ones
/// back with [`InnerProductPlan::src_desc`] and
/// [`InnerProductPlan::weights_desc`] before allocating memory for them.
#[derive(Debug, Clone)]
pub struct InnerProductPlan {
    engine: EngineId,
    prop_kind: PropKind,
    src: MemoryDesc,
    weights: MemoryDesc,
    dst: MemoryDesc,
    kernel: Kernel,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl InnerProductPlan {
    pub fn new(
        engine: &Engine,
        prop_kind: PropKind,
        src: MemoryDesc,
        weights: MemoryDesc,
        dst: MemoryDesc,
    ) -> Result<Self> {
        if src.cols() != weights.cols() || dst.rows() != src.rows() || dst.cols() != weights.rows()
        {
            return Err(Error::ShapeMismatch(format!(
                "{}x{} by {}x{} into {}x{}",
                src.rows(),
                src.cols(),
                weights.rows(),
                weights.cols(),
                dst.rows(),
                dst.cols()
            )));
        }
        match (src.precision(), weights.precision(), dst.precision()) {
            (Precision::Bf16, Precision::Bf16, Precision::F32) => (),
            (s, w, d) => {
                return Err(Error::Unsupported(format!(
                    "inner product of {s:?} by {w:?} into {d:?}"
                )));
            }
        }
        let mut scratch = 0usize;
        if src.layout() == Layout::Any {
            scratch += src.with_layout(Layout::RowMajor).bytes()?;
        }
        let src = match src.layout() {
            Layout::Any | Layout::RowMajor => src.with_layout(Layout::RowMajor),
            layout => {
                return Err(Error::Unsupported(format!("activations in {layout:?} layout")));
            }
        };
        let dst = match dst.layout() {
            Layout::Any | Layout::RowMajor => dst.with_layout(Layout::RowMajor),
            layout => {
                return Err(Error::Unsupported(format!("destination in {layout:?} layout")));
            }
        };
        let weights_chosen = weights.layout() == Layout::Any;
        let (weights, kernel) = match weights.layout() {
            Layout::Any if engine.panel_width() == 16 => {
                (weights.with_layout(Layout::Panel(16)), Kernel::Panel16)
            }
            Layout::Any => (weights.with_layout(Layout::Panel(8)), Kernel::Panel8),
            Layout::RowMajor => (weights, Kernel::Rows),
            Layout::Panel(8) => (weights, Kernel::Panel8),
            Layout::Panel(16) => (weights, Kernel::Panel16),
            layout => {
                return Err(Error::Unsupported(format!("weights in {layout:?} layout")));
            }
        };
        if weights_chosen {
            scratch = scratch.saturating_add(weights.bytes()?);
        }
        if scratch > engine.scratch_limit() {
            return Err(Error::Unsupported(format!(
                "{scratch} bytes of scratch exceed the limit of {} bytes",
                engine.scratch_limit()
            )));
        }
        dst.bytes()?;
        tracing::debug!(
            kernel = kernel.name(),
            m = src.rows(),
            n = weights.rows(),
            k = src.cols(),
            "inner product plan"
        );
        Ok(Self {
            engine: engine.id(),
            prop_kind,
            src,
            weights,
            dst,
            kernel,
            pool: engine.pool().cloned(),
        })
    }

    pub fn prop_kind(&self) -> PropKind {
        self.prop_kind
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn src_desc(&self) -> MemoryDesc {
        self.src
    }

    pub fn weights_desc(&self) -> MemoryDesc {
        self.weights
    }

    pub fn dst_desc(&self) -> MemoryDesc {
        self.dst
    }

    pub fn execute(&self, stream: &mut StreamGuard<'_>, args: ExecArgs<'_, '_>) -> Result<()> {
        let ExecArgs {
            src,
            weights,
            mut dst,
        } = args;
        if src.desc() != self.src || weights.desc() != self.weights || dst.desc() != self.dst {
            return Err(Error::ShapeMismatch(
                "memory does not match the plan".to_string(),
            ));
        }
        let k = self.src.cols();
        let n = self.weights.rows();
        let kernel = self.kernel;
        let m = self.src.rows();
        stream.submit(self.engine, || {
            let x = src.data();
            let w = weights.data();
            let out = dst.data_mut();
            match &self.pool {
                Some(pool) if m > 1 => {
                    let rows = m.div_ceil(pool.current_num_threads());
                    pool.install(|| {
                        x.par_chunks(rows * k)
                            .zip(out.par_chunks_mut(rows * n))
                            .for_each(|(x, out)| compute(kernel, k, n, x, w, out));
                    });
                }
                _ => compute(kernel, k, n, x, w, out),
            }
            Ok(())
        })
    }
}

fn compute(kernel: Kernel, k: usize, n: usize, x: &[bf16], w: &[bf16], out: &mut [f32]) {
    match kernel {
        Kernel::Rows => {
            for (x, out) in x.chunks_exact(k).zip(out.chunks_exact_mut(n)) {
                for (y, out) in w.chunks_exact(k).zip(out.iter_mut()) {
                    *out = simd::floating_bf16::reduce_sum_of_xy(x, y);
                }
            }
        }
        Kernel::Panel8 => {
            panels::<8>(k, n, x, w, out, simd::floating_bf16::reduce_sum_of_xy_panel_8)
        }
        Kernel::Panel16 => {
            panels::<16>(k, n, x, w, out, simd::floating_bf16::reduce_sum_of_xy_panel_16)
        }
    }
}

fn panels<const W: usize>(
    k: usize,
    n: usize,
    x: &[bf16],
    w: &[bf16],
    out: &mut [f32],
    f: fn(&[bf16], &[bf16], &mut [f32; W]),
) {
    let mut sum = [0.0f32; W];
    for (x, out) in x.chunks_exact(k).zip(out.chunks_exact_mut(n)) {
        for (p, panel) in w.chunks_exact(W * k).enumerate() {
            f(x, panel, &mut sum);
            let start = p * W;
            let valid = W.min(n - start);
            out[start..][..valid].copy_from_slice(&sum[..valid]);
        }
    }
}
