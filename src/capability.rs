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

use crate::error::Error;
use crate::pipeline;
use crate::runtime::Runtime;
use simd::bf16;

/// Computes `out[i * yrow + j] = <x[i], y[j]>` for row-major `x` of
/// `xrow × xcol` and `y` of `yrow × ycol`.
pub trait InnerProduct: Sync {
    fn inner_product_f32(
        &self,
        xrow: usize,
        xcol: usize,
        yrow: usize,
        ycol: usize,
        x: &[f32],
        y: &[f32],
        out: &mut [f32],
    ) -> Result<(), Error>;

    fn inner_product_bf16(
        &self,
        xrow: usize,
        xcol: usize,
        yrow: usize,
        ycol: usize,
        x: &[bf16],
        y: &[bf16],
        out: &mut [f32],
    ) -> Result<(), Error>;
}

/// Plain f32 arithmetic on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullPrecision;

impl InnerProduct for FullPrecision {
    fn inner_product_f32(
        &self,
        xrow: usize,
        xcol: usize,
        yrow: usize,
        ycol: usize,
        x: &[f32],
        y: &[f32],
        out: &mut [f32],
    ) -> Result<(), Error> {
        let (x, y, out) = pipeline::bind(xrow, xcol, yrow, ycol, x, y, out)?;
        pipeline::rows(x, y, out, simd::floating_f32::reduce_sum_of_xy)
    }

    fn inner_product_bf16(
        &self,
        xrow: usize,
        xcol: usize,
        yrow: usize,
        ycol: usize,
        x: &[bf16],
        y: &[bf16],
        out: &mut [f32],
    ) -> Result<(), Error> {
        let (x, y, out) = pipeline::bind(xrow, xcol, yrow, ycol, x, y, out)?;
        pipeline::rows(x, y, out, simd::floating_bf16::reduce_sum_of_xy)
    }
}

impl InnerProduct for Runtime {
    fn inner_product_f32(
        &self,
        xrow: usize,
        xcol: usize,
        yrow: usize,
        ycol: usize,
        x: &[f32],
        y: &[f32],
        out: &mut [f32],
    ) -> Result<(), Error> {
        pipeline::f32bf16f32(self.accelerator()?, xrow, xcol, yrow, ycol, x, y, out)
    }

    fn inner_product_bf16(
        &self,
        xrow: usize,
        xcol: usize,
        yrow: usize,
        ycol: usize,
        x: &[bf16],
        y: &[bf16],
        out: &mut [f32],
    ) -> Result<(), Error> {
        pipeline::bf16bf16f32(self.accelerator()?, xrow, xcol, yrow, ycol, x, y, out)
    }
}

/// The process-wide runtime when it is usable, plain f32 otherwise.
pub fn capability() -> &'static dyn InnerProduct {
    match crate::RUNTIME.accelerator() {
        Ok(_) => &crate::RUNTIME,
        Err(_) => &FullPrecision,
    }
}
