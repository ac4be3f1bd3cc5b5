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

//! Inner products of f32 matrices computed on bf16 operands.
//!
//! The accelerated path is switched on with `DNNL_ENABLE=1` and tuned with
//! `DNNL_OPTIONS`, a TOML document (see [`AccelOptions`]). When it is on,
//! the engine is built at library load, or on first use where no load hook
//! is available.

mod capability;
mod context;
mod error;
mod gate;
mod options;
mod pipeline;
mod runtime;

pub mod ffi;

pub use capability::{FullPrecision, InnerProduct, capability};
pub use context::ExecutionContext;
pub use error::Error;
pub use gate::{ENABLE_VARIABLE, FeatureGate};
pub use options::{AccelOptions, FallbackPolicy, OPTIONS_VARIABLE};
pub use pipeline::{build_plan, convert};
pub use runtime::{Accelerator, Runtime};

pub use engine;
pub use simd::bf16;

/// The runtime behind the entry points, configured from the environment.
pub static RUNTIME: Runtime = Runtime::new(FeatureGate::from_env(), AccelOptions::from_env);

pub fn is_accelerated_path_enabled() -> bool {
    RUNTIME.gate().is_enabled()
}

pub fn ensure_engine_initialized() -> Result<(), Error> {
    RUNTIME.ensure_engine_initialized().map(|_| ())
}

/// `out[i * yrow + j] = <x[i], y[j]>` with both operands rounded to bf16.
pub fn f32bf16f32_inner_product(
    xrow: usize,
    xcol: usize,
    yrow: usize,
    ycol: usize,
    x: &[f32],
    y: &[f32],
    out: &mut [f32],
) -> Result<(), Error> {
    RUNTIME.inner_product_f32(xrow, xcol, yrow, ycol, x, y, out)
}

pub fn bf16bf16f32_inner_product(
    xrow: usize,
    xcol: usize,
    yrow: usize,
    ycol: usize,
    x: &[bf16],
    y: &[bf16],
    out: &mut [f32],
) -> Result<(), Error> {
    RUNTIME.inner_product_bf16(xrow, xcol, yrow, ycol, x, y, out)
}

#[cfg(all(feature = "init", target_os = "linux"))]
#[allow(unsafe_code)]
#[used]
#[unsafe(link_section = ".init_array")]
static ON_LOAD: extern "C" fn() = {
    extern "C" fn on_load() {
        RUNTIME.on_load();
    }
    on_load
};

#[cfg(not(target_endian = "little"))]
compile_error!("Target architecture is not supported.");
