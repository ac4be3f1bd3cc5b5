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

//! C ABI of the entry points. Every function returns `STATUS_OK` or a
//! negative status code.

#![allow(unsafe_code)]

use crate::error::Error;
use simd::bf16;
use std::ffi::c_int;
use zerocopy::{FromBytes, IntoBytes};

pub const STATUS_OK: c_int = 0;
pub const STATUS_NOT_INITIALIZED: c_int = -1;
pub const STATUS_INVALID_ARGUMENT: c_int = -2;
pub const STATUS_UNSUPPORTED: c_int = -3;
pub const STATUS_INVALID_OPTIONS: c_int = -4;
pub const STATUS_INTERNAL: c_int = -5;

fn status(result: Result<(), Error>) -> c_int {
    use engine::Error as E;
    match result {
        Ok(()) => STATUS_OK,
        Err(Error::NotInitialized) => STATUS_NOT_INITIALIZED,
        Err(Error::Options(_)) => STATUS_INVALID_OPTIONS,
        Err(Error::Engine(e)) => match e {
            E::EmptyShape { .. }
            | E::ShapeMismatch(_)
            | E::BufferSize { .. }
            | E::PrecisionMismatch { .. } => STATUS_INVALID_ARGUMENT,
            E::Unsupported(_) | E::UndefinedLayout | E::NoDevice { .. } => STATUS_UNSUPPORTED,
            E::ThreadPool(_) | E::EngineMismatch => STATUS_INTERNAL,
        },
    }
}

/// Element counts of `x`, `y` and `out`.
fn lengths(xrow: usize, xcol: usize, yrow: usize, ycol: usize) -> Option<(usize, usize, usize)> {
    Some((
        xrow.checked_mul(xcol)?,
        yrow.checked_mul(ycol)?,
        xrow.checked_mul(yrow)?,
    ))
}

/// Computes `out = x · yᵗ` with both operands rounded to bf16.
///
/// # Safety
///
/// Unless null, `x` must be valid for reads of `xrow * xcol` floats, `y`
/// for reads of `yrow * ycol` floats and `out` for writes of
/// `xrow * yrow` floats. `out` must not overlap `x` or `y`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fvec_f32bf16f32_inner_product(
    xrow: usize,
    xcol: usize,
    yrow: usize,
    ycol: usize,
    x: *const f32,
    y: *const f32,
    out: *mut f32,
) -> c_int {
    let Some((x_len, y_len, out_len)) = lengths(xrow, xcol, yrow, ycol) else {
        return STATUS_INVALID_ARGUMENT;
    };
    if x.is_null() || y.is_null() || out.is_null() {
        return STATUS_INVALID_ARGUMENT;
    }
    let x = unsafe { std::slice::from_raw_parts(x, x_len) };
    let y = unsafe { std::slice::from_raw_parts(y, y_len) };
    let out = unsafe { std::slice::from_raw_parts_mut(out, out_len) };
    status(crate::f32bf16f32_inner_product(
        xrow, xcol, yrow, ycol, x, y, out,
    ))
}

/// Computes `out = x · yᵗ` for operands given as bf16 bit patterns.
///
/// # Safety
///
/// Same as [`fvec_f32bf16f32_inner_product`], with `x` and `y` pointing to
/// `uint16_t` elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fvec_bf16bf16f32_inner_product(
    xrow: usize,
    xcol: usize,
    yrow: usize,
    ycol: usize,
    x: *const u16,
    y: *const u16,
    out: *mut f32,
) -> c_int {
    let Some((x_len, y_len, out_len)) = lengths(xrow, xcol, yrow, ycol) else {
        return STATUS_INVALID_ARGUMENT;
    };
    if x.is_null() || y.is_null() || out.is_null() {
        return STATUS_INVALID_ARGUMENT;
    }
    let x = unsafe { std::slice::from_raw_parts(x, x_len) };
    let y = unsafe { std::slice::from_raw_parts(y, y_len) };
    let out = unsafe { std::slice::from_raw_parts_mut(out, out_len) };
    let (Ok(x), Ok(y)) = (
        <[bf16]>::ref_from_bytes(x.as_bytes()),
        <[bf16]>::ref_from_bytes(y.as_bytes()),
    ) else {
        return STATUS_INVALID_ARGUMENT;
    };
    status(crate::bf16bf16f32_inner_product(
        xrow, xcol, yrow, ycol, x, y, out,
    ))
}
