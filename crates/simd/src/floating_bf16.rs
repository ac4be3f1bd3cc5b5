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

//! Kernels over bfloat16 operands. Products are always accumulated in f32.
//!
//! A panel of width `W` stores `W` rows column-interleaved: element
//! `(row r, column k)` lives at `k * W + r`.

use crate::bf16;

pub use reduce_sum_of_xy::reduce_sum_of_xy;
pub use reduce_sum_of_xy_panel_8::reduce_sum_of_xy_panel_8;
pub use reduce_sum_of_xy_panel_16::reduce_sum_of_xy_panel_16;
pub use vector_from_f32::vector_from_f32;

/// Exact widening: a bf16 is the upper half of an f32.
#[inline(always)]
pub fn widen(x: bf16) -> f32 {
    f32::from_bits((x.to_bits() as u32) << 16)
}

#[inline]
#[cfg(target_arch = "x86_64")]
#[crate::target_cpu(enable = "v3")]
fn widen_v3(x: core::arch::x86_64::__m128i) -> core::arch::x86_64::__m256 {
    use core::arch::x86_64::*;
    _mm256_castsi256_ps(_mm256_slli_epi32::<16>(_mm256_cvtepu16_epi32(x)))
}

#[inline]
#[cfg(target_arch = "x86_64")]
#[crate::target_cpu(enable = "v4")]
fn widen_v4(x: core::arch::x86_64::__m256i) -> core::arch::x86_64::__m512 {
    use core::arch::x86_64::*;
    _mm512_castsi512_ps(_mm512_slli_epi32::<16>(_mm512_cvtepu16_epi32(x)))
}

mod vector_from_f32 {
    use super::*;

    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v4")]
    fn round_v4(x: core::arch::x86_64::__m512) -> core::arch::x86_64::__m512i {
        use core::arch::x86_64::*;
        let bits = _mm512_castps_si512(x);
        let upper = _mm512_srli_epi32::<16>(bits);
        let lsb = _mm512_and_si512(upper, _mm512_set1_epi32(1));
        let biased = _mm512_add_epi32(bits, _mm512_set1_epi32(0x7fff));
        let rounded = _mm512_srli_epi32::<16>(_mm512_add_epi32(biased, lsb));
        let quieted = _mm512_or_si512(upper, _mm512_set1_epi32(0x0040));
        let nan = _mm512_cmp_ps_mask::<_CMP_UNORD_Q>(x, x);
        _mm512_mask_blend_epi32(nan, rounded, quieted)
    }

    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v4")]
    fn vector_from_f32_v4(this: &[f32], out: &mut [bf16]) {
        assert!(this.len() == out.len());
        use core::arch::x86_64::*;
        let mut n = this.len();
        let mut a = this.as_ptr();
        let mut b = out.as_mut_ptr();
        while n >= 16 {
            let x = unsafe { _mm512_loadu_ps(a) };
            unsafe { _mm256_storeu_si256(b.cast(), _mm512_cvtepi32_epi16(round_v4(x))) };
            (n, a, b) = unsafe { (n - 16, a.add(16), b.add(16)) };
        }
        if n > 0 {
            let mask = _bzhi_u32(0xffff, n as u32) as u16;
            let x = unsafe { _mm512_maskz_loadu_ps(mask, a) };
            unsafe { _mm512_mask_cvtepi32_storeu_epi16(b.cast(), mask, round_v4(x)) };
        }
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    fn vector_from_f32_v4_test() {
        if !crate::is_cpu_detected!("v4") {
            println!("test {} ... skipped (v4)", module_path!());
            return;
        }
        let this = tests::inputs();
        for z in 4000..4016 {
            let this = &this[..z];
            let mut specialized = vec![bf16::ZERO; z];
            let mut fallback_out = vec![bf16::ZERO; z];
            unsafe { vector_from_f32_v4(this, &mut specialized) };
            fallback(this, &mut fallback_out);
            tests::assert_same_bits(&specialized, &fallback_out);
        }
    }

    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v3")]
    fn vector_from_f32_v3(this: &[f32], out: &mut [bf16]) {
        assert!(this.len() == out.len());
        use core::arch::x86_64::*;
        let one = _mm256_set1_epi32(1);
        let bias = _mm256_set1_epi32(0x7fff);
        let quiet = _mm256_set1_epi32(0x0040);
        let mut n = this.len();
        let mut a = this.as_ptr();
        let mut b = out.as_mut_ptr();
        while n >= 8 {
            let x = unsafe { _mm256_loadu_ps(a) };
            let bits = _mm256_castps_si256(x);
            let upper = _mm256_srli_epi32::<16>(bits);
            let lsb = _mm256_and_si256(upper, one);
            let rounded = _mm256_srli_epi32::<16>(_mm256_add_epi32(
                _mm256_add_epi32(bits, bias),
                lsb,
            ));
            let nan = _mm256_castps_si256(_mm256_cmp_ps::<_CMP_UNORD_Q>(x, x));
            let y = _mm256_blendv_epi8(rounded, _mm256_or_si256(upper, quiet), nan);
            // lanes hold values below 0x10000, so unsigned saturation is exact
            let packed = _mm256_permute4x64_epi64::<0b1000>(_mm256_packus_epi32(y, y));
            unsafe { _mm_storeu_si128(b.cast(), _mm256_castsi256_si128(packed)) };
            (n, a, b) = unsafe { (n - 8, a.add(8), b.add(8)) };
        }
        while n > 0 {
            unsafe { b.write(crate::bf16::from_f32(a.read())) };
            (n, a, b) = unsafe { (n - 1, a.add(1), b.add(1)) };
        }
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    fn vector_from_f32_v3_test() {
        if !crate::is_cpu_detected!("v3") {
            println!("test {} ... skipped (v3)", module_path!());
            return;
        }
        let this = tests::inputs();
        for z in 4000..4016 {
            let this = &this[..z];
            let mut specialized = vec![bf16::ZERO; z];
            let mut fallback_out = vec![bf16::ZERO; z];
            unsafe { vector_from_f32_v3(this, &mut specialized) };
            fallback(this, &mut fallback_out);
            tests::assert_same_bits(&specialized, &fallback_out);
        }
    }

    /// Rounds every element to the nearest bf16, ties to even.
    #[crate::multiversion(@"v4", @"v3", "v2", "a2")]
    pub fn vector_from_f32(this: &[f32], out: &mut [bf16]) {
        assert!(this.len() == out.len());
        let n = this.len();
        for i in 0..n {
            out[i] = bf16::from_f32(this[i]);
        }
    }

    #[cfg(test)]
    #[test]
    fn vector_from_f32_rounding_test() {
        let input = [
            1.0f32,
            -2.5,
            // halfway between two bf16 values, rounds to the even one
            f32::from_bits(0x3f80_8000),
            f32::from_bits(0x3f81_8000),
            // just above halfway, rounds up
            f32::from_bits(0x3f80_8001),
            f32::INFINITY,
        ];
        let mut output = vec![bf16::ZERO; input.len()];
        vector_from_f32(&input, &mut output);
        let bits = output.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits, [0x3f80, 0xc020, 0x3f80, 0x3f82, 0x3f81, 0x7f80]);
        let mut nan = [bf16::ZERO];
        vector_from_f32(&[f32::NAN], &mut nan);
        assert!(nan[0].is_nan());
    }
}

mod reduce_sum_of_xy {
    use super::*;

    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v4")]
    #[target_feature(enable = "avx512bf16")]
    fn reduce_sum_of_xy_v4_avx512bf16(lhs: &[bf16], rhs: &[bf16]) -> f32 {
        assert!(lhs.len() == rhs.len());
        use core::arch::x86_64::*;
        use core::mem::transmute;
        let mut n = lhs.len();
        let mut a = lhs.as_ptr();
        let mut b = rhs.as_ptr();
        let mut sum = _mm512_setzero_ps();
        while n >= 32 {
            let x = unsafe { transmute::<__m512i, __m512bh>(_mm512_loadu_si512(a.cast())) };
            let y = unsafe { transmute::<__m512i, __m512bh>(_mm512_loadu_si512(b.cast())) };
            sum = _mm512_dpbf16_ps(sum, x, y);
            (n, a, b) = unsafe { (n - 32, a.add(32), b.add(32)) };
        }
        if n > 0 {
            let mask = _bzhi_u32(0xffff_ffff, n as u32);
            let x = unsafe { _mm512_maskz_loadu_epi16(mask, a.cast()) };
            let y = unsafe { _mm512_maskz_loadu_epi16(mask, b.cast()) };
            let (x, y) = unsafe {
                (
                    transmute::<__m512i, __m512bh>(x),
                    transmute::<__m512i, __m512bh>(y),
                )
            };
            sum = _mm512_dpbf16_ps(sum, x, y);
        }
        _mm512_reduce_add_ps(sum)
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    fn reduce_sum_of_xy_v4_avx512bf16_test() {
        const EPSILON: f32 = 0.004;
        if !crate::is_cpu_detected!("v4") || !crate::is_feature_detected!("avx512bf16") {
            println!("test {} ... skipped (v4:avx512bf16)", module_path!());
            return;
        }
        for _ in 0..if cfg!(not(miri)) { 256 } else { 1 } {
            let (lhs, rhs) = (tests::random(4016), tests::random(4016));
            for z in 3984..4016 {
                let lhs = &lhs[..z];
                let rhs = &rhs[..z];
                let specialized = unsafe { reduce_sum_of_xy_v4_avx512bf16(lhs, rhs) };
                let fallback = fallback(lhs, rhs);
                assert!(
                    (specialized - fallback).abs() < EPSILON,
                    "specialized = {specialized}, fallback = {fallback}."
                );
            }
        }
    }

    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v4")]
    fn reduce_sum_of_xy_v4(lhs: &[bf16], rhs: &[bf16]) -> f32 {
        assert!(lhs.len() == rhs.len());
        use core::arch::x86_64::*;
        let mut n = lhs.len();
        let mut a = lhs.as_ptr();
        let mut b = rhs.as_ptr();
        let mut sum = _mm512_setzero_ps();
        while n >= 16 {
            let x = widen_v4(unsafe { _mm256_loadu_si256(a.cast()) });
            let y = widen_v4(unsafe { _mm256_loadu_si256(b.cast()) });
            sum = _mm512_fmadd_ps(x, y, sum);
            (n, a, b) = unsafe { (n - 16, a.add(16), b.add(16)) };
        }
        if n > 0 {
            let mask = _bzhi_u32(0xffff, n as u32) as u16;
            let x = widen_v4(unsafe { _mm256_maskz_loadu_epi16(mask, a.cast()) });
            let y = widen_v4(unsafe { _mm256_maskz_loadu_epi16(mask, b.cast()) });
            sum = _mm512_fmadd_ps(x, y, sum);
        }
        _mm512_reduce_add_ps(sum)
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    fn reduce_sum_of_xy_v4_test() {
        const EPSILON: f32 = 0.004;
        if !crate::is_cpu_detected!("v4") {
            println!("test {} ... skipped (v4)", module_path!());
            return;
        }
        for _ in 0..if cfg!(not(miri)) { 256 } else { 1 } {
            let (lhs, rhs) = (tests::random(4016), tests::random(4016));
            for z in 3984..4016 {
                let lhs = &lhs[..z];
                let rhs = &rhs[..z];
                let specialized = unsafe { reduce_sum_of_xy_v4(lhs, rhs) };
                let fallback = fallback(lhs, rhs);
                assert!(
                    (specialized - fallback).abs() < EPSILON,
                    "specialized = {specialized}, fallback = {fallback}."
                );
            }
        }
    }

    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v3")]
    fn reduce_sum_of_xy_v3(lhs: &[bf16], rhs: &[bf16]) -> f32 {
        use crate::emulate::emulate_mm256_reduce_add_ps;
        assert!(lhs.len() == rhs.len());
        use core::arch::x86_64::*;
        let mut n = lhs.len();
        let mut a = lhs.as_ptr();
        let mut b = rhs.as_ptr();
        let mut sum = _mm256_setzero_ps();
        while n >= 8 {
            let x = widen_v3(unsafe { _mm_loadu_si128(a.cast()) });
            let y = widen_v3(unsafe { _mm_loadu_si128(b.cast()) });
            sum = _mm256_fmadd_ps(x, y, sum);
            (n, a, b) = unsafe { (n - 8, a.add(8), b.add(8)) };
        }
        let mut tail = 0.0f32;
        while n > 0 {
            let (x, y) = unsafe { (widen(a.read()), widen(b.read())) };
            tail = x.mul_add(y, tail);
            (n, a, b) = unsafe { (n - 1, a.add(1), b.add(1)) };
        }
        emulate_mm256_reduce_add_ps(sum) + tail
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    fn reduce_sum_of_xy_v3_test() {
        const EPSILON: f32 = 0.004;
        if !crate::is_cpu_detected!("v3") {
            println!("test {} ... skipped (v3)", module_path!());
            return;
        }
        for _ in 0..if cfg!(not(miri)) { 256 } else { 1 } {
            let (lhs, rhs) = (tests::random(4016), tests::random(4016));
            for z in 3984..4016 {
                let lhs = &lhs[..z];
                let rhs = &rhs[..z];
                let specialized = unsafe { reduce_sum_of_xy_v3(lhs, rhs) };
                let fallback = fallback(lhs, rhs);
                assert!(
                    (specialized - fallback).abs() < EPSILON,
                    "specialized = {specialized}, fallback = {fallback}."
                );
            }
        }
    }

    #[crate::multiversion(@"v4:avx512bf16", @"v4", @"v3", "v2", "a2")]
    pub fn reduce_sum_of_xy(lhs: &[bf16], rhs: &[bf16]) -> f32 {
        assert!(lhs.len() == rhs.len());
        let n = lhs.len();
        let mut xy = 0.0f32;
        for i in 0..n {
            xy += widen(lhs[i]) * widen(rhs[i]);
        }
        xy
    }
}

mod reduce_sum_of_xy_panel_8 {
    use super::*;
    use seq_macro::seq;

    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v3")]
    fn reduce_sum_of_xy_panel_8_v3(lhs: &[bf16], panel: &[bf16], out: &mut [f32; 8]) {
        assert!(panel.len() == lhs.len() * 8);
        use core::arch::x86_64::*;
        let mut n = lhs.len();
        let mut a = lhs.as_ptr();
        let mut b = panel.as_ptr();
        let mut sum_0 = _mm256_setzero_ps();
        let mut sum_1 = _mm256_setzero_ps();
        while n >= 2 {
            let (x_0, x_1) = unsafe { (widen(a.read()), widen(a.add(1).read())) };
            let y_0 = widen_v3(unsafe { _mm_loadu_si128(b.cast()) });
            let y_1 = widen_v3(unsafe { _mm_loadu_si128(b.add(8).cast()) });
            sum_0 = _mm256_fmadd_ps(_mm256_set1_ps(x_0), y_0, sum_0);
            sum_1 = _mm256_fmadd_ps(_mm256_set1_ps(x_1), y_1, sum_1);
            (n, a, b) = unsafe { (n - 2, a.add(2), b.add(16)) };
        }
        if n > 0 {
            let x = unsafe { widen(a.read()) };
            let y = widen_v3(unsafe { _mm_loadu_si128(b.cast()) });
            sum_0 = _mm256_fmadd_ps(_mm256_set1_ps(x), y, sum_0);
        }
        unsafe { _mm256_storeu_ps(out.as_mut_ptr(), _mm256_add_ps(sum_0, sum_1)) };
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    fn reduce_sum_of_xy_panel_8_v3_test() {
        const EPSILON: f32 = 0.004;
        if !crate::is_cpu_detected!("v3") {
            println!("test {} ... skipped (v3)", module_path!());
            return;
        }
        for d in [1, 2, 7, 64, 257, 1000] {
            let lhs = tests::random(d);
            let panel = tests::random(d * 8);
            let mut specialized = [0.0f32; 8];
            let mut fallback_out = [0.0f32; 8];
            unsafe { reduce_sum_of_xy_panel_8_v3(&lhs, &panel, &mut specialized) };
            fallback(&lhs, &panel, &mut fallback_out);
            for r in 0..8 {
                assert!(
                    (specialized[r] - fallback_out[r]).abs() < EPSILON,
                    "row {r}, d = {d}: specialized = {}, fallback = {}.",
                    specialized[r],
                    fallback_out[r]
                );
            }
        }
    }

    // v4 machines pack 16 rows per panel, so the v3 kernel covers them too
    #[crate::multiversion(@"v3", "v2", "a2")]
    pub fn reduce_sum_of_xy_panel_8(lhs: &[bf16], panel: &[bf16], out: &mut [f32; 8]) {
        assert!(panel.len() == lhs.len() * 8);
        let mut sum = [0.0f32; 8];
        for k in 0..lhs.len() {
            let x = widen(lhs[k]);
            let column = &panel[k * 8..][..8];
            seq!(r in 0..8 {
                sum[r] += x * widen(column[r]);
            });
        }
        *out = sum;
    }
}

mod reduce_sum_of_xy_panel_16 {
    use super::*;
    use seq_macro::seq;

    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v4")]
    fn reduce_sum_of_xy_panel_16_v4(lhs: &[bf16], panel: &[bf16], out: &mut [f32; 16]) {
        assert!(panel.len() == lhs.len() * 16);
        use core::arch::x86_64::*;
        let mut n = lhs.len();
        let mut a = lhs.as_ptr();
        let mut b = panel.as_ptr();
        let mut sum_0 = _mm512_setzero_ps();
        let mut sum_1 = _mm512_setzero_ps();
        while n >= 2 {
            let (x_0, x_1) = unsafe { (widen(a.read()), widen(a.add(1).read())) };
            let y_0 = widen_v4(unsafe { _mm256_loadu_si256(b.cast()) });
            let y_1 = widen_v4(unsafe { _mm256_loadu_si256(b.add(16).cast()) });
            sum_0 = _mm512_fmadd_ps(_mm512_set1_ps(x_0), y_0, sum_0);
            sum_1 = _mm512_fmadd_ps(_mm512_set1_ps(x_1), y_1, sum_1);
            (n, a, b) = unsafe { (n - 2, a.add(2), b.add(32)) };
        }
        if n > 0 {
            let x = unsafe { widen(a.read()) };
            let y = widen_v4(unsafe { _mm256_loadu_si256(b.cast()) });
            sum_0 = _mm512_fmadd_ps(_mm512_set1_ps(x), y, sum_0);
        }
        unsafe { _mm512_storeu_ps(out.as_mut_ptr(), _mm512_add_ps(sum_0, sum_1)) };
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    fn reduce_sum_of_xy_panel_16_v4_test() {
        const EPSILON: f32 = 0.004;
        if !crate::is_cpu_detected!("v4") {
            println!("test {} ... skipped (v4)", module_path!());
            return;
        }
        for d in [1, 2, 7, 64, 257, 1000] {
            let lhs = tests::random(d);
            let panel = tests::random(d * 16);
            let mut specialized = [0.0f32; 16];
            let mut fallback_out = [0.0f32; 16];
            unsafe { reduce_sum_of_xy_panel_16_v4(&lhs, &panel, &mut specialized) };
            fallback(&lhs, &panel, &mut fallback_out);
            for r in 0..16 {
                assert!(
                    (specialized[r] - fallback_out[r]).abs() < EPSILON,
                    "row {r}, d = {d}: specialized = {}, fallback = {}.",
                    specialized[r],
                    fallback_out[r]
                );
            }
        }
    }

    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v3")]
    fn reduce_sum_of_xy_panel_16_v3(lhs: &[bf16], panel: &[bf16], out: &mut [f32; 16]) {
        assert!(panel.len() == lhs.len() * 16);
        use core::arch::x86_64::*;
        let mut n = lhs.len();
        let mut a = lhs.as_ptr();
        let mut b = panel.as_ptr();
        let mut lo_0 = _mm256_setzero_ps();
        let mut hi_0 = _mm256_setzero_ps();
        let mut lo_1 = _mm256_setzero_ps();
        let mut hi_1 = _mm256_setzero_ps();
        while n >= 2 {
            let x_0 = _mm256_set1_ps(unsafe { widen(a.read()) });
            let x_1 = _mm256_set1_ps(unsafe { widen(a.add(1).read()) });
            let (y_lo_0, y_hi_0, y_lo_1, y_hi_1) = unsafe {
                (
                    widen_v3(_mm_loadu_si128(b.cast())),
                    widen_v3(_mm_loadu_si128(b.add(8).cast())),
                    widen_v3(_mm_loadu_si128(b.add(16).cast())),
                    widen_v3(_mm_loadu_si128(b.add(24).cast())),
                )
            };
            lo_0 = _mm256_fmadd_ps(x_0, y_lo_0, lo_0);
            hi_0 = _mm256_fmadd_ps(x_0, y_hi_0, hi_0);
            lo_1 = _mm256_fmadd_ps(x_1, y_lo_1, lo_1);
            hi_1 = _mm256_fmadd_ps(x_1, y_hi_1, hi_1);
            (n, a, b) = unsafe { (n - 2, a.add(2), b.add(32)) };
        }
        if n > 0 {
            let x = _mm256_set1_ps(unsafe { widen(a.read()) });
            let (y_lo, y_hi) = unsafe {
                (
                    widen_v3(_mm_loadu_si128(b.cast())),
                    widen_v3(_mm_loadu_si128(b.add(8).cast())),
                )
            };
            lo_0 = _mm256_fmadd_ps(x, y_lo, lo_0);
            hi_0 = _mm256_fmadd_ps(x, y_hi, hi_0);
        }
        unsafe {
            _mm256_storeu_ps(out.as_mut_ptr(), _mm256_add_ps(lo_0, lo_1));
            _mm256_storeu_ps(out.as_mut_ptr().add(8), _mm256_add_ps(hi_0, hi_1));
        }
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    fn reduce_sum_of_xy_panel_16_v3_test() {
        const EPSILON: f32 = 0.004;
        if !crate::is_cpu_detected!("v3") {
            println!("test {} ... skipped (v3)", module_path!());
            return;
        }
        for d in [1, 2, 7, 64, 257, 1000] {
            let lhs = tests::random(d);
            let panel = tests::random(d * 16);
            let mut specialized = [0.0f32; 16];
            let mut fallback_out = [0.0f32; 16];
            unsafe { reduce_sum_of_xy_panel_16_v3(&lhs, &panel, &mut specialized) };
            fallback(&lhs, &panel, &mut fallback_out);
            for r in 0..16 {
                assert!(
                    (specialized[r] - fallback_out[r]).abs() < EPSILON,
                    "row {r}, d = {d}: specialized = {}, fallback = {}.",
                    specialized[r],
                    fallback_out[r]
                );
            }
        }
    }

    #[crate::multiversion(@"v4", @"v3", "v2", "a2")]
    pub fn reduce_sum_of_xy_panel_16(lhs: &[bf16], panel: &[bf16], out: &mut [f32; 16]) {
        assert!(panel.len() == lhs.len() * 16);
        let mut sum = [0.0f32; 16];
        for k in 0..lhs.len() {
            let x = widen(lhs[k]);
            let column = &panel[k * 16..][..16];
            seq!(r in 0..16 {
                sum[r] += x * widen(column[r]);
            });
        }
        *out = sum;
    }
}
