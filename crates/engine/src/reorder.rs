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
use simd::bf16;

/// Converts a row-major f32 matrix into bf16, in row-major or panel layout.
#[derive(Debug, Clone)]
pub struct Reorder {
    engine: EngineId,
    src: MemoryDesc,
    dst: MemoryDesc,
}

impl Reorder {
    pub fn new(engine: &Engine, src: MemoryDesc, dst: MemoryDesc) -> Result<Self> {
        if (src.rows(), src.cols()) != (dst.rows(), dst.cols()) {
            return Err(Error::ShapeMismatch(format!(
                "reorder from {}x{} to {}x{}",
                src.rows(),
                src.cols(),
                dst.rows(),
                dst.cols()
            )));
        }
        match (src.precision(), dst.precision()) {
            (Precision::F32, Precision::Bf16) => (),
            (from, to) => {
                return Err(Error::Unsupported(format!("reorder from {from:?} to {to:?}")));
            }
        }
        if src.layout() != Layout::RowMajor {
            return Err(Error::Unsupported(format!(
                "reorder from {:?} layout",
                src.layout()
            )));
        }
        if dst.layout() == Layout::Any {
            return Err(Error::UndefinedLayout);
        }
        Ok(Self {
            engine: engine.id(),
            src,
            dst,
        })
    }

    pub fn execute(
        &self,
        stream: &mut StreamGuard<'_>,
        src: Memory<'_, f32>,
        dst: &mut MemoryMut<'_, bf16>,
    ) -> Result<()> {
        if src.desc() != self.src || dst.desc() != self.dst {
            return Err(Error::ShapeMismatch(
                "memory does not match the reorder".to_string(),
            ));
        }
        let cols = self.src.cols();
        let layout = self.dst.layout();
        stream.submit(self.engine, || {
            match layout {
                Layout::RowMajor => {
                    simd::floating_bf16::vector_from_f32(src.data(), dst.data_mut());
                }
                Layout::Panel(width) => pack(src.data(), cols, width, dst.data_mut()),
                Layout::Any => return Err(Error::UndefinedLayout),
            }
            Ok(())
        })
    }
}

/// Interleaves every `width` rows so that a panel reads column by column.
fn pack(src: &[f32], cols: usize, width: usize, dst: &mut [bf16]) {
    let rows = src.len() / cols;
    let mut converted = vec![bf16::ZERO; cols];
    for (p, panel) in dst.chunks_exact_mut(width * cols).enumerate() {
        for r in 0..width {
            let row = p * width + r;
            if row < rows {
                simd::floating_bf16::vector_from_f32(&src[row * cols..][..cols], &mut converted);
            } else {
                converted.fill(bf16::ZERO);
            }
            for (k, x) in converted.iter().enumerate() {
                panel[k * width + r] = *x;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::describe;
    use crate::engine::EngineKind;
    use crate::stream::Stream;
    use bumpalo::Bump;

    fn matrix(rows: usize, cols: usize) -> Vec<f32> {
        (0..rows * cols).map(|x| x as f32 + 0.25).collect()
    }

    #[test]
    fn row_major_conversion_rounds_each_element() {
        let engine = Engine::new(EngineKind::Cpu, 0).unwrap();
        let stream = Stream::new(&engine);
        let arena = Bump::new();
        let data = matrix(3, 5);
        let src_desc = describe(3, 5, Precision::F32, Layout::RowMajor).unwrap();
        let dst_desc = describe(3, 5, Precision::Bf16, Layout::RowMajor).unwrap();
        let reorder = Reorder::new(&engine, src_desc, dst_desc).unwrap();
        let mut dst = MemoryMut::scratch(dst_desc, &arena).unwrap();
        let mut guard = stream.lock();
        reorder
            .execute(&mut guard, Memory::new(src_desc, &data).unwrap(), &mut dst)
            .unwrap();
        guard.wait();
        for (x, y) in data.iter().zip(dst.data()) {
            assert_eq!(bf16::from_f32(*x), *y);
        }
    }

    #[test]
    fn panel_conversion_interleaves_and_pads() {
        let engine = Engine::new(EngineKind::Cpu, 0).unwrap();
        let stream = Stream::new(&engine);
        let arena = Bump::new();
        let (rows, cols) = (11, 3);
        let data = matrix(rows, cols);
        let src_desc = describe(rows, cols, Precision::F32, Layout::RowMajor).unwrap();
        let dst_desc = describe(rows, cols, Precision::Bf16, Layout::Panel(8)).unwrap();
        let reorder = Reorder::new(&engine, src_desc, dst_desc).unwrap();
        let mut dst = MemoryMut::scratch(dst_desc, &arena).unwrap();
        reorder
            .execute(&mut stream.lock(), Memory::new(src_desc, &data).unwrap(), &mut dst)
            .unwrap();
        let packed = dst.data();
        assert_eq!(packed.len(), 16 * cols);
        for row in 0..16 {
            for k in 0..cols {
                let (p, r) = (row / 8, row % 8);
                let got = packed[p * 8 * cols + k * 8 + r];
                let expected = if row < rows {
                    bf16::from_f32(data[row * cols + k])
                } else {
                    bf16::ZERO
                };
                assert_eq!(got, expected, "row {row}, column {k}");
            }
        }
    }

    #[test]
    fn wide_panels_round_like_scalar_conversion() {
        use rand::Rng;
        let engine = Engine::new(EngineKind::Cpu, 0).unwrap();
        let stream = Stream::new(&engine);
        let arena = Bump::new();
        let mut rng = rand::rng();
        let (rows, cols) = (19, 301);
        let data = (0..rows * cols)
            .map(|_| rng.random_range(-4.0f32..=4.0))
            .collect::<Vec<_>>();
        let src_desc = describe(rows, cols, Precision::F32, Layout::RowMajor).unwrap();
        let dst_desc = describe(rows, cols, Precision::Bf16, Layout::Panel(16)).unwrap();
        let reorder = Reorder::new(&engine, src_desc, dst_desc).unwrap();
        let mut dst = MemoryMut::scratch(dst_desc, &arena).unwrap();
        reorder
            .execute(&mut stream.lock(), Memory::new(src_desc, &data).unwrap(), &mut dst)
            .unwrap();
        let packed = dst.data();
        for row in 0..32 {
            for k in 0..cols {
                let got = packed[(row / 16) * 16 * cols + k * 16 + row % 16];
                let expected = if row < rows {
                    bf16::from_f32(data[row * cols + k])
                } else {
                    bf16::ZERO
                };
                assert_eq!(got.to_bits(), expected.to_bits(), "row {row}, column {k}");
            }
        }
    }

    #[test]
    fn invalid_reorders_are_rejected() {
        let engine = Engine::new(EngineKind::Cpu, 0).unwrap();
        let f32_desc = describe(2, 2, Precision::F32, Layout::RowMajor).unwrap();
        let bf16_desc = describe(2, 2, Precision::Bf16, Layout::RowMajor).unwrap();
        let other = describe(2, 3, Precision::Bf16, Layout::RowMajor).unwrap();
        let any = describe(2, 2, Precision::Bf16, Layout::Any).unwrap();
        assert!(matches!(
            Reorder::new(&engine, f32_desc, other),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matches!(
            Reorder::new(&engine, bf16_desc, f32_desc),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            Reorder::new(&engine, f32_desc, any),
            Err(Error::UndefinedLayout)
        ));
    }
}
