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

use crate::desc::{MemoryDesc, Precision};
use crate::error::{Error, Result};
use bumpalo::Bump;
use simd::bf16;

pub trait Element: Copy + Send + Sync + 'static {
    const PRECISION: Precision;
    const ZERO: Self;
}

impl Element for f32 {
    const PRECISION: Precision = Precision::F32;
    const ZERO: Self = 0.0;
}

impl Element for bf16 {
    const PRECISION: Precision = Precision::Bf16;
    const ZERO: Self = bf16::ZERO;
}

fn check<T: Element>(desc: &MemoryDesc, len: usize) -> Result<()> {
    if desc.precision() != T::PRECISION {
        return Err(Error::PrecisionMismatch {
            expected: desc.precision(),
            actual: T::PRECISION,
        });
    }
    let expected = desc.elements()?;
    if expected != len {
        return Err(Error::BufferSize {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// A read-only buffer bound to a descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Memory<'a, T> {
    desc: MemoryDesc,
    data: &'a [T],
}

impl<'a, T: Element> Memory<'a, T> {
    pub fn new(desc: MemoryDesc, data: &'a [T]) -> Result<Self> {
        check::<T>(&desc, data.len())?;
        Ok(Self { desc, data })
    }

    pub fn desc(&self) -> MemoryDesc {
        self.desc
    }

    pub fn data(&self) -> &'a [T] {
        self.data
    }
}

/// A writable buffer bound to a descriptor, either borrowed from the caller
/// or carved out of a scratch arena.
#[derive(Debug)]
pub struct MemoryMut<'a, T> {
    desc: MemoryDesc,
    data: &'a mut [T],
}

impl<'a, T: Element> MemoryMut<'a, T> {
    pub fn new(desc: MemoryDesc, data: &'a mut [T]) -> Result<Self> {
        check::<T>(&desc, data.len())?;
        Ok(Self { desc, data })
    }

    /// Allocates a zeroed buffer for `desc` that lives as long as `arena`.
    pub fn scratch(desc: MemoryDesc, arena: &'a Bump) -> Result<Self> {
        let len = desc.elements()?;
        Self::new(desc, arena.alloc_slice_fill_copy(len, T::ZERO))
    }

    pub fn desc(&self) -> MemoryDesc {
        self.desc
    }

    pub fn data(&self) -> &[T] {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut *self.data
    }

    pub fn as_memory(&self) -> Memory<'_, T> {
        Memory {
            desc: self.desc,
            data: &*self.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::{Layout, describe};

    #[test]
    fn buffers_must_match_descriptors() {
        let desc = describe(2, 3, Precision::F32, Layout::RowMajor).unwrap();
        assert!(Memory::new(desc, &[0.0f32; 6]).is_ok());
        assert_eq!(
            Memory::new(desc, &[0.0f32; 5]).unwrap_err(),
            Error::BufferSize {
                expected: 6,
                actual: 5
            }
        );
        assert_eq!(
            Memory::new(desc, &[bf16::ZERO; 6]).unwrap_err(),
            Error::PrecisionMismatch {
                expected: Precision::F32,
                actual: Precision::Bf16
            }
        );
        let any = describe(2, 3, Precision::F32, Layout::Any).unwrap();
        assert_eq!(
            Memory::new(any, &[0.0f32; 6]).unwrap_err(),
            Error::UndefinedLayout
        );
    }

    #[test]
    fn scratch_is_zeroed_and_padded() {
        let arena = Bump::new();
        let desc = describe(3, 2, Precision::Bf16, Layout::Panel(8)).unwrap();
        let memory = MemoryMut::<bf16>::scratch(desc, &arena).unwrap();
        assert_eq!(memory.data().len(), 16);
        assert!(memory.data().iter().all(|x| *x == bf16::ZERO));
    }
}
