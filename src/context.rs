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

use bumpalo::Bump;
use std::cell::RefCell;

/// Arena capacity a thread keeps between calls. A call that needed more
/// gives the memory back when it returns.
pub(crate) const RETAINED_BYTES: usize = 64 << 10;

/// Transient state of calls made from one thread.
///
/// Reduced-precision operands are allocated from the arena. They live only
/// for the call that allocated them.
pub struct ExecutionContext {
    arena: Bump,
}

thread_local! {
    static CONTEXT: RefCell<ExecutionContext> = RefCell::new(ExecutionContext::new());
}

impl ExecutionContext {
    fn new() -> Self {
        Self { arena: Bump::new() }
    }

    /// Runs one call with the scratch arena of the current thread and
    /// releases everything `f` allocated before returning.
    ///
    /// # Panics
    ///
    /// Panics if called again from inside `f`.
    pub fn scope<R>(f: impl FnOnce(&Bump) -> R) -> R {
        CONTEXT.with_borrow_mut(|context| {
            let result = f(&context.arena);
            context.release();
            result
        })
    }

    fn release(&mut self) {
        self.arena.reset();
        if self.arena.allocated_bytes() > RETAINED_BYTES {
            self.arena = Bump::new();
        }
    }

    /// Bytes the arena of the current thread holds between calls.
    pub fn retained_bytes() -> usize {
        CONTEXT.with_borrow(|context| context.arena.allocated_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_arenas_are_kept() {
        ExecutionContext::scope(|arena| {
            arena.alloc_slice_fill_copy(1 << 10, 0u8);
        });
        let kept = ExecutionContext::retained_bytes();
        assert!(kept > 0 && kept <= RETAINED_BYTES, "{kept}");
        for _ in 0..4 {
            ExecutionContext::scope(|arena| {
                arena.alloc_slice_fill_copy(1 << 10, 0u8);
            });
            assert_eq!(ExecutionContext::retained_bytes(), kept);
        }
    }

    #[test]
    fn large_arenas_are_released() {
        let held = ExecutionContext::scope(|arena| {
            arena.alloc_slice_fill_copy(4 << 20, 0u8);
            arena.allocated_bytes()
        });
        assert!(held >= 4 << 20);
        assert!(ExecutionContext::retained_bytes() <= RETAINED_BYTES);
    }

    #[test]
    fn contexts_are_per_thread() {
        ExecutionContext::scope(|arena| {
            arena.alloc_slice_fill_copy(1 << 10, 0u8);
        });
        assert!(ExecutionContext::retained_bytes() > 0);
        let other = std::thread::spawn(ExecutionContext::retained_bytes)
            .join()
            .unwrap();
        assert_eq!(other, 0);
    }
}
