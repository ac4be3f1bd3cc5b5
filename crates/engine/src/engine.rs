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

use crate::error::{Error, Result};
use std::num::NonZero;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Cpu,
}

/// Identifies the engine a stream or primitive belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(u64);

/// Handle to the local CPU as a compute device.
#[derive(Debug)]
pub struct Engine {
    id: EngineId,
    kind: EngineKind,
    cpu_level: Option<&'static str>,
    threads: NonZero<usize>,
    pool: Option<Arc<rayon::ThreadPool>>,
    scratch_limit: usize,
}

impl Engine {
    pub const DEFAULT_SCRATCH_LIMIT: usize = 1 << 30;

    pub fn new(kind: EngineKind, index: usize) -> Result<Self> {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        match (kind, index) {
            (EngineKind::Cpu, 0) => Ok(Self {
                id: EngineId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
                kind,
                cpu_level: simd::cpu_level(),
                threads: NonZero::<usize>::MIN,
                pool: None,
                scratch_limit: Self::DEFAULT_SCRATCH_LIMIT,
            }),
            _ => Err(Error::NoDevice { kind, index }),
        }
    }

    /// Number of threads a single primitive execution may use. More than one
    /// thread starts a pool owned by the engine and reused by every execution.
    pub fn with_threads(mut self, threads: NonZero<usize>) -> Result<Self> {
        let id = self.id.0;
        self.pool = if threads.get() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads.get())
                .thread_name(move |i| format!("engine-{id}-{i}"))
                .build()
                .map_err(|e| Error::ThreadPool(e.to_string()))?;
            Some(Arc::new(pool))
        } else {
            None
        };
        self.threads = threads;
        Ok(self)
    }

    /// Upper bound of scratch memory a plan may ask for, in bytes.
    pub fn with_scratch_limit(mut self, bytes: usize) -> Self {
        self.scratch_limit = bytes;
        self
    }

    pub fn id(&self) -> EngineId {
        self.id
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn cpu_level(&self) -> Option<&'static str> {
        self.cpu_level
    }

    pub fn threads(&self) -> NonZero<usize> {
        self.threads
    }

    pub(crate) fn pool(&self) -> Option<&Arc<rayon::ThreadPool>> {
        self.pool.as_ref()
    }

    pub fn scratch_limit(&self) -> usize {
        self.scratch_limit
    }

    /// Width of weight panels preferred on this CPU.
    pub fn panel_width(&self) -> usize {
        match self.cpu_level {
            Some("v4") => 16,
            _ => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_first_cpu_exists() {
        let engine = Engine::new(EngineKind::Cpu, 0).unwrap();
        assert_eq!(engine.kind(), EngineKind::Cpu);
        assert!(matches!(engine.panel_width(), 8 | 16));
        assert_eq!(
            Engine::new(EngineKind::Cpu, 1).unwrap_err(),
            Error::NoDevice {
                kind: EngineKind::Cpu,
                index: 1
            }
        );
    }

    #[test]
    fn threads_share_one_pool() {
        let engine = Engine::new(EngineKind::Cpu, 0).unwrap();
        assert!(engine.pool().is_none());
        let engine = engine.with_threads(NonZero::new(4).unwrap()).unwrap();
        assert_eq!(engine.threads().get(), 4);
        assert_eq!(engine.pool().unwrap().current_num_threads(), 4);
        let engine = engine.with_threads(NonZero::<usize>::MIN).unwrap();
        assert!(engine.pool().is_none());
    }

    #[test]
    fn engines_are_distinct() {
        let a = Engine::new(EngineKind::Cpu, 0).unwrap();
        let b = Engine::new(EngineKind::Cpu, 0).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
