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

use crate::engine::{Engine, EngineId};
use crate::error::{Error, Result};
use parking_lot::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Counters {
    submitted: u64,
    completed: u64,
}

/// In-order queue of primitives bound to one engine.
///
/// Operations run to completion when they are submitted, so submission order
/// is execution order. A caller submits through a [`StreamGuard`], which
/// keeps operations of concurrent callers from interleaving, and observes
/// completion with [`StreamGuard::wait`].
#[derive(Debug)]
pub struct Stream {
    engine: EngineId,
    counters: Mutex<Counters>,
}

impl Stream {
    pub fn new(engine: &Engine) -> Self {
        Self {
            engine: engine.id(),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn engine(&self) -> EngineId {
        self.engine
    }

    /// Takes exclusive use of the stream until the guard is dropped.
    pub fn lock(&self) -> StreamGuard<'_> {
        StreamGuard {
            engine: self.engine,
            counters: self.counters.lock(),
        }
    }

    pub fn submitted(&self) -> u64 {
        self.counters.lock().submitted
    }

    pub fn completed(&self) -> u64 {
        self.counters.lock().completed
    }
}

pub struct StreamGuard<'s> {
    engine: EngineId,
    counters: MutexGuard<'s, Counters>,
}

impl StreamGuard<'_> {
    pub(crate) fn submit(
        &mut self,
        engine: EngineId,
        op: impl FnOnce() -> Result<()>,
    ) -> Result<()> {
        if engine != self.engine {
            return Err(Error::EngineMismatch);
        }
        self.counters.submitted += 1;
        let result = op();
        self.counters.completed += 1;
        result
    }

    /// Blocks until every operation submitted so far has completed.
    pub fn wait(&mut self) {
        let Counters {
            submitted,
            completed,
        } = *self.counters;
        assert_eq!(submitted, completed, "stream is left with pending operations");
    }
}
