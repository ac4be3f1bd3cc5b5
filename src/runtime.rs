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
use crate::gate::FeatureGate;
use crate::options::AccelOptions;
use engine::{Engine, EngineKind, Stream};
use std::num::NonZero;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The engine and the stream every call of a [`Runtime`] shares.
#[derive(Debug)]
pub struct Accelerator {
    engine: Engine,
    stream: Stream,
    options: AccelOptions,
}

impl Accelerator {
    pub fn new(options: AccelOptions) -> Result<Self, Error> {
        let threads = NonZero::new(options.threads as usize)
            .ok_or_else(|| Error::Options("threads must be positive".to_string()))?;
        let scratch_limit = usize::try_from(options.max_scratch_bytes).unwrap_or(usize::MAX);
        let engine = Engine::new(EngineKind::Cpu, 0)?
            .with_threads(threads)?
            .with_scratch_limit(scratch_limit);
        let stream = Stream::new(&engine);
        tracing::info!(
            cpu_level = engine.cpu_level().unwrap_or("fallback"),
            threads = threads.get(),
            fallback = ?options.fallback,
            "initialized inner product engine"
        );
        Ok(Self {
            engine,
            stream,
            options,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    pub fn options(&self) -> &AccelOptions {
        &self.options
    }
}

/// Owner of the process-wide accelerator.
///
/// The accelerator is built at most once. Concurrent first callers block
/// until it exists, and a failed construction is remembered and reported to
/// every later caller.
pub struct Runtime {
    gate: FeatureGate,
    options: fn() -> Result<AccelOptions, Error>,
    accelerator: OnceLock<Result<Accelerator, Error>>,
    constructions: AtomicUsize,
}

impl Runtime {
    pub const fn new(gate: FeatureGate, options: fn() -> Result<AccelOptions, Error>) -> Self {
        Self {
            gate,
            options,
            accelerator: OnceLock::new(),
            constructions: AtomicUsize::new(0),
        }
    }

    pub fn gate(&self) -> &FeatureGate {
        &self.gate
    }

    /// Builds the accelerator unless it already exists, regardless of the
    /// gate.
    pub fn ensure_engine_initialized(&self) -> Result<&Accelerator, Error> {
        self.accelerator
            .get_or_init(|| {
                self.constructions.fetch_add(1, Ordering::Relaxed);
                (self.options)().and_then(Accelerator::new)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The accelerator for a call, built on first use when the gate is
    /// enabled.
    pub fn accelerator(&self) -> Result<&Accelerator, Error> {
        if let Some(accelerator) = self.accelerator.get() {
            return accelerator.as_ref().map_err(Clone::clone);
        }
        if !self.gate.is_enabled() {
            return Err(Error::NotInitialized);
        }
        self.ensure_engine_initialized()
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.accelerator.get(), Some(Ok(_)))
    }

    /// How many times construction of the accelerator has been attempted.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::Relaxed)
    }

    /// Initialization at library load. A failure here is fatal.
    pub fn on_load(&self) {
        if !self.gate.is_enabled() {
            return;
        }
        if let Err(e) = self.ensure_engine_initialized() {
            tracing::error!("failed to initialize inner product engine: {e}");
            std::process::abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn enabled() -> Option<OsString> {
        Some("1".into())
    }

    fn disabled() -> Option<OsString> {
        None
    }

    #[test]
    fn disabled_gate_never_initializes() {
        let runtime = Runtime::new(FeatureGate::new(disabled), || Ok(AccelOptions::default()));
        assert_eq!(runtime.accelerator().err(), Some(Error::NotInitialized));
        runtime.on_load();
        assert!(!runtime.is_initialized());
        assert_eq!(runtime.constructions(), 0);
    }

    #[test]
    fn initialization_is_idempotent() {
        let runtime = Runtime::new(FeatureGate::new(enabled), || Ok(AccelOptions::default()));
        runtime.on_load();
        let first = runtime.accelerator().unwrap().engine().id();
        for _ in 0..4 {
            runtime.ensure_engine_initialized().unwrap();
            assert_eq!(runtime.accelerator().unwrap().engine().id(), first);
        }
        assert!(runtime.is_initialized());
        assert_eq!(runtime.constructions(), 1);
    }

    #[test]
    fn options_reach_the_engine() {
        let runtime = Runtime::new(FeatureGate::new(enabled), || {
            AccelOptions::parse("threads = 3\nmax_scratch_bytes = 4096")
        });
        let accelerator = runtime.accelerator().unwrap();
        assert_eq!(accelerator.engine().threads().get(), 3);
        assert_eq!(accelerator.engine().scratch_limit(), 4096);
        assert_eq!(accelerator.stream().engine(), accelerator.engine().id());
    }

    #[test]
    fn failure_is_cached() {
        let runtime = Runtime::new(FeatureGate::new(enabled), || AccelOptions::parse("threads = 0"));
        let first = runtime.accelerator().unwrap_err();
        assert!(matches!(first, Error::Options(_)));
        assert_eq!(runtime.accelerator().unwrap_err(), first);
        assert_eq!(runtime.constructions(), 1);
        assert!(!runtime.is_initialized());
    }
}
