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

use crate::desc::Precision;
use crate::engine::EngineKind;
use thiserror::Error;

/// Errors raised while describing, planning or executing primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A matrix with no rows or no columns.
    #[error("matrix of {rows}x{cols} is empty")]
    EmptyShape { rows: usize, cols: usize },

    /// Operand shapes that cannot be combined.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A buffer whose length does not match its descriptor.
    #[error("buffer holds {actual} elements, descriptor requires {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// A buffer whose element type does not match its descriptor.
    #[error("buffer holds {actual:?} elements, descriptor requires {expected:?}")]
    PrecisionMismatch {
        expected: Precision,
        actual: Precision,
    },

    /// A descriptor with an unconstrained layout was used where memory is
    /// needed.
    #[error("layout is not determined")]
    UndefinedLayout,

    /// No implementation exists for the requested configuration.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// The requested device does not exist.
    #[error("no {kind:?} device with index {index}")]
    NoDevice { kind: EngineKind, index: usize },

    /// The worker threads of an engine could not be started.
    #[error("failed to start worker threads: {0}")]
    ThreadPool(String),

    /// A primitive was submitted to a stream of another engine.
    #[error("primitive was created for another engine")]
    EngineMismatch,
}

pub type Result<T> = std::result::Result<T, Error>;
