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

//! A small CPU compute backend for reduced-precision inner products.
//!
//! The pieces mirror a typical primitive library: an [`Engine`] stands for
//! the device, a [`Stream`] orders work on it, [`MemoryDesc`]s describe
//! matrices, [`Memory`] binds buffers to them, and primitives
//! ([`Reorder`], [`InnerProductPlan`]) are created once for concrete
//! descriptors and then executed on a stream.

mod desc;
mod engine;
mod error;
mod inner_product;
mod memory;
mod reorder;
mod stream;

pub use desc::{Layout, MemoryDesc, Precision, describe};
pub use engine::{Engine, EngineId, EngineKind};
pub use error::{Error, Result};
pub use inner_product::{ExecArgs, InnerProductPlan, Kernel, PropKind};
pub use memory::{Element, Memory, MemoryMut};
pub use reorder::Reorder;
pub use stream::{Stream, StreamGuard};
