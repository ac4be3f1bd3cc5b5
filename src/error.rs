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

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The accelerated path is switched off, so no engine exists.
    #[error("accelerated inner product is not initialized, set {}=1 to enable it", crate::gate::ENABLE_VARIABLE)]
    NotInitialized,

    /// `DNNL_OPTIONS` could not be parsed or validated.
    #[error("invalid options: {0}")]
    Options(String),

    #[error(transparent)]
    Engine(#[from] engine::Error),
}
