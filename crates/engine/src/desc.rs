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

/// Element type of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    F32,
    Bf16,
}

impl Precision {
    pub fn size(self) -> usize {
        match self {
            Precision::F32 => 4,
            Precision::Bf16 => 2,
        }
    }
}

/// How the elements of a matrix are placed in its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Left for a plan to decide.
    Any,
    /// Element `(i, j)` at `i * cols + j`.
    RowMajor,
    /// Rows grouped into panels of the given width, each panel stored
    /// column-interleaved. The last panel is padded with zeros.
    Panel(usize),
}

/// Describes how a buffer maps to a 2D matrix. It never owns the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryDesc {
    rows: usize,
    cols: usize,
    precision: Precision,
    layout: Layout,
}

pub fn describe(
    rows: usize,
    cols: usize,
    precision: Precision,
    layout: Layout,
) -> Result<MemoryDesc> {
    if rows == 0 || cols == 0 {
        return Err(Error::EmptyShape { rows, cols });
    }
    if layout == Layout::Panel(0) {
        return Err(Error::Unsupported("panels of width 0".to_string()));
    }
    Ok(MemoryDesc {
        rows,
        cols,
        precision,
        layout,
    })
}

impl MemoryDesc {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub(crate) fn with_layout(self, layout: Layout) -> Self {
        Self { layout, ..self }
    }

    /// Number of elements the buffer holds, padding included.
    pub fn elements(&self) -> Result<usize> {
        let rows = match self.layout {
            Layout::Any => return Err(Error::UndefinedLayout),
            Layout::RowMajor => self.rows,
            Layout::Panel(width) => self.rows.div_ceil(width) * width,
        };
        rows.checked_mul(self.cols).ok_or_else(|| self.too_large())
    }

    pub fn bytes(&self) -> Result<usize> {
        self.elements()?
            .checked_mul(self.precision.size())
            .ok_or_else(|| self.too_large())
    }

    fn too_large(&self) -> Error {
        Error::Unsupported(format!("{}x{} matrix is too large", self.rows, self.cols))
    }
}
