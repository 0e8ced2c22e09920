// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use softpipe_draw::DrawError;
use thiserror::Error;

/// Errors that can occur while drawing with a [`RenderContext`](crate::RenderContext).
#[derive(Debug, Error)]
pub enum Error {
    /// The front end failed to assemble the draw.
    #[error(transparent)]
    Draw(#[from] DrawError),
    /// A vertex element reads from a vertex buffer slot that has nothing bound.
    #[error("vertex element {element} reads from unbound vertex buffer {buffer}")]
    MissingVertexBuffer {
        /// Index of the vertex element.
        element: usize,
        /// The vertex buffer slot.
        buffer: u32,
    },
    /// A vertex element cannot be used for its attribute.
    #[error("invalid vertex element {element}: {reason}")]
    InvalidVertexElement {
        /// Index of the vertex element.
        element: usize,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// A specialized result type for drawing.
pub type Result<T> = core::result::Result<T, Error>;
