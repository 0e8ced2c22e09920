// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vertex element descriptions.

/// The format of one vertex attribute in its vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    /// One 32-bit float.
    Float32,
    /// Two 32-bit floats.
    Float32x2,
    /// Three 32-bit floats.
    Float32x3,
    /// Four 32-bit floats.
    Float32x4,
    /// Four normalized unsigned bytes.
    Unorm8x4,
}

impl VertexFormat {
    /// Size of one attribute in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
            Self::Unorm8x4 => 4,
        }
    }

    /// Number of components of the attribute.
    pub const fn components(self) -> usize {
        match self {
            Self::Float32 => 1,
            Self::Float32x2 => 2,
            Self::Float32x3 => 3,
            Self::Float32x4 | Self::Unorm8x4 => 4,
        }
    }
}

/// Where and how one vertex attribute is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexElement {
    /// The vertex buffer slot the attribute is read from.
    pub buffer_index: u32,
    /// Byte offset of the attribute within one vertex.
    pub src_offset: u32,
    /// The attribute format.
    pub format: VertexFormat,
    /// Advance the attribute once every `instance_divisor` instances instead of once per
    /// vertex. Zero means per-vertex.
    pub instance_divisor: u32,
}

impl VertexElement {
    /// A per-vertex attribute.
    pub const fn new(buffer_index: u32, src_offset: u32, format: VertexFormat) -> Self {
        Self {
            buffer_index,
            src_offset,
            format,
            instance_divisor: 0,
        }
    }

    /// Make the attribute advance every `divisor` instances.
    pub const fn with_instance_divisor(mut self, divisor: u32) -> Self {
        self.instance_divisor = divisor;
        self
    }
}
