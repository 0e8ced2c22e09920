// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vertex buffers and attribute fetch.

use bytemuck::pod_read_unaligned;
use softpipe_draw::{VertexElement, VertexFormat};

/// Element 0 holds the clip-space position.
pub const POSITION_ELEMENT: usize = 0;
/// Element 1, if present, holds the vertex color.
pub const COLOR_ELEMENT: usize = 1;

/// A vertex buffer: raw bytes and the distance between consecutive vertices.
#[derive(Debug, Clone, Default)]
pub struct VertexBuffer {
    /// The vertex data.
    pub data: Vec<u8>,
    /// Bytes from one vertex to the next.
    pub stride: u32,
}

impl VertexBuffer {
    /// A tightly packed buffer of `vertices`.
    pub fn from_pod<T: bytemuck::NoUninit>(vertices: &[T]) -> Self {
        Self {
            data: bytemuck::cast_slice(vertices).to_vec(),
            stride: u32::try_from(size_of::<T>()).unwrap_or(u32::MAX),
        }
    }
}

/// Reads attributes for one instance of a draw.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VertexFetcher<'a> {
    pub(crate) buffers: &'a [Option<VertexBuffer>],
    pub(crate) elements: &'a [VertexElement],
    pub(crate) instance: u32,
    pub(crate) start_instance: u32,
}

impl VertexFetcher<'_> {
    /// The attribute of `element` for vertex `vertex`, padded with `(0, 0, 0, 1)`.
    ///
    /// Reads outside of the vertex buffer return the padding.
    pub(crate) fn attribute(&self, element: usize, vertex: u32) -> [f32; 4] {
        let mut out = [0.0, 0.0, 0.0, 1.0];
        let Some(element) = self.elements.get(element) else {
            return out;
        };
        let Some(Some(buffer)) = self.buffers.get(element.buffer_index as usize) else {
            return out;
        };

        let index = if element.instance_divisor != 0 {
            self.start_instance
                .wrapping_add(self.instance / element.instance_divisor)
        } else {
            vertex
        };
        let offset = u64::from(index) * u64::from(buffer.stride) + u64::from(element.src_offset);
        let Some(bytes) = usize::try_from(offset)
            .ok()
            .and_then(|start| buffer.data.get(start..start.checked_add(element.format.size())?))
        else {
            return out;
        };

        match element.format {
            VertexFormat::Unorm8x4 => {
                for (o, b) in out.iter_mut().zip(bytes) {
                    *o = f32::from(*b) / 255.0;
                }
            }
            format => {
                for (o, chunk) in out
                    .iter_mut()
                    .zip(bytes.chunks_exact(4))
                    .take(format.components())
                {
                    *o = pod_read_unaligned::<f32>(chunk);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_padded_and_bounds_checked() {
        let buffers = [Some(VertexBuffer::from_pod(&[[1.0_f32, 2.0], [3.0, 4.0]]))];
        let elements = [VertexElement::new(0, 0, VertexFormat::Float32x2)];
        let fetcher = VertexFetcher {
            buffers: &buffers,
            elements: &elements,
            instance: 0,
            start_instance: 0,
        };
        assert_eq!(fetcher.attribute(0, 1), [3.0, 4.0, 0.0, 1.0]);
        assert_eq!(fetcher.attribute(0, 2), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(fetcher.attribute(1, 0), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn unaligned_reads() {
        let mut data = vec![0xff_u8];
        data.extend_from_slice(bytemuck::bytes_of(&[0.5_f32, 0.25, 1.0]));
        let buffers = [Some(VertexBuffer { data, stride: 13 })];
        let elements = [VertexElement::new(0, 1, VertexFormat::Float32x3)];
        let fetcher = VertexFetcher {
            buffers: &buffers,
            elements: &elements,
            instance: 0,
            start_instance: 0,
        };
        assert_eq!(fetcher.attribute(0, 0), [0.5, 0.25, 1.0, 1.0]);
    }

    #[test]
    fn instance_divisor_selects_per_instance_data() {
        let colors: [[u8; 4]; 3] = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];
        let buffers = [Some(VertexBuffer::from_pod(&colors))];
        let elements = [VertexElement::new(0, 0, VertexFormat::Unorm8x4).with_instance_divisor(2)];
        let mut fetcher = VertexFetcher {
            buffers: &buffers,
            elements: &elements,
            instance: 3,
            start_instance: 1,
        };
        // Instance 3 with a divisor of 2 reads element 1 + 3 / 2 = 2, for every vertex.
        assert_eq!(fetcher.attribute(0, 0), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(fetcher.attribute(0, 7), [0.0, 0.0, 1.0, 1.0]);
        fetcher.instance = 0;
        assert_eq!(fetcher.attribute(0, 0), [0.0, 1.0, 0.0, 1.0]);
    }
}
