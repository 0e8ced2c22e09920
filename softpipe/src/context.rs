// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use log::debug;
use softpipe_draw::vcache::FETCH_MAX;
use softpipe_draw::{DrawInfo, PrepareOptions, Topology, VcacheFrontend, VertexElement};
use softpipe_quad::state::{BlendState, DepthStencilAlphaState, RasterizerState, Viewport};
use softpipe_quad::tile_cache::DEFAULT_TILE_ENTRIES;
use softpipe_quad::{
    ColorSurface, DepthStencilSurface, Framebuffer, PipelineState, Setup, SetupVertex,
};

use crate::error::{Error, Result};
use crate::fetch::{VertexBuffer, VertexFetcher, COLOR_ELEMENT, POSITION_ELEMENT};
use crate::middle::RasterMiddleEnd;

/// Options of a [`RenderContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    /// Number of tiles each surface cache holds.
    pub tile_entries: usize,
    /// Maximum number of vertices per batch. Clamped to [`FETCH_MAX`] by the front end.
    pub batch_vertex_limit: usize,
    /// Largest vertex range fetched in one go by the linear-range path.
    pub max_linear_vertices: u32,
    /// Always batch draws through the vertex cache.
    pub pipeline: bool,
    /// Drop primitives with a vertex behind the eye (`w < 0`).
    pub clip: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tile_entries: DEFAULT_TILE_ENTRIES,
            batch_vertex_limit: FETCH_MAX,
            max_linear_vertices: 4096,
            pipeline: false,
            clip: true,
        }
    }
}

/// A software rendering context.
///
/// Holds the bound surfaces, pipeline state and vertex data, and draws with them.
/// Rendering goes through per-surface tile caches: call [`flush`](Self::flush) before
/// reading a surface back.
#[derive(Debug)]
pub struct RenderContext {
    settings: RenderSettings,
    framebuffer: Framebuffer,
    state: PipelineState,
    viewport: Viewport,
    vertex_buffers: Vec<Option<VertexBuffer>>,
    elements: Vec<VertexElement>,
    frontend: VcacheFrontend,
    /// Built lazily from `state`, dropped when it changes.
    setup: Option<Setup>,
    vertices: Vec<Option<SetupVertex>>,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

impl RenderContext {
    /// Create a context with no surfaces bound and default state.
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            framebuffer: Framebuffer::new(settings.tile_entries),
            state: PipelineState::default(),
            viewport: Viewport::from_rect(0.0, 0.0, 1.0, 1.0),
            vertex_buffers: Vec::new(),
            elements: Vec::new(),
            frontend: VcacheFrontend::new(),
            setup: None,
            vertices: Vec::new(),
        }
    }

    /// The settings the context was created with.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Bind color and depth/stencil surfaces and set the viewport to cover them.
    ///
    /// The previously bound surfaces are flushed and returned.
    pub fn set_framebuffer(
        &mut self,
        color: Vec<ColorSurface>,
        depth_stencil: Option<DepthStencilSurface>,
    ) -> (Vec<ColorSurface>, Option<DepthStencilSurface>) {
        let old_color = self.framebuffer.set_color_buffers(color);
        let old_zs = self.framebuffer.set_depth_stencil(depth_stencil);
        let (width, height) = self.framebuffer.size();
        self.viewport = Viewport::from_rect(0.0, 0.0, f32::from(width), f32::from(height));
        self.setup = None;
        (old_color, old_zs)
    }

    /// Set the viewport transform.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Set the depth, stencil and alpha test state.
    pub fn set_depth_stencil_alpha_state(&mut self, state: DepthStencilAlphaState) {
        self.state.depth_stencil_alpha = state;
        self.setup = None;
    }

    /// Set the blend state.
    pub fn set_blend_state(&mut self, state: BlendState) {
        self.state.blend = state;
        self.setup = None;
    }

    /// Set the rasterizer state.
    pub fn set_rasterizer_state(&mut self, state: RasterizerState) {
        self.state.rasterizer = state;
        self.setup = None;
    }

    /// The current pipeline state.
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Bind `buffer` to vertex buffer slot `slot`.
    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: VertexBuffer) {
        let slot = slot as usize;
        if self.vertex_buffers.len() <= slot {
            self.vertex_buffers.resize(slot + 1, None);
        }
        self.vertex_buffers[slot] = Some(buffer);
    }

    /// Set the vertex layout.
    ///
    /// Element 0 is the clip-space position. Element 1, if present, is the vertex color;
    /// vertices are white without it.
    pub fn set_vertex_elements(&mut self, elements: Vec<VertexElement>) {
        self.elements = elements;
    }

    /// Clear all color buffers to `rgba`.
    pub fn clear_color(&mut self, rgba: [f32; 4]) {
        for i in 0..self.framebuffer.num_color_bufs() {
            if let Some(cbuf) = self.framebuffer.color_mut(i) {
                cbuf.clear(rgba);
            }
        }
    }

    /// Clear the depth/stencil buffer, if one is bound.
    pub fn clear_depth_stencil(&mut self, depth: f32, stencil: u8) {
        if let Some(zs) = self.framebuffer.depth_stencil_mut() {
            let desc = *zs.surface().description();
            zs.clear(desc.pack(0, desc.encode_depth(depth), stencil));
        }
    }

    /// Start counting the pixels that pass the depth and stencil tests.
    pub fn begin_occlusion_query(&mut self) {
        self.framebuffer.reset_occlusion();
        if !self.state.occlusion_query {
            self.state.occlusion_query = true;
            self.setup = None;
        }
    }

    /// Stop counting and return the number of pixels that passed since the query began.
    pub fn end_occlusion_query(&mut self) -> u64 {
        if self.state.occlusion_query {
            self.state.occlusion_query = false;
            self.setup = None;
        }
        self.framebuffer.occlusion_count()
    }

    /// Draw with the bound state and vertex data.
    pub fn draw(&mut self, draw: &DrawInfo<'_>) -> Result<()> {
        self.validate_elements()?;
        if draw.count == 0 || draw.instance_count == 0 {
            return Ok(());
        }

        if self.setup.is_none() {
            debug!("building setup for new pipeline state");
        }
        let setup = self
            .setup
            .get_or_insert_with(|| Setup::new(&self.state));
        setup.begin(&self.framebuffer);

        let options = PrepareOptions {
            pipeline: self.settings.pipeline,
            clip: self.settings.clip,
            flatshade_first: self.state.rasterizer.flatshade_first,
        };
        for instance in 0..draw.instance_count {
            let mut middle = RasterMiddleEnd {
                fetcher: VertexFetcher {
                    buffers: &self.vertex_buffers,
                    elements: &self.elements,
                    instance,
                    start_instance: draw.start_instance,
                },
                viewport: self.viewport,
                setup: &mut *setup,
                fb: &mut self.framebuffer,
                vertices: &mut self.vertices,
                batch_vertex_limit: self.settings.batch_vertex_limit,
                max_linear_vertices: self.settings.max_linear_vertices,
                topology: Topology::Points,
                flatshade_first: options.flatshade_first,
                clip: options.clip,
            };
            self.frontend
                .prepare(draw.topology, options, &self.elements, &mut middle);
            let result = self.frontend.run(draw, &mut middle);
            // Whatever was batched before a failure is still drawn.
            self.frontend.finish(&mut middle);
            result?;
        }
        Ok(())
    }

    /// Write all cached tiles back to the bound surfaces.
    pub fn flush(&mut self) {
        self.framebuffer.flush();
    }

    /// Color surface `i`, as of the last [`flush`](Self::flush).
    pub fn color_surface(&self, i: usize) -> Option<&ColorSurface> {
        self.framebuffer.color(i).map(|cache| cache.surface())
    }

    /// The depth/stencil surface, as of the last [`flush`](Self::flush).
    pub fn depth_stencil_surface(&self) -> Option<&DepthStencilSurface> {
        self.framebuffer.depth_stencil().map(|cache| cache.surface())
    }

    /// The bound framebuffer.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    fn validate_elements(&self) -> Result<()> {
        if self.elements.is_empty() {
            return Err(Error::InvalidVertexElement {
                element: POSITION_ELEMENT,
                reason: "no position element",
            });
        }
        for (i, element) in self.elements.iter().enumerate() {
            let bound = self
                .vertex_buffers
                .get(element.buffer_index as usize)
                .is_some_and(Option::is_some);
            if !bound {
                return Err(Error::MissingVertexBuffer {
                    element: i,
                    buffer: element.buffer_index,
                });
            }
        }
        if self.elements[POSITION_ELEMENT].format.components() < 2 {
            return Err(Error::InvalidVertexElement {
                element: POSITION_ELEMENT,
                reason: "positions need at least two components",
            });
        }
        if let Some(color) = self.elements.get(COLOR_ELEMENT) {
            if color.format.components() < 3 {
                return Err(Error::InvalidVertexElement {
                    element: COLOR_ELEMENT,
                    reason: "colors need at least three components",
                });
            }
        }
        Ok(())
    }
}
