// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use clap::Parser;
use softpipe::softpipe_draw::{DrawInfo, IndexBuffer, Topology, VertexElement, VertexFormat};
use softpipe::softpipe_quad::state::{
    BlendState, CompareFunc, DepthState, DepthStencilAlphaState, PolyStipple, RasterizerState,
    RenderTargetBlend, StencilOp, StencilState,
};
use softpipe::softpipe_quad::{ColorSurface, DepthStencilFormat, DepthStencilSurface};
use softpipe::{RenderContext, RenderSettings, VertexBuffer};

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 4],
}

const fn vertex(x: f32, y: f32, z: f32, color: [f32; 4]) -> Vertex {
    Vertex {
        position: [x, y, z],
        color,
    }
}

const RED: [f32; 4] = [0.9, 0.2, 0.2, 1.0];
const GREEN: [f32; 4] = [0.2, 0.8, 0.3, 1.0];
const BLUE: [f32; 4] = [0.2, 0.3, 0.9, 1.0];
const WHITE: [f32; 4] = [1.0; 4];
const TRANSLUCENT: [f32; 4] = [1.0, 0.9, 0.2, 0.5];

/// The stencil mask: a square in the middle of the image.
const MASK: [Vertex; 4] = [
    vertex(-0.7, -0.7, 0.0, WHITE),
    vertex(0.7, -0.7, 0.0, WHITE),
    vertex(0.7, 0.7, 0.0, WHITE),
    vertex(-0.7, 0.7, 0.0, WHITE),
];

/// Two interpenetrating triangles, then a translucent one.
const TRIANGLES: [Vertex; 9] = [
    vertex(-0.9, -0.8, -0.5, RED),
    vertex(0.9, -0.6, 0.5, GREEN),
    vertex(0.0, 0.9, 0.0, BLUE),
    vertex(-0.9, 0.6, 0.5, BLUE),
    vertex(0.9, 0.8, -0.5, GREEN),
    vertex(0.0, -0.9, 0.0, RED),
    vertex(-0.5, -0.5, -0.9, TRANSLUCENT),
    vertex(0.5, -0.5, -0.9, TRANSLUCENT),
    vertex(0.0, 0.5, -0.9, TRANSLUCENT),
];

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut ctx = RenderContext::new(RenderSettings {
        pipeline: args.pipeline,
        ..Default::default()
    });
    ctx.set_framebuffer(
        vec![ColorSurface::new(args.width, args.height)],
        Some(DepthStencilSurface::new(
            DepthStencilFormat::Z24UnormS8Uint,
            args.width,
            args.height,
        )),
    );
    ctx.clear_color([0.1, 0.1, 0.12, 1.0]);
    ctx.clear_depth_stencil(1.0, 0);

    let color_offset = u32::try_from(size_of::<[f32; 3]>())?;
    let elements = vec![
        VertexElement::new(0, 0, VertexFormat::Float32x3),
        VertexElement::new(0, color_offset, VertexFormat::Float32x4),
    ];

    // Mark the mask in the stencil buffer without touching color.
    let mut no_color = BlendState::default();
    no_color.rt[0].color_mask = 0;
    ctx.set_blend_state(no_color);
    ctx.set_depth_stencil_alpha_state(DepthStencilAlphaState {
        stencil: [
            StencilState {
                enabled: true,
                zpass_op: StencilOp::Replace,
                reference: 1,
                ..Default::default()
            },
            StencilState::default(),
        ],
        ..Default::default()
    });
    ctx.set_vertex_buffer(0, VertexBuffer::from_pod(&MASK));
    ctx.set_vertex_elements(elements);
    ctx.draw(&DrawInfo::arrays(Topology::TriangleFan, 0, 4))
        .context("drawing the stencil mask")?;

    // Depth-tested triangles, clipped to the mask.
    ctx.set_blend_state(BlendState::default());
    ctx.set_depth_stencil_alpha_state(DepthStencilAlphaState {
        depth: DepthState {
            enabled: true,
            write_enabled: true,
            func: CompareFunc::Less,
        },
        stencil: [
            StencilState {
                enabled: true,
                func: CompareFunc::Equal,
                reference: 1,
                ..Default::default()
            },
            StencilState::default(),
        ],
        ..Default::default()
    });
    if args.stipple {
        ctx.set_rasterizer_state(RasterizerState {
            poly_stipple_enable: true,
            poly_stipple: PolyStipple::checkerboard(4),
            ..Default::default()
        });
    }
    ctx.set_vertex_buffer(0, VertexBuffer::from_pod(&TRIANGLES));
    let indices: [u16; 6] = [0, 1, 2, 3, 4, 5];
    ctx.begin_occlusion_query();
    ctx.draw(&DrawInfo::indexed(
        Topology::Triangles,
        IndexBuffer::U16(&indices),
    ))
    .context("drawing the opaque triangles")?;
    let visible = ctx.end_occlusion_query();
    log::info!("{visible} pixels passed the depth and stencil tests");

    let mut blend = BlendState::default();
    blend.rt[0] = RenderTargetBlend::alpha_blending();
    ctx.set_blend_state(blend);
    ctx.draw(&DrawInfo::arrays(Topology::Triangles, 6, 3))
        .context("drawing the translucent triangle")?;

    // Outline the mask.
    ctx.set_blend_state(BlendState::default());
    ctx.set_depth_stencil_alpha_state(DepthStencilAlphaState::default());
    ctx.set_rasterizer_state(RasterizerState::default());
    ctx.set_vertex_buffer(0, VertexBuffer::from_pod(&MASK));
    ctx.draw(&DrawInfo::arrays(Topology::LineLoop, 0, 4))
        .context("drawing the outline")?;

    ctx.flush();
    let surface = ctx
        .color_surface(0)
        .context("color buffer is not bound")?;
    let image = image::RgbaImage::from_raw(
        u32::from(args.width),
        u32::from(args.height),
        surface.data_as_u8_slice().to_vec(),
    )
    .context("color buffer does not match the image size")?;

    let out_path = args.out_directory.join("softpipe").with_extension("png");
    std::fs::create_dir_all(&args.out_directory)?;
    image
        .save(&out_path)
        .with_context(|| format!("writing {}", out_path.display()))?;
    println!("Wrote result ({}x{}) to {out_path:?}", args.width, args.height);
    Ok(())
}

#[derive(Parser, Debug)]
#[command(about, long_about = None, bin_name="cargo run -p headless --")]
struct Args {
    /// Width of the image
    #[arg(long, short = 'x', default_value_t = 256)]
    width: u16,
    /// Height of the image
    #[arg(long, short = 'y', default_value_t = 256)]
    height: u16,
    /// Stipple the depth-tested triangles with a checkerboard
    #[arg(long)]
    stipple: bool,
    /// Batch every draw through the vertex cache
    #[arg(long)]
    pipeline: bool,
    /// Directory to store the result into
    #[arg(long, default_value_os_t = default_directory())]
    out_directory: PathBuf,
}

fn default_directory() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("outputs")
}
