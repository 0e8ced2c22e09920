// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end draws through a render context.

use softpipe::{Error, RenderContext, RenderSettings, VertexBuffer};
use softpipe_draw::{DrawError, DrawInfo, IndexBuffer, Topology, VertexElement, VertexFormat};
use softpipe_quad::state::{
    BlendFactor, BlendState, CompareFunc, DepthState, DepthStencilAlphaState, RenderTargetBlend,
};
use softpipe_quad::{ColorSurface, DepthStencilFormat, DepthStencilSurface};

const SIZE: u16 = 16;
const FULL_SCREEN: [[f32; 2]; 3] = [[-1.0, -1.0], [3.0, -1.0], [-1.0, 3.0]];

/// Normalized device coordinates of the window position `(x, y)`.
fn ndc(x: f32, y: f32) -> [f32; 2] {
    let half = f32::from(SIZE) / 2.0;
    [x / half - 1.0, 1.0 - y / half]
}

fn context(settings: RenderSettings) -> RenderContext {
    let mut ctx = RenderContext::new(settings);
    ctx.set_framebuffer(vec![ColorSurface::new(SIZE, SIZE)], None);
    ctx
}

fn set_positions(ctx: &mut RenderContext, positions: &[[f32; 2]]) {
    ctx.set_vertex_buffer(0, VertexBuffer::from_pod(positions));
    ctx.set_vertex_elements(vec![VertexElement::new(0, 0, VertexFormat::Float32x2)]);
}

fn image(ctx: &mut RenderContext) -> Vec<u8> {
    ctx.flush();
    ctx.color_surface(0).unwrap().data_as_u8_slice().to_vec()
}

fn covered(image: &[u8]) -> usize {
    image.chunks_exact(4).filter(|px| *px != [0; 4]).count()
}

#[test]
fn full_screen_triangle_fills_every_pixel() {
    let mut ctx = context(RenderSettings::default());
    set_positions(&mut ctx, &FULL_SCREEN);
    ctx.begin_occlusion_query();
    ctx.draw(&DrawInfo::arrays(Topology::Triangles, 0, 3)).unwrap();
    assert_eq!(ctx.end_occlusion_query(), 256);
    assert_eq!(covered(&image(&mut ctx)), 256);
}

#[test]
fn strip_matches_indexed_triangles() {
    let positions = [ndc(0.0, 0.0), ndc(0.0, 16.0), ndc(16.0, 0.0), ndc(16.0, 16.0)];

    let mut strip = context(RenderSettings::default());
    set_positions(&mut strip, &positions);
    strip
        .draw(&DrawInfo::arrays(Topology::TriangleStrip, 0, 4))
        .unwrap();

    let mut indexed = context(RenderSettings::default());
    set_positions(&mut indexed, &positions);
    let indices: [u16; 6] = [0, 1, 2, 2, 1, 3];
    indexed
        .draw(&DrawInfo::indexed(
            Topology::Triangles,
            IndexBuffer::U16(&indices),
        ))
        .unwrap();

    let strip = image(&mut strip);
    assert_eq!(covered(&strip), 256);
    assert_eq!(strip, image(&mut indexed));
}

#[test]
fn offset_ranges_draw_the_same_vertices() {
    let mut positions = vec![ndc(0.0, 0.0); 3];
    positions.extend(FULL_SCREEN);

    let mut arrays = context(RenderSettings::default());
    set_positions(&mut arrays, &positions);
    arrays
        .draw(&DrawInfo::arrays(Topology::Triangles, 3, 3))
        .unwrap();
    assert_eq!(covered(&image(&mut arrays)), 256);

    let indices: [u8; 3] = [0, 1, 2];
    let mut biased = context(RenderSettings::default());
    set_positions(&mut biased, &positions);
    biased
        .draw(&DrawInfo::indexed(Topology::Triangles, IndexBuffer::U8(&indices)).with_index_bias(3))
        .unwrap();
    assert_eq!(covered(&image(&mut biased)), 256);
}

/// Twelve vertices on a circle, shaded by angle.
fn circle() -> (Vec<[f32; 2]>, Vec<[f32; 4]>) {
    (0..12)
        .map(|i| {
            let angle = i as f32 * core::f32::consts::TAU / 12.0;
            let position = ndc(8.0 + 7.0 * angle.cos(), 8.0 + 7.0 * angle.sin());
            let t = i as f32 / 11.0;
            (position, [t, 1.0 - t, 0.5, 1.0])
        })
        .unzip()
}

fn render_circle(settings: RenderSettings, topology: Topology) -> Vec<u8> {
    let (positions, colors) = circle();
    let mut ctx = context(settings);
    ctx.set_vertex_buffer(0, VertexBuffer::from_pod(&positions));
    ctx.set_vertex_buffer(1, VertexBuffer::from_pod(&colors));
    ctx.set_vertex_elements(vec![
        VertexElement::new(0, 0, VertexFormat::Float32x2),
        VertexElement::new(1, 0, VertexFormat::Float32x4),
    ]);
    ctx.draw(&DrawInfo::arrays(topology, 0, 12)).unwrap();
    image(&mut ctx)
}

#[test]
fn batching_strategies_agree() {
    let strategies = [
        RenderSettings {
            pipeline: true,
            ..Default::default()
        },
        RenderSettings {
            max_linear_vertices: 0,
            ..Default::default()
        },
        RenderSettings {
            pipeline: true,
            batch_vertex_limit: 6,
            ..Default::default()
        },
    ];
    for topology in [
        Topology::Points,
        Topology::LineLoop,
        Topology::LineStrip,
        Topology::TriangleStrip,
        Topology::TriangleFan,
        Topology::Polygon,
        Topology::QuadStrip,
        Topology::TrianglesAdjacency,
        Topology::LineStripAdjacency,
    ] {
        let expected = render_circle(RenderSettings::default(), topology);
        assert_ne!(covered(&expected), 0, "{topology:?} drew nothing");
        for settings in strategies {
            assert!(
                render_circle(settings, topology) == expected,
                "{topology:?} differs with {settings:?}"
            );
        }
    }
}

#[test]
fn instanced_attributes_use_the_divisor() {
    let mut ctx = context(RenderSettings::default());
    ctx.set_vertex_buffer(0, VertexBuffer::from_pod(&FULL_SCREEN));
    let colors: [[u8; 4]; 3] = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];
    ctx.set_vertex_buffer(1, VertexBuffer::from_pod(&colors));
    ctx.set_vertex_elements(vec![
        VertexElement::new(0, 0, VertexFormat::Float32x2),
        VertexElement::new(1, 0, VertexFormat::Unorm8x4).with_instance_divisor(1),
    ]);

    ctx.draw(&DrawInfo::arrays(Topology::Triangles, 0, 3).with_instances(0, 1))
        .unwrap();
    ctx.flush();
    assert_eq!(ctx.color_surface(0).unwrap().pixel(5, 5), [255, 0, 0, 255]);

    // Instances 0 and 1 read colors 1 and 2; the last one drawn wins.
    ctx.draw(&DrawInfo::arrays(Topology::Triangles, 0, 3).with_instances(1, 2))
        .unwrap();
    ctx.flush();
    assert_eq!(ctx.color_surface(0).unwrap().pixel(5, 5), [0, 0, 255, 255]);
}

fn depth_context() -> RenderContext {
    let mut ctx = RenderContext::default();
    ctx.set_framebuffer(
        vec![ColorSurface::new(SIZE, SIZE)],
        Some(DepthStencilSurface::new(
            DepthStencilFormat::Z32Float,
            SIZE,
            SIZE,
        )),
    );
    ctx.set_depth_stencil_alpha_state(DepthStencilAlphaState {
        depth: DepthState {
            enabled: true,
            write_enabled: true,
            func: CompareFunc::Less,
        },
        ..Default::default()
    });
    ctx.clear_depth_stencil(1.0, 0);
    ctx
}

fn draw_full_screen(ctx: &mut RenderContext, ndc_z: f32, color: [f32; 4]) {
    let positions = FULL_SCREEN.map(|[x, y]| [x, y, ndc_z]);
    ctx.set_vertex_buffer(0, VertexBuffer::from_pod(&positions));
    ctx.set_vertex_buffer(1, VertexBuffer::from_pod(&[color; 3]));
    ctx.set_vertex_elements(vec![
        VertexElement::new(0, 0, VertexFormat::Float32x3),
        VertexElement::new(1, 0, VertexFormat::Float32x4),
    ]);
    ctx.draw(&DrawInfo::arrays(Topology::Triangles, 0, 3))
        .unwrap();
}

#[test]
fn depth_test_keeps_the_nearest_surface() {
    let mut ctx = depth_context();
    draw_full_screen(&mut ctx, 0.0, [1.0, 0.0, 0.0, 1.0]);
    draw_full_screen(&mut ctx, 0.5, [0.0, 1.0, 0.0, 1.0]);
    ctx.flush();
    assert_eq!(ctx.color_surface(0).unwrap().pixel(9, 3), [255, 0, 0, 255]);
    let (depth, _) = ctx.depth_stencil_surface().unwrap().depth_stencil(9, 3);
    assert!((f32::from_bits(depth) - 0.5).abs() < 1e-5);
}

#[test]
fn occlusion_query_counts_depth_passes() {
    let mut ctx = depth_context();
    draw_full_screen(&mut ctx, 0.0, [1.0; 4]);

    ctx.begin_occlusion_query();
    draw_full_screen(&mut ctx, 0.5, [1.0; 4]);
    assert_eq!(ctx.end_occlusion_query(), 0);

    ctx.begin_occlusion_query();
    draw_full_screen(&mut ctx, -0.5, [1.0; 4]);
    assert_eq!(ctx.end_occlusion_query(), 256);
}

#[test]
fn vertices_behind_the_eye_are_dropped() {
    let mut ctx = context(RenderSettings::default());
    let positions: [[f32; 4]; 6] = [
        [-2.0, -2.0, 0.0, 2.0],
        [6.0, -2.0, 0.0, 2.0],
        [-2.0, 6.0, 0.0, 2.0],
        [-1.0, -1.0, 0.0, 1.0],
        [3.0, -1.0, 0.0, -1.0],
        [-1.0, 3.0, 0.0, 1.0],
    ];
    ctx.set_vertex_buffer(0, VertexBuffer::from_pod(&positions));
    ctx.set_vertex_elements(vec![VertexElement::new(0, 0, VertexFormat::Float32x4)]);

    ctx.begin_occlusion_query();
    ctx.draw(&DrawInfo::arrays(Topology::Triangles, 3, 3)).unwrap();
    assert_eq!(ctx.end_occlusion_query(), 0);

    ctx.begin_occlusion_query();
    ctx.draw(&DrawInfo::arrays(Topology::Triangles, 0, 3)).unwrap();
    assert_eq!(ctx.end_occlusion_query(), 256);
}

#[test]
fn negative_w_is_projected_without_clipping() {
    // The full-screen triangle with every coordinate negated.
    let positions = FULL_SCREEN.map(|[x, y]| [-x, -y, 0.0, -1.0]);
    for (clip, pixels) in [(true, 0), (false, 256)] {
        let mut ctx = context(RenderSettings {
            clip,
            ..RenderSettings::default()
        });
        ctx.set_vertex_buffer(0, VertexBuffer::from_pod(&positions));
        ctx.set_vertex_elements(vec![VertexElement::new(0, 0, VertexFormat::Float32x4)]);
        ctx.begin_occlusion_query();
        ctx.draw(&DrawInfo::arrays(Topology::Triangles, 0, 3)).unwrap();
        assert_eq!(ctx.end_occlusion_query(), pixels, "clip: {clip}");
    }
}

#[test]
fn overlapping_triangles_in_one_draw_blend_with_each_other() {
    let mut ctx = context(RenderSettings::default());
    let mut blend = BlendState::default();
    blend.rt[0] = RenderTargetBlend {
        enabled: true,
        rgb_src_factor: BlendFactor::One,
        rgb_dst_factor: BlendFactor::One,
        alpha_src_factor: BlendFactor::One,
        alpha_dst_factor: BlendFactor::One,
        ..Default::default()
    };
    ctx.set_blend_state(blend);

    let positions: Vec<[f32; 2]> = FULL_SCREEN.iter().chain(&FULL_SCREEN).copied().collect();
    ctx.set_vertex_buffer(0, VertexBuffer::from_pod(&positions));
    ctx.set_vertex_buffer(1, VertexBuffer::from_pod(&[[0.2_f32; 4]]));
    ctx.set_vertex_elements(vec![
        VertexElement::new(0, 0, VertexFormat::Float32x2),
        VertexElement::new(1, 0, VertexFormat::Float32x4).with_instance_divisor(1),
    ]);
    ctx.draw(&DrawInfo::arrays(Topology::Triangles, 0, 6)).unwrap();

    let image = image(&mut ctx);
    assert!(image.iter().all(|&c| c == 102));
}

#[test]
fn clear_fills_depth_and_stencil() {
    let mut ctx = RenderContext::default();
    ctx.set_framebuffer(
        vec![ColorSurface::new(SIZE, SIZE)],
        Some(DepthStencilSurface::new(
            DepthStencilFormat::Z24UnormS8Uint,
            SIZE,
            SIZE,
        )),
    );
    ctx.clear_color([0.0, 0.0, 1.0, 1.0]);
    ctx.clear_depth_stencil(1.0, 7);
    ctx.flush();
    assert_eq!(
        ctx.depth_stencil_surface().unwrap().depth_stencil(3, 12),
        (0x00ff_ffff, 7)
    );
    assert_eq!(ctx.color_surface(0).unwrap().pixel(15, 0), [0, 0, 255, 255]);
}

#[test]
fn invalid_vertex_layouts_are_reported() {
    let mut ctx = context(RenderSettings::default());
    let draw = DrawInfo::arrays(Topology::Triangles, 0, 3);
    assert!(matches!(
        ctx.draw(&draw),
        Err(Error::InvalidVertexElement { element: 0, .. })
    ));

    ctx.set_vertex_elements(vec![VertexElement::new(3, 0, VertexFormat::Float32x2)]);
    assert!(matches!(
        ctx.draw(&draw),
        Err(Error::MissingVertexBuffer {
            element: 0,
            buffer: 3
        })
    ));

    ctx.set_vertex_buffer(3, VertexBuffer::from_pod(&FULL_SCREEN));
    ctx.set_vertex_elements(vec![VertexElement::new(3, 0, VertexFormat::Float32)]);
    assert!(matches!(
        ctx.draw(&draw),
        Err(Error::InvalidVertexElement { element: 0, .. })
    ));
}

#[test]
fn draw_errors_are_propagated() {
    let mut ctx = context(RenderSettings::default());
    set_positions(&mut ctx, &FULL_SCREEN);
    let indices: [u32; 3] = [0, 1, 2];
    let mut draw = DrawInfo::indexed(Topology::Triangles, IndexBuffer::U32(&indices));
    draw.count = 6;
    assert!(matches!(
        ctx.draw(&draw),
        Err(Error::Draw(DrawError::IndexOutOfBounds { len: 3, .. }))
    ));
}
