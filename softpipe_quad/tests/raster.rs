// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterization through setup and the full quad pipeline.

use softpipe_quad::state::{
    BlendFactor, BlendState, CompareFunc, CullFace, DepthState, DepthStencilAlphaState,
    PolyStipple, RasterizerState, RenderTargetBlend, Scissor, StencilOp, StencilState,
};
use softpipe_quad::{
    ColorSurface, DepthStencilFormat, DepthStencilSurface, Framebuffer, PipelineState, Setup,
    SetupVertex,
};

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

fn vertex(x: f32, y: f32, z: f32, color: [f32; 4]) -> SetupVertex {
    SetupVertex {
        position: [x, y, z],
        inv_w: 1.0,
        color,
    }
}

fn framebuffer(width: u16, height: u16) -> Framebuffer {
    let mut fb = Framebuffer::default();
    fb.set_color_buffers(vec![ColorSurface::new(width, height)]);
    fb
}

fn counting(rasterizer: RasterizerState) -> PipelineState {
    PipelineState {
        rasterizer,
        occlusion_query: true,
        ..Default::default()
    }
}

/// Draw the square `(0, 0)..(size, size)` as two triangles sharing its diagonal.
fn square(setup: &mut Setup, fb: &mut Framebuffer, size: f32, z: f32, color: [f32; 4]) {
    let v = [
        vertex(0.0, 0.0, z, color),
        vertex(size, 0.0, z, color),
        vertex(size, size, z, color),
        vertex(0.0, size, z, color),
    ];
    setup.triangle(fb, [&v[0], &v[1], &v[2]]);
    setup.triangle(fb, [&v[0], &v[2], &v[3]]);
}

#[test]
fn shared_edges_cover_each_pixel_once() {
    let mut fb = framebuffer(4, 4);
    let mut setup = Setup::new(&counting(RasterizerState::default()));
    setup.begin(&fb);
    square(&mut setup, &mut fb, 4.0, 0.0, RED);
    setup.flush(&mut fb);
    assert_eq!(fb.occlusion_count(), 16);
}

#[test]
fn large_primitives_are_flushed_in_batches() {
    let mut fb = framebuffer(128, 128);
    let mut setup = Setup::new(&counting(RasterizerState::default()));
    setup.begin(&fb);
    square(&mut setup, &mut fb, 100.0, 0.0, GREEN);
    setup.flush(&mut fb);
    assert_eq!(fb.occlusion_count(), 100 * 100);

    fb.flush();
    let surface = fb.color(0).unwrap().surface();
    assert_eq!(surface.pixel(99, 99), [0, 255, 0, 255]);
    assert_eq!(surface.pixel(100, 99), [0, 0, 0, 0]);
}

#[test]
fn primitives_are_clipped_to_the_framebuffer() {
    let mut fb = framebuffer(6, 5);
    let mut setup = Setup::new(&counting(RasterizerState::default()));
    setup.begin(&fb);
    let v = [
        vertex(-50.0, -50.0, 0.0, RED),
        vertex(150.0, -50.0, 0.0, RED),
        vertex(-50.0, 150.0, 0.0, RED),
    ];
    setup.triangle(&mut fb, [&v[0], &v[1], &v[2]]);
    setup.flush(&mut fb);
    assert_eq!(fb.occlusion_count(), 30);
}

#[test]
fn scissor_restricts_coverage() {
    let mut fb = framebuffer(8, 8);
    let rasterizer = RasterizerState {
        scissor: true,
        scissor_rect: Scissor {
            min_x: 1,
            min_y: 1,
            max_x: 4,
            max_y: 3,
        },
        ..Default::default()
    };
    let mut setup = Setup::new(&counting(rasterizer));
    setup.begin(&fb);
    square(&mut setup, &mut fb, 8.0, 0.0, RED);
    setup.flush(&mut fb);
    assert_eq!(fb.occlusion_count(), 6);
}

#[test]
fn culling_uses_screen_winding() {
    // Both triangles of `square` run clockwise on screen, so they face the back when
    // counter-clockwise triangles face the front.
    for (cull_face, front_ccw, expected) in [
        (CullFace::None, true, 16),
        (CullFace::Back, true, 0),
        (CullFace::Front, true, 16),
        (CullFace::Back, false, 16),
        (CullFace::FrontAndBack, false, 0),
    ] {
        let mut fb = framebuffer(4, 4);
        let rasterizer = RasterizerState {
            cull_face,
            front_ccw,
            ..Default::default()
        };
        let mut setup = Setup::new(&counting(rasterizer));
        setup.begin(&fb);
        square(&mut setup, &mut fb, 4.0, 0.0, RED);
        setup.flush(&mut fb);
        assert_eq!(fb.occlusion_count(), expected, "{cull_face:?} front_ccw={front_ccw}");
    }
}

#[test]
fn flat_shading_uses_provoking_vertex() {
    for (flatshade_first, expected) in [(false, [0, 0, 255, 255]), (true, [255, 0, 0, 255])] {
        let mut fb = framebuffer(4, 4);
        let rasterizer = RasterizerState {
            flatshade: true,
            flatshade_first,
            ..Default::default()
        };
        let mut setup = Setup::new(&PipelineState {
            rasterizer,
            ..Default::default()
        });
        setup.begin(&fb);
        let v = [
            vertex(0.0, 0.0, 0.0, RED),
            vertex(4.0, 0.0, 0.0, GREEN),
            vertex(0.0, 4.0, 0.0, BLUE),
        ];
        setup.triangle(&mut fb, [&v[0], &v[1], &v[2]]);
        setup.flush(&mut fb);
        fb.flush();
        let surface = fb.color(0).unwrap().surface();
        assert_eq!(surface.pixel(0, 0), expected);
        assert_eq!(surface.pixel(1, 1), expected);
    }
}

#[test]
fn smooth_shading_interpolates() {
    let mut fb = framebuffer(8, 2);
    let mut setup = Setup::new(&PipelineState::default());
    setup.begin(&fb);
    let black = [0.0, 0.0, 0.0, 1.0];
    let white = [1.0; 4];
    let v = [
        vertex(0.0, 0.0, 0.0, black),
        vertex(8.0, 0.0, 0.0, white),
        vertex(8.0, 2.0, 0.0, white),
        vertex(0.0, 2.0, 0.0, black),
    ];
    setup.triangle(&mut fb, [&v[0], &v[1], &v[2]]);
    setup.triangle(&mut fb, [&v[0], &v[2], &v[3]]);
    setup.flush(&mut fb);
    fb.flush();
    let surface = fb.color(0).unwrap().surface();
    let left = surface.pixel(0, 1)[0];
    let right = surface.pixel(7, 1)[0];
    assert!(left < 32 && right > 223, "{left} {right}");
    assert!(surface.pixel(3, 0)[0] < surface.pixel(4, 0)[0]);
}

#[test]
fn nearer_geometry_wins_the_depth_test() {
    let mut fb = framebuffer(4, 4);
    fb.set_depth_stencil(Some(DepthStencilSurface::new(
        DepthStencilFormat::Z24UnormS8Uint,
        4,
        4,
    )));
    fb.depth_stencil_mut().unwrap().clear(0x00ff_ffff);
    let state = PipelineState {
        depth_stencil_alpha: DepthStencilAlphaState {
            depth: DepthState {
                enabled: true,
                write_enabled: true,
                func: CompareFunc::Less,
            },
            ..Default::default()
        },
        ..Default::default()
    };
    let mut setup = Setup::new(&state);
    setup.begin(&fb);
    square(&mut setup, &mut fb, 4.0, 0.25, RED);
    square(&mut setup, &mut fb, 4.0, 0.5, BLUE);
    setup.flush(&mut fb);
    fb.flush();
    assert_eq!(fb.color(0).unwrap().surface().pixel(2, 2), [255, 0, 0, 255]);
}

#[test]
fn stencil_masks_a_second_pass() {
    let mut fb = framebuffer(8, 8);
    fb.set_depth_stencil(Some(DepthStencilSurface::new(DepthStencilFormat::S8Uint, 8, 8)));
    let write = PipelineState {
        depth_stencil_alpha: DepthStencilAlphaState {
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
        },
        ..Default::default()
    };
    let mut setup = Setup::new(&write);
    setup.begin(&fb);
    square(&mut setup, &mut fb, 4.0, 0.0, RED);
    setup.flush(&mut fb);

    let mut test = write;
    test.depth_stencil_alpha.stencil[0] = StencilState {
        enabled: true,
        func: CompareFunc::NotEqual,
        reference: 1,
        ..Default::default()
    };
    let mut setup = Setup::new(&test);
    setup.begin(&fb);
    square(&mut setup, &mut fb, 8.0, 0.0, BLUE);
    setup.flush(&mut fb);

    fb.flush();
    let surface = fb.color(0).unwrap().surface();
    assert_eq!(surface.pixel(1, 1), [255, 0, 0, 255]);
    assert_eq!(surface.pixel(5, 5), [0, 0, 255, 255]);
    assert_eq!(fb.depth_stencil().unwrap().surface().depth_stencil(1, 1), (0, 1));
}

#[test]
fn stipple_only_applies_to_triangles() {
    let mut fb = framebuffer(4, 4);
    let rasterizer = RasterizerState {
        poly_stipple_enable: true,
        poly_stipple: PolyStipple::checkerboard(1),
        ..Default::default()
    };
    let mut setup = Setup::new(&counting(rasterizer));
    setup.begin(&fb);
    square(&mut setup, &mut fb, 4.0, 0.0, RED);
    setup.flush(&mut fb);
    assert_eq!(fb.occlusion_count(), 8);

    fb.reset_occlusion();
    let v = [vertex(0.5, 0.5, 0.0, RED), vertex(4.5, 0.5, 0.0, RED)];
    setup.line(&mut fb, &v[0], &v[1]);
    setup.flush(&mut fb);
    assert_eq!(fb.occlusion_count(), 4);
}

#[test]
fn lines_omit_their_last_pixel() {
    let mut fb = framebuffer(8, 8);
    let mut setup = Setup::new(&counting(RasterizerState::default()));
    setup.begin(&fb);
    let v = [
        vertex(0.5, 0.5, 0.0, GREEN),
        vertex(6.5, 6.5, 0.0, GREEN),
        vertex(6.5, 0.5, 0.0, GREEN),
    ];
    setup.line(&mut fb, &v[0], &v[1]);
    setup.line(&mut fb, &v[1], &v[2]);
    setup.flush(&mut fb);
    assert_eq!(fb.occlusion_count(), 12);

    fb.flush();
    let surface = fb.color(0).unwrap().surface();
    assert_eq!(surface.pixel(3, 3), [0, 255, 0, 255]);
    assert_eq!(surface.pixel(6, 1), [0, 255, 0, 255]);
    assert_eq!(surface.pixel(6, 0), [0, 0, 0, 0]);
}

#[test]
fn offscreen_lines_are_clipped() {
    let mut fb = framebuffer(4, 4);
    let mut setup = Setup::new(&counting(RasterizerState::default()));
    setup.begin(&fb);
    let v = [
        vertex(-1.0e6, 1.5, 0.0, RED),
        vertex(1.0e6, 1.5, 0.0, RED),
    ];
    setup.line(&mut fb, &v[0], &v[1]);
    setup.flush(&mut fb);
    assert_eq!(fb.occlusion_count(), 4);
}

#[test]
fn points_cover_their_size() {
    let mut fb = framebuffer(8, 8);
    let rasterizer = RasterizerState {
        point_size: 2.0,
        ..Default::default()
    };
    let mut setup = Setup::new(&counting(rasterizer));
    setup.begin(&fb);
    setup.point(&mut fb, &vertex(2.0, 2.0, 0.0, BLUE));
    setup.flush(&mut fb);
    assert_eq!(fb.occlusion_count(), 4);

    fb.flush();
    let surface = fb.color(0).unwrap().surface();
    for (x, y) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
        assert_eq!(surface.pixel(x, y), [0, 0, 255, 255]);
    }
    assert_eq!(surface.pixel(3, 2), [0, 0, 0, 0]);
}

fn additive() -> PipelineState {
    let mut blend = BlendState::default();
    blend.rt[0] = RenderTargetBlend {
        enabled: true,
        rgb_src_factor: BlendFactor::One,
        rgb_dst_factor: BlendFactor::One,
        alpha_src_factor: BlendFactor::One,
        alpha_dst_factor: BlendFactor::One,
        ..Default::default()
    };
    PipelineState {
        blend,
        ..Default::default()
    }
}

#[test]
fn overlapping_primitives_blend_in_submission_order() {
    let gray = [0.2; 4];
    let mut fb = framebuffer(4, 4);
    let mut setup = Setup::new(&additive());
    setup.begin(&fb);
    square(&mut setup, &mut fb, 4.0, 0.0, gray);
    square(&mut setup, &mut fb, 4.0, 0.0, gray);
    setup.flush(&mut fb);
    fb.flush();
    let surface = fb.color(0).unwrap().surface();
    for (x, y) in [(0, 0), (3, 0), (1, 2), (3, 3)] {
        assert_eq!(surface.pixel(x, y), [102; 4]);
    }

    let mut fb = framebuffer(4, 4);
    let mut setup = Setup::new(&additive());
    setup.begin(&fb);
    let (a, b) = (vertex(0.5, 1.5, 0.0, gray), vertex(3.5, 1.5, 0.0, gray));
    setup.line(&mut fb, &a, &b);
    setup.line(&mut fb, &a, &b);
    let p = vertex(2.5, 3.5, 0.0, gray);
    setup.point(&mut fb, &p);
    setup.point(&mut fb, &p);
    setup.flush(&mut fb);
    fb.flush();
    let surface = fb.color(0).unwrap().surface();
    assert_eq!(surface.pixel(1, 1), [102; 4]);
    assert_eq!(surface.pixel(2, 3), [102; 4]);
}

#[test]
fn quads_at_the_largest_surface_width() {
    let mut fb = framebuffer(u16::MAX, 2);
    let mut setup = Setup::new(&counting(RasterizerState::default()));
    setup.begin(&fb);
    setup.point(&mut fb, &vertex(65534.5, 0.5, 0.0, RED));
    assert_eq!(fb.occlusion_count(), 1);

    let v = [
        vertex(65532.0, 0.0, 0.0, GREEN),
        vertex(65535.0, 0.0, 0.0, GREEN),
        vertex(65535.0, 2.0, 0.0, GREEN),
        vertex(65532.0, 2.0, 0.0, GREEN),
    ];
    setup.triangle(&mut fb, [&v[0], &v[1], &v[2]]);
    setup.triangle(&mut fb, [&v[0], &v[2], &v[3]]);
    assert_eq!(fb.occlusion_count(), 1 + 6);

    fb.flush();
    let surface = fb.color(0).unwrap().surface();
    assert_eq!(surface.pixel(65534, 1), [0, 255, 0, 255]);
    assert_eq!(surface.pixel(65531, 1), [0; 4]);
}
