//! End-to-end pipeline tests: whole frames rendered through the public
//! API, checked pixel by pixel.

use glam::{Mat4, Vec2, Vec3};
use spanrast::{
    ColorTarget, Mesh, MipmapMode, Model, Rasterizer, RenderMode, Texture, TextureFilter,
    TextureLayout,
};

const RED: u32 = 0xffff0000;
const GREEN: u32 = 0xff00ff00;
const BLUE: u32 = 0xff0000ff;
const WHITE: u32 = 0xffffffff;

/// Unit quad in the XY plane at depth `z`, UVs with v growing downward.
fn quad_mesh(z: f32, texture: Option<usize>) -> Mesh {
    Mesh::single_submesh(
        &[
            Vec3::new(-1.0, -1.0, z),
            Vec3::new(1.0, -1.0, z),
            Vec3::new(1.0, 1.0, z),
            Vec3::new(-1.0, 1.0, z),
        ],
        &[
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ],
        vec![0, 1, 2, 0, 2, 3],
        texture,
    )
}

fn checker(size: u32) -> Vec<u32> {
    (0..size * size)
        .map(|i| {
            let (x, y) = (i % size, i / size);
            if (x + y) % 2 == 0 {
                RED
            } else {
                BLUE
            }
        })
        .collect()
}

/// 4x4 texture split into four solid 2x2 quadrants.
fn quadrants() -> Vec<u32> {
    let mut px = vec![0u32; 16];
    for y in 0..4 {
        for x in 0..4 {
            px[y * 4 + x] = match (x < 2, y < 2) {
                (true, true) => RED,
                (false, true) => GREEN,
                (true, false) => BLUE,
                (false, false) => WHITE,
            };
        }
    }
    px
}

fn perspective_rasterizer(width: usize, height: usize) -> Rasterizer {
    let mut raster = Rasterizer::new();
    raster.set_render_target(width, height).unwrap();
    raster.set_projection_matrix(Mat4::perspective_rh_gl(
        std::f32::consts::FRAC_PI_2,
        width as f32 / height as f32,
        0.1,
        100.0,
    ));
    raster.set_view_matrix(Mat4::look_at_rh(
        Vec3::new(0.0, 0.0, 3.0),
        Vec3::ZERO,
        Vec3::Y,
    ));
    raster
}

fn render_frame(raster: &mut Rasterizer, model: &mut Model, width: usize, height: usize) -> Vec<u32> {
    let mut pixels = vec![0u32; width * height];
    let mut color = ColorTarget::new(&mut pixels, width, height);
    raster.clear_depth().unwrap();
    raster.render(model, &mut color).unwrap();
    pixels
}

#[test]
fn repeated_renders_produce_identical_frames() {
    let mut raster = perspective_rasterizer(64, 64);
    raster.config.render_mode = RenderMode::Textured;
    raster.config.mipmap_mode = MipmapMode::Trilinear;
    let tex = Texture::from_pixels(&checker(16), 16, 16, TextureLayout::Linear).unwrap();
    let mut model = Model::new(vec![quad_mesh(0.0, Some(0))], vec![tex]);

    let first = render_frame(&mut raster, &mut model, 64, 64);
    let second = render_frame(&mut raster, &mut model, 64, 64);
    assert_eq!(first, second, "outline state must not leak between frames");
}

#[test]
fn texture_layouts_render_identically() {
    let px = checker(16);
    let mut frames = Vec::new();
    for layout in [
        TextureLayout::Linear,
        TextureLayout::Tiled4x4,
        TextureLayout::Swizzled,
    ] {
        let mut raster = perspective_rasterizer(64, 64);
        raster.config.render_mode = RenderMode::Textured;
        raster.config.texture_filter = TextureFilter::Bilinear;
        raster.config.mipmap_mode = MipmapMode::Trilinear;
        let tex = Texture::from_pixels(&px, 16, 16, layout).unwrap();
        let mut model = Model::new(vec![quad_mesh(0.0, Some(0))], vec![tex]);
        frames.push(render_frame(&mut raster, &mut model, 64, 64));
    }
    assert_eq!(frames[0], frames[1], "tiled layout must match linear");
    assert_eq!(frames[0], frames[2], "swizzled layout must match linear");
}

#[test]
fn quadrant_texture_lands_in_the_right_screen_corners() {
    let mut raster = Rasterizer::new();
    raster.set_render_target(100, 100).unwrap();
    raster.set_projection_matrix(Mat4::orthographic_rh_gl(-1.0, 1.0, -1.0, 1.0, 0.1, 10.0));
    raster.set_view_matrix(Mat4::IDENTITY);
    raster.config.render_mode = RenderMode::Textured;
    raster.config.texture_filter = TextureFilter::Point;
    raster.config.mipmap_mode = MipmapMode::None;
    raster.config.backface_culling = false;

    let tex = Texture::from_pixels(&quadrants(), 4, 4, TextureLayout::Linear).unwrap();
    let mut model = Model::new(vec![quad_mesh(-1.0, Some(0))], vec![tex]);
    let frame = render_frame(&mut raster, &mut model, 100, 100);

    assert_eq!(frame[25 * 100 + 25], RED, "top-left quadrant");
    assert_eq!(frame[25 * 100 + 75], GREEN, "top-right quadrant");
    assert_eq!(frame[75 * 100 + 25], BLUE, "bottom-left quadrant");
    assert_eq!(frame[75 * 100 + 75], WHITE, "bottom-right quadrant");
}

#[test]
fn saturated_lod_scale_samples_the_coarsest_mip() {
    let tex = Texture::from_pixels(&checker(16), 16, 16, TextureLayout::Linear).unwrap();
    // A red/blue checker averages to 0xff7f007f at every coarse mip.
    let average = 0xff7f007f;

    let mut raster = perspective_rasterizer(64, 64);
    raster.config.render_mode = RenderMode::Textured;
    raster.config.texture_filter = TextureFilter::Point;
    raster.config.mipmap_mode = MipmapMode::Nearest;
    raster.config.lod_scale = 10000.0;
    let mut model = Model::new(vec![quad_mesh(0.0, Some(0))], vec![tex.clone()]);
    let coarse = render_frame(&mut raster, &mut model, 64, 64);
    assert_eq!(coarse[32 * 64 + 32], average);

    raster.config.lod_scale = 0.0;
    let fine = render_frame(&mut raster, &mut model, 64, 64);
    let center = fine[32 * 64 + 32];
    assert!(
        center == RED || center == BLUE,
        "finest mip should keep the checker colors, got {center:#x}"
    );
}

#[test]
fn draw_order_does_not_change_the_depth_result() {
    let near = quad_mesh(1.0, None);
    let far = quad_mesh(-1.0, None);

    let render_pair = |first: &Mesh, second: &Mesh| {
        let mut raster = perspective_rasterizer(64, 64);
        raster.config.render_mode = RenderMode::Depth;
        let mut pixels = vec![0u32; 64 * 64];
        let mut color = ColorTarget::new(&mut pixels, 64, 64);
        raster.clear_depth().unwrap();
        let mut model = Model::new(vec![first.clone()], Vec::new());
        raster.render(&mut model, &mut color).unwrap();
        let mut model = Model::new(vec![second.clone()], Vec::new());
        raster.render(&mut model, &mut color).unwrap();
        pixels
    };

    let near_last = render_pair(&far, &near);
    let far_last = render_pair(&near, &far);
    assert_eq!(near_last, far_last, "z-buffering must be order independent");
}

#[test]
fn block_and_scalar_fill_cover_the_same_pixels() {
    let run = |block: bool| {
        let mut raster = perspective_rasterizer(64, 64);
        raster.config.render_mode = RenderMode::Flat;
        raster.config.block_fill = block;
        let mut model = Model::new(vec![quad_mesh(0.0, None)], Vec::new());
        render_frame(&mut raster, &mut model, 64, 64)
    };
    assert_eq!(run(true), run(false));
}

#[test]
fn disabling_rasterize_leaves_the_frame_untouched() {
    let mut raster = perspective_rasterizer(64, 64);
    raster.config.rasterize = false;
    let mut model = Model::new(vec![quad_mesh(0.0, None)], Vec::new());
    let frame = render_frame(&mut raster, &mut model, 64, 64);
    assert!(frame.iter().all(|&p| p == 0));
    assert!(raster.target().unwrap().depth().iter().all(|&d| d == 0.0));
}
