/// Benchmark suite for the rasterization pipeline
/// Measures whole-frame rendering and the hot-path primitives.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Mat4, Vec2, Vec3};
use spanrast::{
    ColorTarget, Mesh, MipmapMode, Model, Rasterizer, RenderMode, Texture, TextureFilter,
    TextureLayout,
};

const WIDTH: usize = 1280;
const HEIGHT: usize = 720;

fn checker(size: u32) -> Vec<u32> {
    (0..size * size)
        .map(|i| {
            if ((i % size) + (i / size)) % 2 == 0 {
                0xffff0000
            } else {
                0xff0000ff
            }
        })
        .collect()
}

/// A grid of textured quads filling most of the view.
fn scene(layout: TextureLayout) -> Model {
    let tex = Texture::from_pixels(&checker(64), 64, 64, layout).unwrap();
    let mut meshes = Vec::new();
    for gy in 0..4 {
        for gx in 0..4 {
            let cx = gx as f32 * 2.2 - 3.3;
            let cy = gy as f32 * 2.2 - 3.3;
            meshes.push(Mesh::single_submesh(
                &[
                    Vec3::new(cx - 1.0, cy - 1.0, 0.0),
                    Vec3::new(cx + 1.0, cy - 1.0, 0.0),
                    Vec3::new(cx + 1.0, cy + 1.0, 0.0),
                    Vec3::new(cx - 1.0, cy + 1.0, 0.0),
                ],
                &[
                    Vec2::new(0.0, 1.0),
                    Vec2::new(1.0, 1.0),
                    Vec2::new(1.0, 0.0),
                    Vec2::new(0.0, 0.0),
                ],
                vec![0, 1, 2, 0, 2, 3],
                Some(0),
            ));
        }
    }
    Model::new(meshes, vec![tex])
}

fn rasterizer() -> Rasterizer {
    let mut raster = Rasterizer::new();
    raster.set_render_target(WIDTH, HEIGHT).unwrap();
    raster.set_projection_matrix(Mat4::perspective_rh_gl(
        std::f32::consts::FRAC_PI_2,
        WIDTH as f32 / HEIGHT as f32,
        0.1,
        100.0,
    ));
    raster.set_view_matrix(Mat4::look_at_rh(
        Vec3::new(0.0, 0.0, 6.0),
        Vec3::ZERO,
        Vec3::Y,
    ));
    raster
}

fn bench_render_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_frame");
    for (name, block, simd) in [
        ("scalar_span", false, false),
        ("block", true, false),
        ("block_simd", true, true),
    ] {
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            let mut raster = rasterizer();
            raster.config.render_mode = RenderMode::Textured;
            raster.config.texture_filter = TextureFilter::Bilinear;
            raster.config.mipmap_mode = MipmapMode::Trilinear;
            raster.config.block_fill = block;
            raster.config.block_fill_simd = simd;
            let mut model = scene(TextureLayout::Linear);
            let mut pixels = vec![0u32; WIDTH * HEIGHT];

            b.iter(|| {
                let mut color = ColorTarget::new(&mut pixels, WIDTH, HEIGHT);
                raster.clear_depth().unwrap();
                color.clear(0xff202020);
                raster.render(black_box(&mut model), &mut color).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_texture_layouts(c: &mut Criterion) {
    let mut group = c.benchmark_group("texture_layout");
    for (name, layout) in [
        ("linear", TextureLayout::Linear),
        ("tiled", TextureLayout::Tiled4x4),
        ("swizzled", TextureLayout::Swizzled),
    ] {
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            let mut raster = rasterizer();
            raster.config.render_mode = RenderMode::Textured;
            raster.config.texture_filter = TextureFilter::Bilinear;
            let mut model = scene(layout);
            let mut pixels = vec![0u32; WIDTH * HEIGHT];

            b.iter(|| {
                let mut color = ColorTarget::new(&mut pixels, WIDTH, HEIGHT);
                raster.clear_depth().unwrap();
                raster.render(black_box(&mut model), &mut color).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_clear_depth(c: &mut Criterion) {
    c.bench_function("clear_depth", |b| {
        let mut raster = rasterizer();
        b.iter(|| {
            raster.clear_depth().unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_render_frame,
    bench_texture_layouts,
    bench_clear_depth
);
criterion_main!(benches);
