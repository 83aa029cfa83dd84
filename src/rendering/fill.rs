//! Span fill: turning outline rows into shaded pixels.
//!
//! Two fill strategies share the same shading code. The scalar path
//! walks each row left to right and always samples the finest mip. The
//! block path visits 2x2 pixel quads so it can measure texel-space UV
//! gradients across the quad and pick a mip level, optionally dithered
//! and trilinear-blended; its depth test comes in a plain variant and
//! an SSE2 variant that tests all four pixels with one compare. Both
//! block variants produce identical pixels.

#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use super::config::{MipmapMode, RasterConfig, RenderMode};
use super::outline::{OutlineEntry, OutlineTable};
use super::target::ColorTarget;
use super::texture::{lerp_color, Texture};

/// Depth-test strategy for the block fill path, chosen once at
/// rasterizer construction from runtime CPU detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimdMode {
    Scalar,
    Sse2,
}

/// Ordered-dither offsets added to the texel coordinates before
/// sampling, indexed by pixel parity. One table per axis.
const DITHER_U: [[f32; 2]; 2] = [[0.25, 0.0], [0.5, 0.75]];
const DITHER_V: [[f32; 2]; 2] = [[0.75, 0.5], [0.0, 0.25]];

/// False colors for the mip visualization mode, one per level.
const MIP_COLORS: [u32; 9] = [
    0xffff0000, 0xffff8000, 0xffffff00, 0xff00ff00, 0xff00ffff, 0xff0080ff, 0xff0000ff,
    0xffff00ff, 0xffffffff,
];

/// One row's span, resolved from its outline entry into a start point
/// and per-pixel steps. An empty or unoccupied row resolves to an
/// empty pixel range (`ix1 > ix2`) but still evaluates interpolants,
/// which the block path uses on halo rows.
#[derive(Clone, Copy, Debug)]
struct RowSpan {
    ix1: i32,
    ix2: i32,
    x0: f32,
    z0: f32,
    u0: f32,
    v0: f32,
    dz: f32,
    du: f32,
    dv: f32,
}

impl RowSpan {
    fn from_entry(entry: &OutlineEntry) -> Self {
        let dx = entry.max_x - entry.min_x;
        let (dz, du, dv) = if dx > 0.0 {
            let inv = 1.0 / dx;
            (
                (entry.max_z - entry.min_z) * inv,
                (entry.max_u - entry.min_u) * inv,
                (entry.max_v - entry.min_v) * inv,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        let (ix1, ix2) = if entry.occupied {
            (entry.min_x.ceil() as i32, entry.max_x.floor() as i32)
        } else {
            (1, 0)
        };

        Self {
            ix1,
            ix2,
            x0: entry.min_x,
            z0: entry.min_z,
            u0: entry.min_u,
            v0: entry.min_v,
            dz,
            du,
            dv,
        }
    }

    #[inline]
    fn contains(&self, x: i32) -> bool {
        x >= self.ix1 && x <= self.ix2
    }

    /// Interpolants at pixel column `x`.
    #[inline]
    fn at(&self, x: i32) -> (f32, f32, f32) {
        let t = x as f32 - self.x0;
        (
            self.z0 + self.dz * t,
            self.u0 + self.du * t,
            self.v0 + self.dv * t,
        )
    }
}

/// Produce the color for one fragment. `z` is reciprocal view depth;
/// `u`/`v` are still premultiplied by `z`. `dither` is the ordered
/// texel-coordinate offset and `depth_range` the view-space near/far
/// pair used by the depth visualization.
#[allow(clippy::too_many_arguments)]
#[inline]
fn shade(
    config: &RasterConfig,
    texture: Option<&Texture>,
    z: f32,
    u: f32,
    v: f32,
    level: usize,
    trilinear_weight: u32,
    dither: (f32, f32),
    depth_range: (f32, f32),
) -> u32 {
    match config.render_mode {
        RenderMode::Flat => 0xffffffff,
        RenderMode::UvGradient => {
            // Tiled coordinates wrap, so only the fractional part shows.
            let rz = if z != 0.0 { 1.0 / z } else { 0.0 };
            let r = ((u * rz).fract() * 255.0) as u32 & 0xff;
            let g = ((v * rz).fract() * 255.0) as u32 & 0xff;
            0xff000000 | r << 16 | g << 8
        }
        RenderMode::Depth => {
            let (near, far) = depth_range;
            let view_depth = if z != 0.0 { 1.0 / z } else { far };
            let normalized = ((view_depth - near) / (far - near)).clamp(0.0, 1.0);
            let gray = (normalized * 255.0) as u32;
            0xff000000 | gray << 16 | gray << 8 | gray
        }
        RenderMode::MipLevel => MIP_COLORS[level.min(MIP_COLORS.len() - 1)],
        RenderMode::Textured => {
            let tex = match texture {
                Some(t) => t,
                None => return 0xffffffff,
            };
            let rz = if z != 0.0 { 1.0 / z } else { 0.0 };
            let sample_level = |lvl: usize| {
                let size = tex.mip_size(lvl) as f32;
                tex.sample(
                    lvl,
                    u * rz * size + dither.0,
                    v * rz * size + dither.1,
                    config.texture_filter,
                    config.swizzle_lut,
                )
            };
            let base = sample_level(level);
            if trilinear_weight > 0 && level + 1 < tex.mip_count() {
                lerp_color(base, sample_level(level + 1), trilinear_weight)
            } else {
                base
            }
        }
    }
}

/// Scalar fill: walk every outlined row pixel by pixel. Always samples
/// the finest mip since a single row gives no vertical UV gradient.
#[allow(clippy::too_many_arguments)]
pub(crate) fn fill_rows_scalar(
    depth: &mut [f32],
    outline: &OutlineTable,
    color: &mut ColorTarget,
    width: usize,
    min_row: i32,
    max_row: i32,
    config: &RasterConfig,
    texture: Option<&Texture>,
    depth_range: (f32, f32),
) {
    for row in min_row..=max_row {
        let span = RowSpan::from_entry(outline.entry(row));
        let ix1 = span.ix1.max(0);
        let ix2 = span.ix2.min(width as i32 - 1);
        if ix1 > ix2 {
            continue;
        }

        let (mut z, mut u, mut v) = span.at(ix1);
        let base = row as usize * width;
        for x in ix1..=ix2 {
            let idx = base + x as usize;
            if !config.depth_test || z > depth[idx] {
                depth[idx] = z;
                color.pixels[idx] =
                    shade(config, texture, z, u, v, 0, 0, (0.0, 0.0), depth_range);
            }
            z += span.dz;
            u += span.du;
            v += span.dv;
        }
    }
}

/// Mip level and trilinear weight for one 2x2 block, from the largest
/// texel-space UV step across the quad corners.
fn block_lod(
    config: &RasterConfig,
    texture: &Texture,
    top: &RowSpan,
    bottom: &RowSpan,
    bx: i32,
) -> f32 {
    let size = texture.size() as f32;
    let texel_uv = |span: &RowSpan, x: i32| {
        let (z, u, v) = span.at(x);
        let rz = if z != 0.0 { 1.0 / z } else { 0.0 };
        (u * rz * size, v * rz * size)
    };
    let (u00, v00) = texel_uv(top, bx);
    let (u10, v10) = texel_uv(top, bx + 1);
    let (u01, v01) = texel_uv(bottom, bx);

    let max_duv = (u10 - u00)
        .abs()
        .max((v10 - v00).abs())
        .max((u01 - u00).abs())
        .max((v01 - v00).abs());

    let scale = (config.lod_bias + config.lod_scale * max_duv).max(1.0);
    scale.log2()
}

/// Block fill: visit 2x2 pixel quads over the outlined rows. The row
/// pair of a quad can include a halo row, which contributes interpolants
/// for the gradient but never passes the span gate.
#[allow(clippy::too_many_arguments)]
pub(crate) fn fill_rows_blocks(
    depth: &mut [f32],
    outline: &OutlineTable,
    color: &mut ColorTarget,
    width: usize,
    min_row: i32,
    max_row: i32,
    config: &RasterConfig,
    texture: Option<&Texture>,
    simd: SimdMode,
    depth_range: (f32, f32),
) {
    let height = outline.height();
    let mut by = min_row & !1;
    while by <= max_row {
        let top = RowSpan::from_entry(outline.entry(by));
        let bottom = RowSpan::from_entry(outline.entry(by + 1));

        let mut bx_min = i32::MAX;
        let mut bx_max = i32::MIN;
        for span in [&top, &bottom] {
            if span.ix1 <= span.ix2 {
                bx_min = bx_min.min(span.ix1);
                bx_max = bx_max.max(span.ix2);
            }
        }
        if bx_min > bx_max {
            by += 2;
            continue;
        }
        bx_min = (bx_min & !1).max(0);
        bx_max = bx_max.min(width as i32 - 1);

        let mip_texture = if config.mipmap_mode != MipmapMode::None {
            texture
        } else {
            None
        };

        let mut bx = bx_min;
        while bx <= bx_max {
            let lod = mip_texture
                .map(|t| block_lod(config, t, &top, &bottom, bx))
                .unwrap_or(0.0);

            let mut z = [0.0f32; 4];
            let mut u = [0.0f32; 4];
            let mut v = [0.0f32; 4];
            let mut idx = [0usize; 4];
            let mut covered = [false; 4];

            for lane in 0..4 {
                let (dx, dy) = ((lane & 1) as i32, (lane >> 1) as i32);
                let (px, py) = (bx + dx, by + dy);
                let span = if dy == 0 { &top } else { &bottom };
                if py >= 0 && py < height && px < width as i32 && span.contains(px) {
                    let (lz, lu, lv) = span.at(px);
                    z[lane] = lz;
                    u[lane] = lu;
                    v[lane] = lv;
                    idx[lane] = py as usize * width + px as usize;
                    covered[lane] = true;
                }
            }

            let mut pass = [true; 4];
            if config.depth_test {
                match simd {
                    #[cfg(target_arch = "x86_64")]
                    SimdMode::Sse2 => unsafe {
                        depth_test_sse2(depth, &z, &idx, &covered, &mut pass);
                    },
                    #[cfg(not(target_arch = "x86_64"))]
                    SimdMode::Sse2 => {
                        for lane in 0..4 {
                            pass[lane] = covered[lane] && z[lane] > depth[idx[lane]];
                        }
                    }
                    SimdMode::Scalar => {
                        for lane in 0..4 {
                            pass[lane] = covered[lane] && z[lane] > depth[idx[lane]];
                        }
                    }
                }
            }

            for lane in 0..4 {
                if !covered[lane] || !pass[lane] {
                    continue;
                }
                let (dx, dy) = (lane & 1, lane >> 1);

                let (level, weight) = if let Some(tex) = mip_texture {
                    let level = (lod as usize).min(tex.mip_count() - 1);
                    let weight = if config.mipmap_mode == MipmapMode::Trilinear {
                        (lod.fract() * 65536.0) as u32
                    } else {
                        0
                    };
                    (level, weight)
                } else {
                    (0, 0)
                };

                // Block corners are even-aligned, so the lane offset is
                // the pixel parity the dither tables index by.
                let dither = if config.texture_dithering {
                    (DITHER_U[dy][dx], DITHER_V[dy][dx])
                } else {
                    (0.0, 0.0)
                };

                depth[idx[lane]] = z[lane];
                color.pixels[idx[lane]] = shade(
                    config,
                    texture,
                    z[lane],
                    u[lane],
                    v[lane],
                    level,
                    weight,
                    dither,
                    depth_range,
                );
            }

            bx += 2;
        }
        by += 2;
    }
}

/// Compare all four block depths with one SSE2 compare. Uncovered lanes
/// are fed a stored depth of +inf so they can never pass.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn depth_test_sse2(
    depth: &[f32],
    z: &[f32; 4],
    idx: &[usize; 4],
    covered: &[bool; 4],
    pass: &mut [bool; 4],
) {
    let stored = |lane: usize| {
        if covered[lane] {
            depth[idx[lane]]
        } else {
            f32::INFINITY
        }
    };
    let zv = _mm_set_ps(z[3], z[2], z[1], z[0]);
    let dv = _mm_set_ps(stored(3), stored(2), stored(1), stored(0));
    let mask = _mm_movemask_ps(_mm_cmpgt_ps(zv, dv));
    for lane in 0..4 {
        pass[lane] = mask & (1 << lane) != 0;
    }
}
