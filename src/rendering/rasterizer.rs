//! The rasterizer context: matrices, target buffers, and the per-frame
//! triangle pipeline.
//!
//! One [`Rasterizer`] owns everything a frame needs except the color
//! buffer, which the caller lends per `render` call. The pipeline per
//! triangle: near clip in homogeneous space, perspective divide with
//! attribute premultiplication, backface cull, guard-band frustum clip,
//! viewport warp, edge walk into the outline table, span fill, and a
//! bounded outline reset.

use std::collections::TryReserveError;

use glam::{Mat4, Vec4};
use thiserror::Error;

use crate::math::transform_positions;
use crate::model::Model;

use super::clip::{classify_aabb, clip_polygon, ClipAxis, ClipVertex, FrustumResult, MAX_CLIP_VERTS};
use super::config::RasterConfig;
use super::fill::{fill_rows_blocks, fill_rows_scalar, SimdMode};
use super::outline::ScreenVertex;
use super::target::{BufferAllocator, ColorTarget, HeapAllocator, RenderTarget};

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("render target allocation failed: {0}")]
    OutOfMemory(#[from] TryReserveError),
    #[error("no render target is set")]
    NoRenderTarget,
}

/// Whether the cached view-projection product matches the source
/// matrices. Setting either matrix flips it to `Dirty`; `render`
/// recomputes the product at most once per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MatrixState {
    Clean,
    Dirty,
}

/// The rasterizer context. Holds no global state: several instances can
/// coexist, each with its own matrices, buffers, and configuration.
pub struct Rasterizer {
    pub config: RasterConfig,
    allocator: Box<dyn BufferAllocator>,
    target: Option<RenderTarget>,
    view: Mat4,
    projection: Mat4,
    view_projection: Mat4,
    matrix_state: MatrixState,
    near: f32,
    far: f32,
    simd: SimdMode,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer {
    pub fn new() -> Self {
        Self::with_allocator(Box::new(HeapAllocator))
    }

    /// Construct with a custom buffer allocator. The SIMD strategy is
    /// picked here from runtime CPU detection.
    pub fn with_allocator(allocator: Box<dyn BufferAllocator>) -> Self {
        #[cfg(target_arch = "x86_64")]
        let simd = if std::arch::is_x86_feature_detected!("sse2") {
            SimdMode::Sse2
        } else {
            SimdMode::Scalar
        };
        #[cfg(not(target_arch = "x86_64"))]
        let simd = SimdMode::Scalar;

        Self {
            config: RasterConfig::default(),
            allocator,
            target: None,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            matrix_state: MatrixState::Dirty,
            near: 0.0,
            far: f32::MAX,
            simd,
        }
    }

    /// Allocate depth and outline buffers for a new target size. If the
    /// size is unchanged after even rounding, the existing buffers are
    /// kept as-is. On allocation failure the previous target is dropped
    /// and the rasterizer is left without one.
    pub fn set_render_target(&mut self, width: usize, height: usize) -> Result<(), RasterError> {
        let (width, height) = (width & !1, height & !1);
        if let Some(target) = &self.target {
            if target.width() == width && target.height() == height {
                return Ok(());
            }
        }
        self.target = None;
        let target = RenderTarget::create(width, height, self.allocator.as_ref())?;
        log::debug!(
            "render target set to {}x{}",
            target.width(),
            target.height()
        );
        self.target = Some(target);
        Ok(())
    }

    pub fn target(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view = view;
        self.matrix_state = MatrixState::Dirty;
    }

    /// Set the projection and derive the view-space near and far
    /// distances by unprojecting the NDC depth extremes.
    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection = projection;
        self.matrix_state = MatrixState::Dirty;

        let inverse = projection.inverse();
        let unproject_depth = |ndc_z: f32| {
            let p = inverse * Vec4::new(0.0, 0.0, ndc_z, 1.0);
            if p.w != 0.0 {
                -p.z / p.w
            } else {
                0.0
            }
        };
        self.near = unproject_depth(-1.0);
        self.far = unproject_depth(1.0);
    }

    pub fn near_clip(&self) -> f32 {
        self.near
    }

    pub fn far_clip(&self) -> f32 {
        self.far
    }

    /// Reset the depth buffer to the far plane.
    pub fn clear_depth(&mut self) -> Result<(), RasterError> {
        let target = self.target.as_mut().ok_or(RasterError::NoRenderTarget)?;
        target.clear_depth();
        Ok(())
    }

    /// Fill a color buffer with one color.
    pub fn clear_color(&self, color: &mut ColorTarget<'_>, value: u32) {
        color.clear(value);
    }

    /// Render every mesh of `model` into `color` and the depth buffer.
    ///
    /// The model is mutable because each mesh carries its clip-space
    /// scratch batch, refilled here from the cached view-projection.
    pub fn render(&mut self, model: &mut Model, color: &mut ColorTarget<'_>) -> Result<(), RasterError> {
        if self.matrix_state == MatrixState::Dirty {
            self.view_projection = self.projection * self.view;
            self.matrix_state = MatrixState::Clean;
        }
        let vp = self.view_projection;
        let (near, far) = (self.near, self.far);
        let simd = if self.config.block_fill_simd {
            self.simd
        } else {
            SimdMode::Scalar
        };

        let target = self.target.as_mut().ok_or(RasterError::NoRenderTarget)?;
        let config = &self.config;
        let width = target.width();
        let height = target.height();
        debug_assert_eq!(color.width, width);
        debug_assert_eq!(color.height, height);

        let half_w = width as f32 * 0.5;
        let half_h = height as f32 * 0.5;
        let (depth, outline) = target.parts_mut();

        let mut meshes_skipped = 0usize;
        let mut triangles_drawn = 0usize;

        let textures = &model.textures;
        for mesh in &mut model.meshes {
            let needs_clip = if config.aabb_frustum_check {
                match classify_aabb(&vp, mesh.aabb_min, mesh.aabb_max, near, far) {
                    FrustumResult::Outside => {
                        meshes_skipped += 1;
                        continue;
                    }
                    FrustumResult::Inside => false,
                    FrustumResult::Intersect => true,
                }
            } else {
                true
            };

            transform_positions(&vp, &mesh.positions, &mut mesh.clip_positions);

            for submesh in &mesh.submeshes {
                let texture = submesh.texture.and_then(|slot| textures.get(slot));

                for tri in submesh.triangle_offset..submesh.triangle_offset + submesh.triangle_count
                {
                    let indices = mesh.triangle_indices(tri);

                    let mut poly = [ClipVertex::default(); MAX_CLIP_VERTS];
                    let mut scratch = [ClipVertex::default(); MAX_CLIP_VERTS];
                    for (slot, &vi) in poly.iter_mut().zip(indices.iter()) {
                        *slot = ClipVertex {
                            pos: mesh.clip_positions.get(vi),
                            u: mesh.texcoords.x[vi],
                            v: mesh.texcoords.y[vi],
                        };
                    }
                    let mut count = 3;

                    // Near clip in homogeneous w, before any divide.
                    if config.clip_w && needs_clip {
                        count =
                            clip_polygon(&poly[..count], &mut scratch, ClipAxis::W, -1.0, -near);
                        std::mem::swap(&mut poly, &mut scratch);
                        if count < 3 {
                            continue;
                        }
                    }

                    // Perspective divide. The reciprocal w, which is the
                    // reciprocal of view depth, replaces the w slot, and
                    // the texture coordinates are premultiplied by it so
                    // they interpolate linearly in screen space.
                    for vertex in &mut poly[..count] {
                        let rw = 1.0 / vertex.pos.w;
                        vertex.pos.x *= rw;
                        vertex.pos.y *= rw;
                        vertex.pos.z *= rw;
                        vertex.pos.w = rw;
                        vertex.u *= rw;
                        vertex.v *= rw;
                    }

                    if config.backface_culling {
                        let a = poly[0].pos;
                        let b = poly[1].pos;
                        let c = poly[2].pos;
                        let cz = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
                        if (cz <= 0.0) != config.backface_invert {
                            continue;
                        }
                    }

                    // Guard-band clip against the screen borders and the
                    // far plane, all in NDC.
                    if config.clip_frustum && needs_clip {
                        let limit_x = 1.0 - config.clip_border_dist / half_w;
                        let limit_y = 1.0 - config.clip_border_dist / half_h;
                        let planes = [
                            (ClipAxis::X, -1.0, limit_x),
                            (ClipAxis::Y, -1.0, limit_y),
                            (ClipAxis::X, 1.0, limit_x),
                            (ClipAxis::Y, 1.0, limit_y),
                            (ClipAxis::Z, 1.0, 1.0),
                        ];
                        for (axis, sign, value) in planes {
                            count = clip_polygon(&poly[..count], &mut scratch, axis, sign, value);
                            std::mem::swap(&mut poly, &mut scratch);
                            if count < 3 {
                                break;
                            }
                        }
                        if count < 3 {
                            continue;
                        }
                    }

                    // Viewport warp. NDC y points up, rows grow downward.
                    let mut screen = [ScreenVertex::default(); MAX_CLIP_VERTS];
                    let mut min_y = f32::MAX;
                    let mut max_y = f32::MIN;
                    for (slot, vertex) in screen.iter_mut().zip(&poly[..count]) {
                        *slot = ScreenVertex {
                            x: vertex.pos.x * half_w + half_w,
                            y: -vertex.pos.y * half_h + half_h,
                            z: vertex.pos.w,
                            u: vertex.u,
                            v: vertex.v,
                        };
                        min_y = min_y.min(slot.y);
                        max_y = max_y.max(slot.y);
                    }

                    let min_row = (min_y.floor() as i32 + 1).max(0);
                    let max_row = (max_y.floor() as i32).min(height as i32 - 1);
                    if min_row > max_row {
                        continue;
                    }

                    if !config.fill_outlines {
                        continue;
                    }
                    for i in 0..count {
                        outline.walk_edge(&screen[i], &screen[(i + 1) % count]);
                    }

                    if config.rasterize {
                        if config.block_fill {
                            outline.fill_halo(min_row, max_row);
                            fill_rows_blocks(
                                depth, outline, color, width, min_row, max_row, config, texture,
                                simd, (near, far),
                            );
                        } else {
                            fill_rows_scalar(
                                depth, outline, color, width, min_row, max_row, config, texture,
                                (near, far),
                            );
                        }
                        triangles_drawn += 1;
                    }

                    outline.reset_rows(min_row, max_row);
                }
            }
        }

        log::trace!(
            "frame: {} triangles drawn, {} meshes culled",
            triangles_drawn,
            meshes_skipped
        );
        Ok(())
    }
}
