//! Homogeneous-space polygon clipping and AABB frustum classification.
//!
//! Triangles are clipped against one half-space at a time with the
//! Sutherland-Hodgman walk: the near plane in homogeneous w before the
//! perspective divide, then the four screen borders and the far plane in
//! normalized device coordinates. Each clip can grow the polygon by one
//! vertex, so scratch buffers hold up to [`MAX_CLIP_VERTS`] entries.

use glam::{Mat4, Vec3, Vec4};

/// Triangle plus six clips, one extra vertex each, rounded up.
pub const MAX_CLIP_VERTS: usize = 8;

/// Component the half-space test reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipAxis {
    X,
    Y,
    Z,
    W,
}

/// One polygon vertex as it moves through the clip stages: homogeneous
/// position plus the texture coordinate interpolated alongside it.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClipVertex {
    pub pos: Vec4,
    pub u: f32,
    pub v: f32,
}

impl ClipVertex {
    #[inline]
    fn component(&self, axis: ClipAxis) -> f32 {
        match axis {
            ClipAxis::X => self.pos.x,
            ClipAxis::Y => self.pos.y,
            ClipAxis::Z => self.pos.z,
            ClipAxis::W => self.pos.w,
        }
    }

    #[inline]
    fn lerp(&self, other: &ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            pos: self.pos + (other.pos - self.pos) * t,
            u: self.u + (other.u - self.u) * t,
            v: self.v + (other.v - self.v) * t,
        }
    }
}

/// Clip `input` against the half-space `sign * component(axis) <= value`,
/// writing surviving vertices into `output` and returning the count.
///
/// A vertex is inside when `value - sign * component >= 0`. Edges that
/// cross the plane emit the intersection point with all attributes
/// interpolated.
pub fn clip_polygon(
    input: &[ClipVertex],
    output: &mut [ClipVertex; MAX_CLIP_VERTS],
    axis: ClipAxis,
    sign: f32,
    value: f32,
) -> usize {
    let mut count = 0;
    for i in 0..input.len() {
        let current = &input[i];
        let next = &input[(i + 1) % input.len()];
        let d_current = value - sign * current.component(axis);
        let d_next = value - sign * next.component(axis);

        if d_current >= 0.0 {
            output[count] = *current;
            count += 1;
        }
        if (d_current >= 0.0) != (d_next >= 0.0) {
            let t = d_current / (d_current - d_next);
            output[count] = current.lerp(next, t);
            count += 1;
        }
    }
    count
}

/// Result of classifying a bounding box against the view frustum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrustumResult {
    /// Every corner inside: rasterize with per-triangle clipping off.
    Inside,
    /// Every corner beyond one shared plane: skip the mesh entirely.
    Outside,
    /// Straddles a plane: rasterize with full clipping.
    Intersect,
}

const OUT_LEFT: u32 = 1 << 0;
const OUT_RIGHT: u32 = 1 << 1;
const OUT_BOTTOM: u32 = 1 << 2;
const OUT_TOP: u32 = 1 << 3;
const OUT_NEAR: u32 = 1 << 4;
const OUT_FAR: u32 = 1 << 5;
const OUT_W_NEAR: u32 = 1 << 6;
const OUT_W_FAR: u32 = 1 << 7;

/// Classify an object-space AABB against the frustum of `view_projection`.
///
/// The eight corners are transformed, outcoded against the NDC cube and
/// the view-depth range, then combined: a corner inside every plane
/// clears its outcode, and a plane shared by all eight corners proves
/// the box lies fully outside.
pub fn classify_aabb(
    view_projection: &Mat4,
    min: Vec3,
    max: Vec3,
    near: f32,
    far: f32,
) -> FrustumResult {
    let mut shared = !0u32;
    let mut combined = 0u32;

    for i in 0..8 {
        let corner = Vec3::new(
            if i & 4 != 0 { max.x } else { min.x },
            if i & 2 != 0 { max.y } else { min.y },
            if i & 1 != 0 { max.z } else { min.z },
        );
        let clip = *view_projection * corner.extend(1.0);
        let inv_w = 1.0 / clip.w;
        let ndc = clip.truncate() * inv_w;

        let mut code = 0u32;
        if ndc.x < -1.0 {
            code |= OUT_LEFT;
        }
        if ndc.x > 1.0 {
            code |= OUT_RIGHT;
        }
        if ndc.y < -1.0 {
            code |= OUT_BOTTOM;
        }
        if ndc.y > 1.0 {
            code |= OUT_TOP;
        }
        if ndc.z < -1.0 {
            code |= OUT_NEAR;
        }
        if ndc.z > 1.0 {
            code |= OUT_FAR;
        }
        if clip.w < near {
            code |= OUT_W_NEAR;
        }
        if clip.w > far {
            code |= OUT_W_FAR;
        }

        shared &= code;
        combined |= code;
    }

    if combined == 0 {
        FrustumResult::Inside
    } else if shared != 0 {
        FrustumResult::Outside
    } else {
        FrustumResult::Intersect
    }
}
