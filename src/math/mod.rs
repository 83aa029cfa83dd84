//! Structure-of-arrays vertex batches and the batched clip-space transform.
//!
//! Mesh geometry is stored SoA (one array per component) so the per-frame
//! view-projection transform can run over whole position arrays at once,
//! with an SSE2 fast path and a scalar fallback.

use glam::{Mat4, Vec3, Vec4};

#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

/// SoA batch of 2D vectors (texture coordinates).
#[derive(Clone, Debug, Default)]
pub struct SoaVec2 {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
}

impl SoaVec2 {
    pub fn with_len(len: usize) -> Self {
        Self {
            x: vec![0.0; len],
            y: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn from_vecs(points: &[glam::Vec2]) -> Self {
        Self {
            x: points.iter().map(|p| p.x).collect(),
            y: points.iter().map(|p| p.y).collect(),
        }
    }
}

/// SoA batch of 3D vectors (positions, normals).
#[derive(Clone, Debug, Default)]
pub struct SoaVec3 {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
}

impl SoaVec3 {
    pub fn with_len(len: usize) -> Self {
        Self {
            x: vec![0.0; len],
            y: vec![0.0; len],
            z: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn from_vecs(points: &[Vec3]) -> Self {
        Self {
            x: points.iter().map(|p| p.x).collect(),
            y: points.iter().map(|p| p.y).collect(),
            z: points.iter().map(|p| p.z).collect(),
        }
    }

    pub fn get(&self, i: usize) -> Vec3 {
        Vec3::new(self.x[i], self.y[i], self.z[i])
    }

    /// Min/max reduction over all points. Returns `None` for an empty batch.
    pub fn aabb(&self) -> Option<(Vec3, Vec3)> {
        if self.is_empty() {
            return None;
        }
        let mut min = self.get(0);
        let mut max = min;
        for i in 1..self.len() {
            let p = self.get(i);
            min = min.min(p);
            max = max.max(p);
        }
        Some((min, max))
    }
}

/// SoA batch of homogeneous 4D vectors (clip-space positions).
#[derive(Clone, Debug, Default)]
pub struct SoaVec4 {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub w: Vec<f32>,
}

impl SoaVec4 {
    pub fn with_len(len: usize) -> Self {
        Self {
            x: vec![0.0; len],
            y: vec![0.0; len],
            z: vec![0.0; len],
            w: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn get(&self, i: usize) -> Vec4 {
        Vec4::new(self.x[i], self.y[i], self.z[i], self.w[i])
    }
}

/// Batch size for the SSE2 transform path (4 f32 lanes).
const SIMD_BATCH_SIZE: usize = 4;

/// Transform a batch of w=1 positions by `matrix`, writing clip-space
/// x/y/z/w into `output`. Picks the SSE2 path when available.
#[inline]
pub fn transform_positions(matrix: &Mat4, positions: &SoaVec3, output: &mut SoaVec4) {
    debug_assert_eq!(
        positions.len(),
        output.len(),
        "output batch must match position count"
    );

    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("sse2") {
            unsafe {
                transform_positions_sse2(matrix, positions, output);
            }
            return;
        }
    }

    transform_positions_scalar(matrix, positions, output);
}

#[inline]
fn transform_positions_scalar(matrix: &Mat4, positions: &SoaVec3, output: &mut SoaVec4) {
    for i in 0..positions.len() {
        let clip = *matrix * positions.get(i).extend(1.0);
        output.x[i] = clip.x;
        output.y[i] = clip.y;
        output.z[i] = clip.z;
        output.w[i] = clip.w;
    }
}

/// SSE2 transform: 4 positions per iteration. The matrix columns are
/// broadcast once and reused across the whole batch.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn transform_positions_sse2(matrix: &Mat4, positions: &SoaVec3, output: &mut SoaVec4) {
    let len = positions.len();
    let batch_count = len / SIMD_BATCH_SIZE;
    let remainder = len % SIMD_BATCH_SIZE;

    let c0 = matrix.x_axis;
    let c1 = matrix.y_axis;
    let c2 = matrix.z_axis;
    let c3 = matrix.w_axis;

    let m0_x = _mm_set1_ps(c0.x);
    let m0_y = _mm_set1_ps(c0.y);
    let m0_z = _mm_set1_ps(c0.z);
    let m0_w = _mm_set1_ps(c0.w);

    let m1_x = _mm_set1_ps(c1.x);
    let m1_y = _mm_set1_ps(c1.y);
    let m1_z = _mm_set1_ps(c1.z);
    let m1_w = _mm_set1_ps(c1.w);

    let m2_x = _mm_set1_ps(c2.x);
    let m2_y = _mm_set1_ps(c2.y);
    let m2_z = _mm_set1_ps(c2.z);
    let m2_w = _mm_set1_ps(c2.w);

    let m3_x = _mm_set1_ps(c3.x);
    let m3_y = _mm_set1_ps(c3.y);
    let m3_z = _mm_set1_ps(c3.z);
    let m3_w = _mm_set1_ps(c3.w);

    for batch_idx in 0..batch_count {
        let base = batch_idx * SIMD_BATCH_SIZE;

        let px = _mm_loadu_ps(positions.x.as_ptr().add(base));
        let py = _mm_loadu_ps(positions.y.as_ptr().add(base));
        let pz = _mm_loadu_ps(positions.z.as_ptr().add(base));

        // out.x = m0.x * x + m1.x * y + m2.x * z + m3.x
        let out_x = _mm_add_ps(
            _mm_add_ps(_mm_mul_ps(m0_x, px), _mm_mul_ps(m1_x, py)),
            _mm_add_ps(_mm_mul_ps(m2_x, pz), m3_x),
        );
        let out_y = _mm_add_ps(
            _mm_add_ps(_mm_mul_ps(m0_y, px), _mm_mul_ps(m1_y, py)),
            _mm_add_ps(_mm_mul_ps(m2_y, pz), m3_y),
        );
        let out_z = _mm_add_ps(
            _mm_add_ps(_mm_mul_ps(m0_z, px), _mm_mul_ps(m1_z, py)),
            _mm_add_ps(_mm_mul_ps(m2_z, pz), m3_z),
        );
        let out_w = _mm_add_ps(
            _mm_add_ps(_mm_mul_ps(m0_w, px), _mm_mul_ps(m1_w, py)),
            _mm_add_ps(_mm_mul_ps(m2_w, pz), m3_w),
        );

        _mm_storeu_ps(output.x.as_mut_ptr().add(base), out_x);
        _mm_storeu_ps(output.y.as_mut_ptr().add(base), out_y);
        _mm_storeu_ps(output.z.as_mut_ptr().add(base), out_z);
        _mm_storeu_ps(output.w.as_mut_ptr().add(base), out_w);
    }

    if remainder > 0 {
        let base = batch_count * SIMD_BATCH_SIZE;
        for i in base..base + remainder {
            let clip = *matrix * positions.get(i).extend(1.0);
            output.x[i] = clip.x;
            output.y[i] = clip.y;
            output.z[i] = clip.z;
            output.w[i] = clip.w;
        }
    }
}

/// Expand an AABB into its 8 corners, in -/-/- .. +/+/+ order.
pub fn aabb_corners(min: Vec3, max: Vec3) -> SoaVec3 {
    SoaVec3 {
        x: vec![min.x, min.x, min.x, min.x, max.x, max.x, max.x, max.x],
        y: vec![min.y, min.y, max.y, max.y, min.y, min.y, max.y, max.y],
        z: vec![min.z, max.z, min.z, max.z, min.z, max.z, min.z, max.z],
    }
}
