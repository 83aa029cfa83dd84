//! Mesh and model containers.
//!
//! Vertex data is stored SoA per mesh so the whole position array can be
//! pushed through the batched clip-space transform in one call. Each mesh
//! also carries a clip-space scratch batch that the renderer fills once
//! per frame, and an object-space AABB used for frustum classification.

use glam::{Vec2, Vec3};
use thiserror::Error;

use crate::math::{SoaVec2, SoaVec3, SoaVec4};

/// A model whose attributes, indices, and submeshes disagree with each
/// other. Produced by [`Model::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("mesh {mesh}: index list length {len} is not a multiple of 3")]
    RaggedIndexList { mesh: usize, len: usize },
    #[error("mesh {mesh}: index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("mesh {mesh}: {attribute} has {len} entries for {vertex_count} vertices")]
    AttributeLengthMismatch {
        mesh: usize,
        attribute: &'static str,
        len: usize,
        vertex_count: usize,
    },
    #[error("mesh {mesh}: submesh {submesh} ends at triangle {end} of {triangle_count}")]
    SubmeshOutOfRange {
        mesh: usize,
        submesh: usize,
        end: usize,
        triangle_count: usize,
    },
    #[error("mesh {mesh}: submesh {submesh} references texture slot {slot} of {texture_count}")]
    TextureSlotOutOfRange {
        mesh: usize,
        submesh: usize,
        slot: usize,
        texture_count: usize,
    },
}

/// A range of triangles sharing one texture.
///
/// `texture` indexes into the owning [`Model`]'s texture list; `None`
/// renders as untextured flat color.
#[derive(Clone, Debug)]
pub struct Submesh {
    /// Index of the first triangle of this submesh.
    pub triangle_offset: usize,
    /// Number of triangles in this submesh.
    pub triangle_count: usize,
    /// Texture slot in the model, if any.
    pub texture: Option<usize>,
}

/// One mesh: SoA vertex attributes, an index list, and submesh ranges.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub positions: SoaVec3,
    pub texcoords: SoaVec2,
    /// Per-vertex normals. Carried for lighting passes outside this
    /// crate; the rasterizer itself never reads them. May be empty.
    pub normals: SoaVec3,
    /// Triangle list, three indices per triangle.
    pub indices: Vec<u32>,
    pub submeshes: Vec<Submesh>,
    /// Object-space bounds, kept in sync with `positions`.
    pub aabb_min: Vec3,
    pub aabb_max: Vec3,
    /// Clip-space positions, refilled by the renderer each frame.
    pub(crate) clip_positions: SoaVec4,
}

impl Mesh {
    /// Build a mesh from AoS vertex data. The AABB is computed here and
    /// the clip-space scratch is sized to match.
    pub fn new(
        positions: &[Vec3],
        texcoords: &[Vec2],
        indices: Vec<u32>,
        submeshes: Vec<Submesh>,
    ) -> Self {
        let soa_positions = SoaVec3::from_vecs(positions);
        let (aabb_min, aabb_max) = soa_positions.aabb().unwrap_or((Vec3::ZERO, Vec3::ZERO));
        let clip_positions = SoaVec4::with_len(soa_positions.len());
        Self {
            positions: soa_positions,
            texcoords: SoaVec2::from_vecs(texcoords),
            normals: SoaVec3::default(),
            indices,
            submeshes,
            aabb_min,
            aabb_max,
            clip_positions,
        }
    }

    /// Attach per-vertex normals.
    pub fn with_normals(mut self, normals: &[Vec3]) -> Self {
        self.normals = SoaVec3::from_vecs(normals);
        self
    }

    /// Single submesh covering every triangle in `indices`.
    pub fn single_submesh(
        positions: &[Vec3],
        texcoords: &[Vec2],
        indices: Vec<u32>,
        texture: Option<usize>,
    ) -> Self {
        let triangle_count = indices.len() / 3;
        Self::new(
            positions,
            texcoords,
            indices,
            vec![Submesh {
                triangle_offset: 0,
                triangle_count,
                texture,
            }],
        )
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Recompute the AABB after positions changed.
    pub fn update_aabb(&mut self) {
        let (min, max) = self.positions.aabb().unwrap_or((Vec3::ZERO, Vec3::ZERO));
        self.aabb_min = min;
        self.aabb_max = max;
        if self.clip_positions.len() != self.positions.len() {
            self.clip_positions = SoaVec4::with_len(self.positions.len());
        }
    }

    /// Indices of triangle `tri`, relative to the mesh index list.
    #[inline]
    pub(crate) fn triangle_indices(&self, tri: usize) -> [usize; 3] {
        let base = tri * 3;
        let out = [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ];
        debug_assert!(
            out.iter().all(|&vi| vi < self.positions.len()),
            "triangle {} indexes past {} vertices",
            tri,
            self.positions.len()
        );
        out
    }
}

/// A renderable model: meshes plus the textures their submeshes index.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub textures: Vec<crate::rendering::Texture>,
}

impl Model {
    pub fn new(meshes: Vec<Mesh>, textures: Vec<crate::rendering::Texture>) -> Self {
        Self { meshes, textures }
    }

    /// Check every mesh for internal consistency: index ranges,
    /// attribute lengths, submesh triangle ranges, and texture slots.
    /// Meant to run once after loading; the render loop itself only
    /// asserts in debug builds.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (mi, mesh) in self.meshes.iter().enumerate() {
            let vertex_count = mesh.positions.len();
            if mesh.indices.len() % 3 != 0 {
                return Err(ModelError::RaggedIndexList {
                    mesh: mi,
                    len: mesh.indices.len(),
                });
            }
            for &index in &mesh.indices {
                if index as usize >= vertex_count {
                    return Err(ModelError::IndexOutOfRange {
                        mesh: mi,
                        index,
                        vertex_count,
                    });
                }
            }
            if mesh.texcoords.len() != vertex_count {
                return Err(ModelError::AttributeLengthMismatch {
                    mesh: mi,
                    attribute: "texcoords",
                    len: mesh.texcoords.len(),
                    vertex_count,
                });
            }
            if !mesh.normals.is_empty() && mesh.normals.len() != vertex_count {
                return Err(ModelError::AttributeLengthMismatch {
                    mesh: mi,
                    attribute: "normals",
                    len: mesh.normals.len(),
                    vertex_count,
                });
            }
            let triangle_count = mesh.triangle_count();
            for (si, submesh) in mesh.submeshes.iter().enumerate() {
                let end = submesh.triangle_offset + submesh.triangle_count;
                if end > triangle_count {
                    return Err(ModelError::SubmeshOutOfRange {
                        mesh: mi,
                        submesh: si,
                        end,
                        triangle_count,
                    });
                }
                if let Some(slot) = submesh.texture {
                    if slot >= self.textures.len() {
                        return Err(ModelError::TextureSlotOutOfRange {
                            mesh: mi,
                            submesh: si,
                            slot,
                            texture_count: self.textures.len(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
