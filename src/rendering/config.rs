//! Runtime rasterizer configuration.
//!
//! Every stage of the pipeline can be toggled or switched at runtime; the
//! renderer reads this on each `render` call, so changes take effect on
//! the next frame without rebuilding anything.

/// How fragment colors are produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// Constant white.
    Flat,
    /// Interpolated UV as red/green.
    UvGradient,
    /// Reciprocal view depth as grayscale.
    Depth,
    /// Sample the submesh texture.
    Textured,
    /// False-color the selected mip level.
    MipLevel,
}

/// Memory layout of texture mip data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureLayout {
    /// Plain row-major.
    Linear,
    /// 4x4 pixel tiles, tiles in row-major order.
    Tiled4x4,
    /// Morton (Z-order) bit interleave of x and y.
    Swizzled,
}

/// Texture sampling filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFilter {
    /// Nearest texel.
    Point,
    /// 2x2 weighted blend.
    Bilinear,
}

/// Mip level selection policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MipmapMode {
    /// Always sample mip 0.
    None,
    /// Pick the nearest mip from the UV gradient.
    Nearest,
    /// Blend the two nearest mips.
    Trilinear,
}

/// All rasterizer switches and tuning values.
#[derive(Clone, Debug)]
pub struct RasterConfig {
    /// Drop triangles facing away from the camera.
    pub backface_culling: bool,
    /// Flip the winding considered front-facing.
    pub backface_invert: bool,
    /// Depth-test fragments against the depth buffer.
    pub depth_test: bool,
    /// Clip triangles against the near plane in homogeneous space.
    pub clip_w: bool,
    /// Clip triangles against the four screen borders and the far plane.
    pub clip_frustum: bool,
    /// Fill spans 2x2 pixels at a time instead of pixel-by-pixel.
    pub block_fill: bool,
    /// Use the SSE2 depth-mask path inside block fill when available.
    pub block_fill_simd: bool,
    /// Apply the ordered-dither offset to mip selection.
    pub texture_dithering: bool,
    /// Use the nibble lookup table for Morton address computation.
    pub swizzle_lut: bool,
    /// Classify each mesh AABB against the frustum before rasterizing.
    pub aabb_frustum_check: bool,
    /// Run the edge walk that builds the per-row outline table.
    pub fill_outlines: bool,
    /// Fill the outlined spans into the targets.
    pub rasterize: bool,

    pub render_mode: RenderMode,
    pub texture_filter: TextureFilter,
    pub mipmap_mode: MipmapMode,

    /// Constant added to the UV gradient before mip selection.
    pub lod_bias: f32,
    /// Multiplier on the UV gradient before mip selection.
    pub lod_scale: f32,
    /// Guard band inset from the screen border, in pixels.
    pub clip_border_dist: f32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            backface_culling: true,
            backface_invert: false,
            depth_test: true,
            clip_w: true,
            clip_frustum: true,
            block_fill: true,
            block_fill_simd: true,
            texture_dithering: true,
            swizzle_lut: true,
            aabb_frustum_check: true,
            fill_outlines: true,
            rasterize: true,
            render_mode: RenderMode::Textured,
            texture_filter: TextureFilter::Bilinear,
            mipmap_mode: MipmapMode::Nearest,
            lod_bias: 0.0,
            lod_scale: 1.0,
            clip_border_dist: 1.0,
        }
    }
}
