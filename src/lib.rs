pub mod math;
pub mod model;
/// Scanline software rasterizer with perspective-correct texturing,
/// selectable texture memory layouts, and SIMD block span fill
pub mod rendering;

pub use model::{Mesh, Model, ModelError, Submesh};
pub use rendering::{
    ColorTarget, MipmapMode, RasterConfig, RasterError, Rasterizer, RenderMode, Texture,
    TextureError, TextureFilter, TextureLayout,
};
