pub mod clip;
pub mod config;
pub mod fill;
pub mod outline;
/// Scanline rasterization pipeline
pub mod rasterizer;
pub mod target;
pub mod texture;

pub use clip::{classify_aabb, clip_polygon, ClipAxis, ClipVertex, FrustumResult, MAX_CLIP_VERTS};
pub use config::{MipmapMode, RasterConfig, RenderMode, TextureFilter, TextureLayout};
pub use fill::SimdMode;
pub use outline::{OutlineEntry, OutlineTable, ScreenVertex};
pub use rasterizer::{RasterError, Rasterizer};
pub use target::{BufferAllocator, ColorTarget, HeapAllocator, RenderTarget};
pub use texture::{Texture, TextureError, MAX_TEXTURE_SIZE};
