//! Mip-mapped textures with selectable memory layouts.
//!
//! A texture owns a full mip chain down to 1x1, stored in one of three
//! layouts: plain row-major, 4x4 tiles, or Morton (Z-order) swizzle.
//! The layout is baked at build time; sampling computes the matching
//! texel address. Pixels are packed 0xAARRGGBB.

use thiserror::Error;

use super::config::{TextureFilter, TextureLayout};

/// Largest accepted texture edge. Morton addressing interleaves 16-bit
/// coordinates, so anything wider cannot be swizzled.
pub const MAX_TEXTURE_SIZE: u32 = 65535;

/// Spread nibble for Morton addressing: bit i of the input lands at
/// bit 2*i of the output.
const MORTON_LUT: [u32; 16] = [
    0x00, 0x01, 0x04, 0x05, 0x10, 0x11, 0x14, 0x15, 0x40, 0x41, 0x44, 0x45, 0x50, 0x51, 0x54,
    0x55,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextureError {
    #[error("texture must be square, got {width}x{height}")]
    NotSquare { width: u32, height: u32 },
    #[error("texture edge {0} is not a power of two")]
    NotPowerOfTwo(u32),
    #[error("texture edge {0} exceeds the maximum of {MAX_TEXTURE_SIZE}")]
    TooLarge(u32),
}

/// One mip level: edge length plus pixel data in the texture's layout.
#[derive(Clone, Debug)]
struct MipLevel {
    size: u32,
    pixels: Vec<u32>,
}

/// A square power-of-two texture with a complete mip chain.
#[derive(Clone, Debug)]
pub struct Texture {
    layout: TextureLayout,
    mips: Vec<MipLevel>,
}

/// Storage slot count for one mip in `layout`. Tiled mips round the edge
/// up to whole 4x4 tiles so sub-tile mips still get full tiles.
fn mip_slot_count(size: u32, layout: TextureLayout) -> usize {
    match layout {
        TextureLayout::Linear | TextureLayout::Swizzled => (size * size) as usize,
        TextureLayout::Tiled4x4 => {
            let tiles = (size as usize + 3) / 4;
            tiles * tiles * 16
        }
    }
}

/// Texel address of (x, y) inside a mip of edge `size`.
#[inline]
fn texel_index(x: u32, y: u32, size: u32, layout: TextureLayout, use_lut: bool) -> usize {
    match layout {
        TextureLayout::Linear => (y * size + x) as usize,
        TextureLayout::Tiled4x4 => {
            let tile_cols = (size + 3) / 4;
            let tile = (y >> 2) * tile_cols + (x >> 2);
            (tile * 16 + ((y & 3) << 2 | (x & 3))) as usize
        }
        TextureLayout::Swizzled => {
            if use_lut {
                (spread_lut(x) | spread_lut(y) << 1) as usize
            } else {
                (spread_bits(x) | spread_bits(y) << 1) as usize
            }
        }
    }
}

/// Spread a 16-bit coordinate nibble by nibble through the lookup table.
#[inline]
fn spread_lut(v: u32) -> u32 {
    MORTON_LUT[(v & 0xf) as usize]
        | MORTON_LUT[(v >> 4 & 0xf) as usize] << 8
        | MORTON_LUT[(v >> 8 & 0xf) as usize] << 16
        | MORTON_LUT[(v >> 12 & 0xf) as usize] << 24
}

/// Interleave zeros between the low 16 bits of `v`.
#[inline]
fn spread_bits(v: u32) -> u32 {
    let mut v = v & 0xffff;
    v = (v | v << 8) & 0x00ff00ff;
    v = (v | v << 4) & 0x0f0f0f0f;
    v = (v | v << 2) & 0x33333333;
    (v | v << 1) & 0x55555555
}

impl Texture {
    /// Build a texture from row-major 0xAARRGGBB pixels, generating the
    /// mip chain with a 2x2 box filter and storing it in `layout`.
    pub fn from_pixels(
        pixels: &[u32],
        width: u32,
        height: u32,
        layout: TextureLayout,
    ) -> Result<Self, TextureError> {
        if width != height {
            return Err(TextureError::NotSquare { width, height });
        }
        if width == 0 || !width.is_power_of_two() {
            return Err(TextureError::NotPowerOfTwo(width));
        }
        if width > MAX_TEXTURE_SIZE {
            return Err(TextureError::TooLarge(width));
        }
        debug_assert_eq!(pixels.len(), (width * height) as usize);

        let mut linear_mips: Vec<Vec<u32>> = vec![pixels.to_vec()];
        let mut size = width;
        while size > 1 {
            let next = downsample(linear_mips.last().map(|m| m.as_slice()).unwrap_or(&[]), size);
            linear_mips.push(next);
            size /= 2;
        }

        let mut mips = Vec::with_capacity(linear_mips.len());
        let mut size = width;
        for linear in &linear_mips {
            let mut data = vec![0u32; mip_slot_count(size, layout)];
            for y in 0..size {
                for x in 0..size {
                    data[texel_index(x, y, size, layout, false)] =
                        linear[(y * size + x) as usize];
                }
            }
            mips.push(MipLevel { size, pixels: data });
            size /= 2;
        }

        Ok(Self { layout, mips })
    }

    pub fn layout(&self) -> TextureLayout {
        self.layout
    }

    /// Edge length of mip 0.
    pub fn size(&self) -> u32 {
        self.mips[0].size
    }

    pub fn mip_count(&self) -> usize {
        self.mips.len()
    }

    /// Edge length of mip `level`.
    pub fn mip_size(&self, level: usize) -> u32 {
        self.mips[level].size
    }

    /// Fetch the texel at integer coordinates, wrapping out-of-range
    /// coordinates by the mip edge.
    #[inline]
    pub fn fetch(&self, level: usize, x: i32, y: i32, use_lut: bool) -> u32 {
        let mip = &self.mips[level];
        let mask = mip.size as i32 - 1;
        let x = (x & mask) as u32;
        let y = (y & mask) as u32;
        mip.pixels[texel_index(x, y, mip.size, self.layout, use_lut)]
    }

    /// Sample one mip at texel-space coordinates. Bilinear blends the
    /// 2x2 neighborhood with 16.16 fixed-point weights.
    #[inline]
    pub fn sample(
        &self,
        level: usize,
        tx: f32,
        ty: f32,
        filter: TextureFilter,
        use_lut: bool,
    ) -> u32 {
        match filter {
            TextureFilter::Point => self.fetch(level, tx as i32, ty as i32, use_lut),
            TextureFilter::Bilinear => {
                let fx = (tx * 65536.0) as i64;
                let fy = (ty * 65536.0) as i64;
                let x0 = (fx >> 16) as i32;
                let y0 = (fy >> 16) as i32;
                let wx = (fx & 0xffff) as u32;
                let wy = (fy & 0xffff) as u32;

                let c00 = self.fetch(level, x0, y0, use_lut);
                let c10 = self.fetch(level, x0 + 1, y0, use_lut);
                let c01 = self.fetch(level, x0, y0 + 1, use_lut);
                let c11 = self.fetch(level, x0 + 1, y0 + 1, use_lut);

                let top = lerp_color(c00, c10, wx);
                let bottom = lerp_color(c01, c11, wx);
                lerp_color(top, bottom, wy)
            }
        }
    }
}

/// Per-channel 16.16 fixed-point lerp of two packed colors.
#[inline]
pub(crate) fn lerp_color(a: u32, b: u32, weight: u32) -> u32 {
    let inv = 65536 - weight;
    let mut out = 0u32;
    for shift in [0u32, 8, 16, 24] {
        let ca = (a >> shift) & 0xff;
        let cb = (b >> shift) & 0xff;
        let c = (ca * inv + cb * weight) >> 16;
        out |= c << shift;
    }
    out
}

/// Box-filter a `size`-edge row-major mip down to `size / 2`.
fn downsample(src: &[u32], size: u32) -> Vec<u32> {
    let half = (size / 2).max(1);
    let mut dst = vec![0u32; (half * half) as usize];
    for y in 0..half {
        for x in 0..half {
            let i00 = (y * 2 * size + x * 2) as usize;
            let i10 = i00 + 1;
            let i01 = i00 + size as usize;
            let i11 = i01 + 1;
            let mut avg = 0u32;
            for shift in [0u32, 8, 16, 24] {
                let sum = ((src[i00] >> shift) & 0xff)
                    + ((src[i10] >> shift) & 0xff)
                    + ((src[i01] >> shift) & 0xff)
                    + ((src[i11] >> shift) & 0xff);
                avg |= (sum >> 2) << shift;
            }
            dst[(y * half + x) as usize] = avg;
        }
    }
    dst
}
