//! Render target buffers and the allocator seam behind them.
//!
//! A render target owns the depth buffer and the outline table; the
//! color buffer is borrowed from the caller each frame. Both owned
//! buffers come from a [`BufferAllocator`], so allocation failure is an
//! error the caller sees instead of an abort.

use std::collections::TryReserveError;

#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use super::outline::{OutlineEntry, OutlineTable};

/// Fallible buffer allocation. The default implementation goes through
/// `try_reserve_exact`; embedders with pooled or capped memory can
/// substitute their own.
pub trait BufferAllocator {
    fn alloc_f32(&self, len: usize) -> Result<Vec<f32>, TryReserveError>;
    fn alloc_outline(&self, len: usize) -> Result<Vec<OutlineEntry>, TryReserveError>;
}

/// Plain heap allocation via `try_reserve_exact`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    fn alloc_f32(&self, len: usize) -> Result<Vec<f32>, TryReserveError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)?;
        buf.resize(len, 0.0);
        Ok(buf)
    }

    fn alloc_outline(&self, len: usize) -> Result<Vec<OutlineEntry>, TryReserveError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)?;
        buf.resize(len, OutlineEntry::default());
        Ok(buf)
    }
}

/// Depth buffer plus outline table for one target size.
///
/// The depth buffer stores reciprocal view depth: larger values are
/// closer, and a cleared buffer is all zeros (infinitely far).
#[derive(Debug)]
pub struct RenderTarget {
    width: usize,
    height: usize,
    depth: Vec<f32>,
    outline: OutlineTable,
}

impl RenderTarget {
    /// Allocate both buffers for a `width` x `height` target. Odd
    /// dimensions are rounded down to keep 2x2 block alignment.
    pub fn create(
        width: usize,
        height: usize,
        allocator: &dyn BufferAllocator,
    ) -> Result<Self, TryReserveError> {
        let width = width & !1;
        let height = height & !1;
        let depth = allocator.alloc_f32(width * height)?;
        let entries = allocator.alloc_outline(height + 2)?;
        let outline = OutlineTable::from_storage(entries, width, height);
        Ok(Self {
            width,
            height,
            depth,
            outline,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    pub fn depth_mut(&mut self) -> &mut [f32] {
        &mut self.depth
    }

    pub fn outline(&self) -> &OutlineTable {
        &self.outline
    }

    pub fn outline_mut(&mut self) -> &mut OutlineTable {
        &mut self.outline
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [f32], &mut OutlineTable) {
        (&mut self.depth, &mut self.outline)
    }

    /// Reset every depth value to the far plane (zero reciprocal depth).
    pub fn clear_depth(&mut self) {
        fill_f32(&mut self.depth, 0.0);
    }
}

/// A caller-owned color buffer the rasterizer writes into, row-major
/// with row 0 at the top, packed 0xAARRGGBB.
pub struct ColorTarget<'a> {
    pub pixels: &'a mut [u32],
    pub width: usize,
    pub height: usize,
}

impl<'a> ColorTarget<'a> {
    pub fn new(pixels: &'a mut [u32], width: usize, height: usize) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Fill the whole buffer with one color.
    pub fn clear(&mut self, color: u32) {
        fill_u32(self.pixels, color);
    }
}

/// Fill an f32 slice, 4 lanes at a time where SSE2 is available.
fn fill_f32(buf: &mut [f32], value: f32) {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("sse2") {
            unsafe {
                fill_f32_sse2(buf, value);
            }
            return;
        }
    }
    buf.fill(value);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn fill_f32_sse2(buf: &mut [f32], value: f32) {
    let v = _mm_set1_ps(value);
    let chunks = buf.len() / 4;
    let ptr = buf.as_mut_ptr();
    for i in 0..chunks {
        _mm_storeu_ps(ptr.add(i * 4), v);
    }
    for slot in &mut buf[chunks * 4..] {
        *slot = value;
    }
}

/// Fill a u32 slice, 4 lanes at a time where SSE2 is available.
fn fill_u32(buf: &mut [u32], value: u32) {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("sse2") {
            unsafe {
                fill_u32_sse2(buf, value);
            }
            return;
        }
    }
    buf.fill(value);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn fill_u32_sse2(buf: &mut [u32], value: u32) {
    let v = _mm_set1_epi32(value as i32);
    let chunks = buf.len() / 4;
    let ptr = buf.as_mut_ptr();
    for i in 0..chunks {
        _mm_storeu_si128(ptr.add(i * 4) as *mut __m128i, v);
    }
    for slot in &mut buf[chunks * 4..] {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rounds_odd_dimensions_down() {
        let target = RenderTarget::create(101, 77, &HeapAllocator).unwrap();
        assert_eq!(target.width(), 100);
        assert_eq!(target.height(), 76);
        assert_eq!(target.depth().len(), 100 * 76);
    }

    #[test]
    fn clear_depth_writes_zero_everywhere() {
        let mut target = RenderTarget::create(34, 18, &HeapAllocator).unwrap();
        target.depth_mut().fill(5.0);
        target.clear_depth();
        assert!(target.depth().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn color_clear_covers_non_multiple_of_four_lengths() {
        let mut pixels = vec![0u32; 10 * 7];
        // Width 10, height 7: tail of the buffer is not a 4-lane multiple.
        let mut target = ColorTarget::new(&mut pixels, 10, 7);
        target.clear(0xff123456);
        assert!(pixels.iter().all(|&p| p == 0xff123456));
    }

    struct FailingAllocator;
    impl BufferAllocator for FailingAllocator {
        fn alloc_f32(&self, _len: usize) -> Result<Vec<f32>, TryReserveError> {
            let mut v: Vec<f32> = Vec::new();
            v.try_reserve_exact(usize::MAX).map(|_| Vec::new())
        }
        fn alloc_outline(&self, _len: usize) -> Result<Vec<OutlineEntry>, TryReserveError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn allocation_failure_propagates() {
        assert!(RenderTarget::create(64, 64, &FailingAllocator).is_err());
    }
}
