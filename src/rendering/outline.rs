//! Per-row triangle outline table and the edge walk that fills it.
//!
//! For every screen row a triangle touches, the table records the span
//! extremes: leftmost and rightmost X, each with the reciprocal view
//! depth and premultiplied texture coordinates interpolated along the
//! edge. Span fill then only ever walks between the two recorded ends.
//!
//! The table carries one extra row above and below the screen so the
//! 2x2 block fill can read a neighbor row without bounds checks.

/// A projected vertex ready for the edge walk: screen-space x/y, the
/// reciprocal of view depth in `z`, and texture coordinates already
/// multiplied by `z` for perspective-correct interpolation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScreenVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub u: f32,
    pub v: f32,
}

/// Span record for one screen row.
#[derive(Clone, Copy, Debug)]
pub struct OutlineEntry {
    pub occupied: bool,
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub min_u: f32,
    pub min_v: f32,
    pub max_z: f32,
    pub max_u: f32,
    pub max_v: f32,
}

impl Default for OutlineEntry {
    fn default() -> Self {
        Self::empty(0.0)
    }
}

impl OutlineEntry {
    fn empty(width: f32) -> Self {
        Self {
            occupied: false,
            min_x: width,
            max_x: 0.0,
            min_z: 0.0,
            min_u: 0.0,
            min_v: 0.0,
            max_z: 0.0,
            max_u: 0.0,
            max_v: 0.0,
        }
    }
}

/// Outline entries for every screen row plus a one-row halo on each side.
#[derive(Clone, Debug)]
pub struct OutlineTable {
    entries: Vec<OutlineEntry>,
    width: f32,
    height: i32,
}

impl OutlineTable {
    pub fn new(width: usize, height: usize) -> Self {
        Self::from_storage(vec![OutlineEntry::default(); height + 2], width, height)
    }

    /// Wrap pre-allocated storage of `height + 2` entries, resetting
    /// every entry to empty.
    pub fn from_storage(mut entries: Vec<OutlineEntry>, width: usize, height: usize) -> Self {
        debug_assert_eq!(entries.len(), height + 2);
        entries.fill(OutlineEntry::empty(width as f32));
        Self {
            entries,
            width: width as f32,
            height: height as i32,
        }
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Entry for `row`; rows -1 and `height` address the halo.
    #[inline]
    pub fn entry(&self, row: i32) -> &OutlineEntry {
        &self.entries[(row + 1) as usize]
    }

    #[inline]
    pub fn entry_mut(&mut self, row: i32) -> &mut OutlineEntry {
        &mut self.entries[(row + 1) as usize]
    }

    /// Walk one triangle edge and fold its per-row samples into the
    /// table. Each crossed row keeps its leftmost and rightmost X seen
    /// so far, together with the interpolants at that X.
    ///
    /// Rows are the integer centers strictly between the two endpoint
    /// rows: `floor(y_low) + 1 ..= floor(y_high)`. Horizontal edges
    /// cross no row centers and contribute nothing.
    pub fn walk_edge(&mut self, a: &ScreenVertex, b: &ScreenVertex) {
        let (lo, hi) = if a.y <= b.y { (a, b) } else { (b, a) };

        let first_row = lo.y.floor() as i32 + 1;
        let last_row = hi.y.floor() as i32;
        if first_row > last_row {
            return;
        }

        let inv_dy = 1.0 / (hi.y - lo.y);
        let dx = (hi.x - lo.x) * inv_dy;
        let dz = (hi.z - lo.z) * inv_dy;
        let du = (hi.u - lo.u) * inv_dy;
        let dv = (hi.v - lo.v) * inv_dy;

        // Snap the start to the first crossed row center.
        let pre = first_row as f32 - lo.y;
        let x0 = lo.x + dx * pre;
        let z0 = lo.z + dz * pre;
        let u0 = lo.u + du * pre;
        let v0 = lo.v + dv * pre;

        let row_lo = first_row.max(0);
        let row_hi = last_row.min(self.height - 1);

        for row in row_lo..=row_hi {
            let step = (row - first_row) as f32;
            let x = x0 + dx * step;
            let z = z0 + dz * step;
            let u = u0 + du * step;
            let v = v0 + dv * step;

            let entry = self.entry_mut(row);
            if x < entry.min_x || !entry.occupied {
                entry.min_x = x;
                entry.min_z = z;
                entry.min_u = u;
                entry.min_v = v;
            }
            if x > entry.max_x || !entry.occupied {
                entry.max_x = x;
                entry.max_z = z;
                entry.max_u = u;
                entry.max_v = v;
            }
            entry.occupied = true;
        }
    }

    /// Prepare the halo rows around a filled triangle: copy the nearest
    /// real row so interpolants stay meaningful, then empty the X extent
    /// so the halo never produces pixels of its own.
    pub fn fill_halo(&mut self, min_row: i32, max_row: i32) {
        let width = self.width;
        for (halo, source) in [(min_row - 1, min_row), (max_row + 1, max_row)] {
            let mut copy = *self.entry(source);
            copy.min_x = width;
            copy.max_x = 0.0;
            *self.entry_mut(halo) = copy;
        }
    }

    /// Reset the rows a triangle touched, halo included, back to empty.
    pub fn reset_rows(&mut self, min_row: i32, max_row: i32) {
        let width = self.width;
        for row in (min_row - 1).max(-1)..=(max_row + 1).min(self.height) {
            *self.entry_mut(row) = OutlineEntry::empty(width);
        }
    }
}
