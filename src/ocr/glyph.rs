use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::bits::{BitVec, Bitmap};

/// Largest raster a stored glyph may describe.
pub const MAX_GLYPH_AREA: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub x: usize,
    pub y: usize,
}

impl Location {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: usize, dy: usize) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphOrigin {
    Known,
    Learned,
}

/// Equality and hashing see only the pixel pattern, never the origin.
#[derive(Debug, Clone)]
pub struct Glyph {
    bitmap: Bitmap,
    origin: GlyphOrigin,
}

impl Glyph {
    pub(crate) fn from_bitmap(bitmap: Bitmap) -> Self {
        Self {
            bitmap,
            origin: GlyphOrigin::Learned,
        }
    }

    /// Rebuilds a glyph from the on-bit indices of its `width`-wide raster.
    /// The height is implied by the highest index. Returns `None` for a zero
    /// width, an empty index set, or an area above [`MAX_GLYPH_AREA`].
    pub fn from_bit_indices(width: usize, indices: &[usize]) -> Option<Self> {
        if width == 0 {
            return None;
        }
        let max = *indices.iter().max()?;
        let height = (max / width).checked_add(1)?;
        let area = width.checked_mul(height)?;
        if area > MAX_GLYPH_AREA {
            return None;
        }
        let mut bits = BitVec::new(area);
        for &index in indices {
            bits.set(index);
        }
        Some(Self::from_bitmap(Bitmap::from_bits(width, height, bits)))
    }

    pub fn with_origin(mut self, origin: GlyphOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn is_known(&self) -> bool {
        self.origin == GlyphOrigin::Known
    }

    pub fn width(&self) -> usize {
        self.bitmap.width()
    }

    pub fn height(&self) -> usize {
        self.bitmap.height()
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        self.bitmap.get(x, y)
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn on_indices(&self) -> Vec<usize> {
        self.bitmap.bits().ones().collect()
    }

    pub fn pixel_count(&self) -> usize {
        self.bitmap.count_on()
    }

    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width() + 1) * self.height());
        for y in 0..self.height() {
            for x in 0..self.width() {
                out.push(if self.get(x, y) { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

impl PartialEq for Glyph {
    fn eq(&self, other: &Self) -> bool {
        self.bitmap == other.bitmap
    }
}

impl Eq for Glyph {}

impl Hash for Glyph {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bitmap.hash(state);
    }
}
