use std::fmt;

use anyhow::{anyhow, Result};

const WORD_BITS: usize = 64;

/// Fixed-length bit vector. Unused tail bits are always zero, so derived
/// equality and hashing only see the pattern.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
}

impl BitVec {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 == 1
    }

    pub fn set(&mut self, index: usize) {
        if index < self.len {
            self.words[index / WORD_BITS] |= 1 << (index % WORD_BITS);
        }
    }

    pub fn clear(&mut self, index: usize) {
        if index < self.len {
            self.words[index / WORD_BITS] &= !(1 << (index % WORD_BITS));
        }
    }

    pub fn count_ones(&self) -> usize {
        self.words
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum()
    }

    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&index| self.get(index))
    }
}

impl fmt::Debug for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitVec")
            .field("len", &self.len)
            .field("ones", &self.count_ones())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bitmap {
    width: usize,
    height: usize,
    bits: BitVec,
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bits: BitVec::new(width * height),
        }
    }

    pub(crate) fn from_bits(width: usize, height: usize, bits: BitVec) -> Self {
        debug_assert_eq!(bits.len(), width * height);
        Self {
            width,
            height,
            bits,
        }
    }

    /// Builds a bitmap from text rows where `#` is on and anything else is off.
    /// All rows must have the same length.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let height = rows.len();
        let width = rows
            .first()
            .map(|row| row.as_ref().chars().count())
            .unwrap_or(0);
        let mut bitmap = Bitmap::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(anyhow!(
                    "row {} has {} columns, expected {}",
                    y,
                    row.chars().count(),
                    width
                ));
            }
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    bitmap.set(x, y);
                }
            }
        }
        Ok(bitmap)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.bits.get(self.index(x, y))
    }

    pub fn is_on(&self, index: usize) -> bool {
        self.bits.get(index)
    }

    pub fn set(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            let index = self.index(x, y);
            self.bits.set(index);
        }
    }

    pub fn bits(&self) -> &BitVec {
        &self.bits
    }

    pub fn count_on(&self) -> usize {
        self.bits.count_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn bitvec_set_get_clear() {
        let mut bits = BitVec::new(130);
        bits.set(0);
        bits.set(64);
        bits.set(129);
        bits.set(500);
        assert!(bits.get(0));
        assert!(bits.get(64));
        assert!(bits.get(129));
        assert!(!bits.get(500));
        assert_eq!(bits.count_ones(), 3);
        bits.clear(64);
        assert_eq!(bits.ones().collect::<Vec<_>>(), vec![0, 129]);
    }

    #[test]
    fn equal_patterns_hash_together() {
        let mut a = BitVec::new(10);
        let mut b = BitVec::new(10);
        a.set(3);
        b.set(3);
        b.set(4);
        b.clear(4);
        let set: HashSet<BitVec> = [a.clone(), b].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert_ne!(a, BitVec::new(11));
    }

    #[test]
    fn bitmap_from_rows() {
        let bitmap = Bitmap::from_rows(&["#..", ".#."]).expect("bitmap");
        assert_eq!((bitmap.width(), bitmap.height()), (3, 2));
        assert!(bitmap.get(0, 0));
        assert!(bitmap.get(1, 1));
        assert!(!bitmap.get(2, 1));
        assert!(!bitmap.get(7, 7));
        assert_eq!(bitmap.count_on(), 2);
    }

    #[test]
    fn bitmap_from_ragged_rows_fails() {
        assert!(Bitmap::from_rows(&["##", "#"]).is_err());
    }
}
