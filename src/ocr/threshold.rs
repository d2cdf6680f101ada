use super::bits::{BitVec, Bitmap};
use super::error::OcrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    /// Boolean overlay plane, one sample per pixel, non-zero means on.
    One,
    #[default]
    Eight,
}

impl BitDepth {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(BitDepth::One),
            8 => Some(BitDepth::Eight),
            _ => None,
        }
    }

    /// Samples strictly above this value are on.
    pub fn cutoff(self) -> u8 {
        match self {
            BitDepth::One => 0,
            BitDepth::Eight => 127,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceRaster {
    width: usize,
    height: usize,
    depth: BitDepth,
    samples: Vec<u8>,
}

impl SourceRaster {
    pub fn new(
        width: usize,
        height: usize,
        depth: BitDepth,
        samples: Vec<u8>,
    ) -> Result<Self, OcrError> {
        let expected = width * height;
        if samples.len() != expected {
            return Err(OcrError::DimensionMismatch {
                width,
                height,
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            depth,
            samples,
        })
    }

    /// Unpacks a 1-bit overlay plane stored eight pixels per byte, least
    /// significant bit first.
    pub fn from_packed_overlay(
        width: usize,
        height: usize,
        packed: &[u8],
    ) -> Result<Self, OcrError> {
        let expected = width * height;
        if packed.len() * 8 < expected {
            return Err(OcrError::DimensionMismatch {
                width,
                height,
                expected: expected.div_ceil(8),
                actual: packed.len(),
            });
        }
        let samples = (0..expected)
            .map(|index| (packed[index / 8] >> (index % 8)) & 1)
            .collect();
        Self::new(width, height, BitDepth::One, samples)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }
}

pub fn threshold(raster: &SourceRaster) -> Bitmap {
    let cutoff = raster.depth.cutoff();
    let mut bits = BitVec::new(raster.samples.len());
    for (index, &sample) in raster.samples.iter().enumerate() {
        if sample > cutoff {
            bits.set(index);
        }
    }
    Bitmap::from_bits(raster.width, raster.height, bits)
}
