use serde::{Deserialize, Serialize};

use super::bits::{BitVec, Bitmap};
use super::error::OcrError;
use super::glyph::{Glyph, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tolerance {
    pub x: usize,
    pub y: usize,
}

impl Tolerance {
    /// Only literally touching pixels (8-connectivity).
    pub const MINIMAL: Tolerance = Tolerance { x: 1, y: 1 };

    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Claims the component reachable from `seed` and returns it normalized,
/// along with the top-left corner of its bounding box in `bitmap`.
///
/// Every claimed pixel is marked in `processed` before returning. `seed`
/// must be on and not yet processed.
pub fn extract_glyph(
    bitmap: &Bitmap,
    processed: &mut BitVec,
    seed: Location,
    tolerance: Tolerance,
    limit: usize,
) -> Result<(Location, Glyph), OcrError> {
    let seed_index = bitmap.index(seed.x, seed.y);
    if !bitmap.get(seed.x, seed.y) || processed.get(seed_index) {
        return Err(OcrError::InvalidSeed {
            x: seed.x,
            y: seed.y,
        });
    }

    let width = bitmap.width();
    let height = bitmap.height();
    let gx = tolerance.x as isize;
    let gy = tolerance.y as isize;

    let mut members: Vec<Location> = Vec::new();
    let mut stack = vec![seed];
    processed.set(seed_index);

    while let Some(current) = stack.pop() {
        members.push(current);
        if members.len() > limit {
            return Err(OcrError::RunawayConnectivity {
                limit,
                seed_x: seed.x,
                seed_y: seed.y,
            });
        }
        for dy in -gy..=gy {
            let ny = current.y as isize + dy;
            if ny < 0 || ny >= height as isize {
                continue;
            }
            for dx in -gx..=gx {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = current.x as isize + dx;
                if nx < 0 || nx >= width as isize {
                    continue;
                }
                let (nx, ny) = (nx as usize, ny as usize);
                let index = bitmap.index(nx, ny);
                if bitmap.is_on(index) && !processed.get(index) {
                    processed.set(index);
                    stack.push(Location::new(nx, ny));
                }
            }
        }
    }

    Ok(normalize(&members))
}

fn normalize(members: &[Location]) -> (Location, Glyph) {
    let (mut left, mut top) = (usize::MAX, usize::MAX);
    let (mut right, mut bottom) = (0usize, 0usize);
    for member in members {
        left = left.min(member.x);
        right = right.max(member.x);
        top = top.min(member.y);
        bottom = bottom.max(member.y);
    }
    let mut bitmap = Bitmap::new(right - left + 1, bottom - top + 1);
    for member in members {
        bitmap.set(member.x - left, member.y - top);
    }
    (Location::new(left, top), Glyph::from_bitmap(bitmap))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processed_for(bitmap: &Bitmap) -> BitVec {
        BitVec::new(bitmap.len())
    }

    #[test]
    fn single_blob_is_fully_claimed() {
        let bitmap = Bitmap::from_rows(&[
            "......", //
            "..##..",
            "..#...",
            "..###.",
            "......",
        ])
        .expect("bitmap");
        let mut processed = processed_for(&bitmap);
        let (location, glyph) = extract_glyph(
            &bitmap,
            &mut processed,
            Location::new(2, 1),
            Tolerance::MINIMAL,
            1000,
        )
        .expect("glyph");
        assert_eq!(location, Location::new(2, 1));
        assert_eq!((glyph.width(), glyph.height()), (3, 3));
        assert_eq!(glyph.to_ascii(), "##.\n#..\n###\n");
        assert_eq!(processed, *bitmap.bits());
    }

    #[test]
    fn location_is_bounding_box_corner_not_seed() {
        let bitmap = Bitmap::from_rows(&[
            "...#", //
            "..#.",
            ".#..",
        ])
        .expect("bitmap");
        let mut processed = processed_for(&bitmap);
        let (location, glyph) = extract_glyph(
            &bitmap,
            &mut processed,
            Location::new(3, 0),
            Tolerance::MINIMAL,
            1000,
        )
        .expect("glyph");
        assert_eq!(location, Location::new(1, 0));
        assert_eq!(glyph.to_ascii(), "..#\n.#.\n#..\n");
    }

    #[test]
    fn gap_tolerance_merges_strokes() {
        let bitmap = Bitmap::from_rows(&[
            "#.#", //
            "...",
            "#.#",
        ])
        .expect("bitmap");

        let mut processed = processed_for(&bitmap);
        let (_, tight) = extract_glyph(
            &bitmap,
            &mut processed,
            Location::new(0, 0),
            Tolerance::MINIMAL,
            1000,
        )
        .expect("glyph");
        assert_eq!(tight.pixel_count(), 1);

        let mut processed = processed_for(&bitmap);
        let (_, loose) = extract_glyph(
            &bitmap,
            &mut processed,
            Location::new(0, 0),
            Tolerance::new(2, 2),
            1000,
        )
        .expect("glyph");
        assert_eq!(loose.pixel_count(), 4);
        assert_eq!((loose.width(), loose.height()), (3, 3));
    }

    #[test]
    fn tolerance_is_per_axis() {
        let bitmap = Bitmap::from_rows(&[
            "#.#", //
            "...",
            "#..",
        ])
        .expect("bitmap");
        let mut processed = processed_for(&bitmap);
        let (_, glyph) = extract_glyph(
            &bitmap,
            &mut processed,
            Location::new(0, 0),
            Tolerance::new(2, 1),
            1000,
        )
        .expect("glyph");
        assert_eq!(glyph.to_ascii(), "#.#\n");
        assert!(!processed.get(bitmap.index(0, 2)));
    }

    #[test]
    fn translated_shapes_are_equal() {
        let bitmap = Bitmap::from_rows(&[
            "##.....", //
            "#......",
            ".....##",
            ".....#.",
        ])
        .expect("bitmap");
        let mut processed = processed_for(&bitmap);
        let (first_at, first) = extract_glyph(
            &bitmap,
            &mut processed,
            Location::new(0, 0),
            Tolerance::MINIMAL,
            1000,
        )
        .expect("glyph");
        let (second_at, second) = extract_glyph(
            &bitmap,
            &mut processed,
            Location::new(5, 2),
            Tolerance::MINIMAL,
            1000,
        )
        .expect("glyph");
        assert_ne!(first_at, second_at);
        assert_eq!(first, second);
    }

    #[test]
    fn all_on_bitmap_hits_connection_limit() {
        let rows = vec!["#".repeat(64); 64];
        let bitmap = Bitmap::from_rows(&rows).expect("bitmap");
        let mut processed = processed_for(&bitmap);
        let err = extract_glyph(
            &bitmap,
            &mut processed,
            Location::new(0, 0),
            Tolerance::new(3, 3),
            1000,
        )
        .unwrap_err();
        assert_eq!(
            err,
            OcrError::RunawayConnectivity {
                limit: 1000,
                seed_x: 0,
                seed_y: 0
            }
        );
    }

    #[test]
    fn limit_counts_pixels_inclusively() {
        let bitmap = Bitmap::from_rows(&["#####"]).expect("bitmap");
        let mut processed = processed_for(&bitmap);
        let (_, glyph) = extract_glyph(
            &bitmap,
            &mut processed,
            Location::new(0, 0),
            Tolerance::MINIMAL,
            5,
        )
        .expect("exactly at the limit");
        assert_eq!(glyph.pixel_count(), 5);

        let mut processed = processed_for(&bitmap);
        let err = extract_glyph(
            &bitmap,
            &mut processed,
            Location::new(0, 0),
            Tolerance::MINIMAL,
            4,
        )
        .unwrap_err();
        assert_eq!(
            err,
            OcrError::RunawayConnectivity {
                limit: 4,
                seed_x: 0,
                seed_y: 0
            }
        );
    }

    #[test]
    fn processed_seed_is_rejected() {
        let bitmap = Bitmap::from_rows(&["#."]).expect("bitmap");
        let mut processed = processed_for(&bitmap);
        processed.set(0);
        let err = extract_glyph(
            &bitmap,
            &mut processed,
            Location::new(0, 0),
            Tolerance::MINIMAL,
            10,
        )
        .unwrap_err();
        assert_eq!(err, OcrError::InvalidSeed { x: 0, y: 0 });
        let err = extract_glyph(
            &bitmap,
            &mut processed,
            Location::new(1, 0),
            Tolerance::MINIMAL,
            10,
        )
        .unwrap_err();
        assert_eq!(err, OcrError::InvalidSeed { x: 1, y: 0 });
    }
}
