use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::bits::{BitVec, Bitmap};
use super::dictionary::GlyphDictionary;
use super::extract::{extract_glyph, Tolerance};
use super::glyph::{Glyph, Location};
use super::layout::{assemble_lines, Recognized};
use super::training::Trainer;

pub const DEFAULT_CONNECTION_LIMIT: usize = 1000;
pub const DEFAULT_WORD_GAP: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrOptions {
    pub tolerance: Tolerance,
    pub connection_limit: usize,
    pub word_gap: usize,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::new(3, 3),
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            word_gap: DEFAULT_WORD_GAP,
        }
    }
}

/// A component that neither pass could turn into text.
#[derive(Debug, Clone)]
pub struct Unresolved {
    pub location: Location,
    pub glyph: Glyph,
}

#[derive(Debug, Clone)]
pub struct Recognition {
    pub lines: Vec<String>,
    pub recognized: BTreeMap<Location, Recognized>,
    pub unresolved: Vec<Unresolved>,
    pub stats: RecognitionStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecognitionStats {
    pub recognized: usize,
    pub resolved_blobs: usize,
    pub unresolved: usize,
}

impl Recognition {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

pub fn recognize(
    bitmap: &Bitmap,
    dictionary: &mut GlyphDictionary,
    options: &OcrOptions,
    trainer: &mut Trainer<'_>,
) -> Result<Recognition> {
    let mut recognized: BTreeMap<Location, Recognized> = BTreeMap::new();
    let mut unrecognized: BTreeMap<Location, Glyph> = BTreeMap::new();
    let mut unresolved = Vec::new();
    let mut stats = RecognitionStats::default();

    let mut processed = BitVec::new(bitmap.len());
    for y in 0..bitmap.height() {
        for x in 0..bitmap.width() {
            let index = bitmap.index(x, y);
            if !bitmap.is_on(index) || processed.get(index) {
                continue;
            }
            let (location, glyph) = extract_glyph(
                bitmap,
                &mut processed,
                Location::new(x, y),
                options.tolerance,
                options.connection_limit,
            )?;
            // Bounding boxes of disjoint components can share a top-left corner.
            if recognized.contains_key(&location) || unrecognized.contains_key(&location) {
                debug!(%location, "component shares its location with an earlier one");
                unresolved.push(Unresolved { location, glyph });
                continue;
            }
            match identify(&glyph, location, dictionary, trainer)? {
                Some(text) => {
                    recognized.insert(location, recognized_entry(text, &glyph));
                }
                None => {
                    unrecognized.insert(location, glyph);
                }
            }
        }
    }
    stats.recognized = recognized.len();
    debug!(
        recognized = recognized.len(),
        unrecognized = unrecognized.len(),
        "pass 1 complete"
    );

    for (location, glyph) in std::mem::take(&mut unrecognized) {
        let text = resolve_blob(&glyph, location, dictionary, options, trainer)?;
        if text.is_empty() {
            debug!(%location, width = glyph.width(), height = glyph.height(), "unresolved blob");
            unresolved.push(Unresolved { location, glyph });
        } else {
            debug!(%location, text = %text, "resolved blob");
            recognized.insert(location, recognized_entry(text, &glyph));
            stats.resolved_blobs += 1;
        }
    }
    stats.unresolved = unresolved.len();

    let lines = assemble_lines(&recognized, options.word_gap);
    info!(
        lines = lines.len(),
        recognized = stats.recognized,
        resolved_blobs = stats.resolved_blobs,
        unresolved = stats.unresolved,
        "recognition finished"
    );
    Ok(Recognition {
        lines,
        recognized,
        unresolved,
        stats,
    })
}

fn identify(
    glyph: &Glyph,
    location: Location,
    dictionary: &mut GlyphDictionary,
    trainer: &mut Trainer<'_>,
) -> Result<Option<String>> {
    if let Some(text) = dictionary.lookup(glyph) {
        return Ok(Some(text.to_string()));
    }
    trainer.train(dictionary, glyph, location)
}

/// Re-reads an unrecognized component at minimal tolerance, restricted to its
/// own pixels, scanning columns left to right. Recognized pieces are joined
/// without separators.
fn resolve_blob(
    blob: &Glyph,
    location: Location,
    dictionary: &mut GlyphDictionary,
    options: &OcrOptions,
    trainer: &mut Trainer<'_>,
) -> Result<String> {
    let pixels = blob.bitmap();
    let mut processed = BitVec::new(pixels.len());
    let mut text = String::new();
    for x in 0..pixels.width() {
        for y in 0..pixels.height() {
            let index = pixels.index(x, y);
            if !pixels.is_on(index) || processed.get(index) {
                continue;
            }
            let (offset, piece) = extract_glyph(
                pixels,
                &mut processed,
                Location::new(x, y),
                Tolerance::MINIMAL,
                options.connection_limit,
            )?;
            let at = location.offset(offset.x, offset.y);
            if let Some(found) = identify(&piece, at, dictionary, trainer)? {
                text.push_str(&found);
            }
        }
    }
    Ok(text)
}

fn recognized_entry(text: String, glyph: &Glyph) -> Recognized {
    Recognized {
        text,
        width: glyph.width(),
        height: glyph.height(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::error::{is_runaway, OcrError};
    use crate::ocr::training::{TrainingMode, TranscriptionOracle};

    fn glyph(rows: &[&str]) -> Glyph {
        Glyph::from_bitmap(Bitmap::from_rows(rows).expect("rows"))
    }

    fn digits() -> GlyphDictionary {
        let mut dictionary = GlyphDictionary::new();
        dictionary.insert_known(glyph(&["#", "#", "#"]), "1");
        dictionary.insert_known(glyph(&["##", ".#", "##"]), "7");
        dictionary.insert_known(glyph(&["#"]), ".");
        dictionary
    }

    fn options(tolerance: Tolerance) -> OcrOptions {
        OcrOptions {
            tolerance,
            connection_limit: 1000,
            word_gap: 2,
        }
    }

    #[test]
    fn pass_one_recognizes_isolated_glyphs() {
        let bitmap = Bitmap::from_rows(&[
            "#.....##", //
            "#......#",
            "#.....##",
        ])
        .expect("bitmap");
        let mut dictionary = digits();
        let recognition = recognize(
            &bitmap,
            &mut dictionary,
            &options(Tolerance::MINIMAL),
            &mut Trainer::disabled(),
        )
        .expect("recognize");
        assert_eq!(recognition.lines, vec!["1\t7".to_string()]);
        assert!(recognition.unresolved.is_empty());
    }

    #[test]
    fn touching_characters_are_split_in_pass_two() {
        // At tolerance 2 the three characters merge into one unknown blob.
        let bitmap = Bitmap::from_rows(&[
            "#.##....", //
            "#..#....",
            "#.##.#..",
        ])
        .expect("bitmap");
        let mut dictionary = digits();
        let recognition = recognize(
            &bitmap,
            &mut dictionary,
            &options(Tolerance::new(2, 2)),
            &mut Trainer::disabled(),
        )
        .expect("recognize");
        assert_eq!(recognition.lines, vec!["17.".to_string()]);
        assert_eq!(recognition.stats.resolved_blobs, 1);
        let entry = &recognition.recognized[&Location::new(0, 0)];
        assert_eq!((entry.width, entry.height), (6, 3));
    }

    #[test]
    fn unreadable_blob_is_dropped_from_text() {
        let bitmap = Bitmap::from_rows(&[
            "#....###", //
            "#....#.#",
            "#....###",
        ])
        .expect("bitmap");
        let mut dictionary = digits();
        let recognition = recognize(
            &bitmap,
            &mut dictionary,
            &options(Tolerance::MINIMAL),
            &mut Trainer::disabled(),
        )
        .expect("recognize");
        assert_eq!(recognition.lines, vec!["1".to_string()]);
        assert_eq!(recognition.unresolved.len(), 1);
        assert_eq!(recognition.unresolved[0].location, Location::new(5, 0));
        assert!(!recognition.recognized.contains_key(&Location::new(5, 0)));
    }

    #[test]
    fn components_sharing_a_corner_are_both_kept() {
        // The dot claims (0, 0); the hook's bounding box also starts there.
        let bitmap = Bitmap::from_rows(&[
            "#.#", //
            "..#",
            "##.",
        ])
        .expect("bitmap");
        let mut dictionary = digits();
        dictionary.insert_known(glyph(&["..#", "..#", "##."]), "J");
        let recognition = recognize(
            &bitmap,
            &mut dictionary,
            &options(Tolerance::MINIMAL),
            &mut Trainer::disabled(),
        )
        .expect("recognize");
        assert_eq!(recognition.lines, vec![".".to_string()]);
        assert_eq!(recognition.unresolved.len(), 1);
        let hook = &recognition.unresolved[0];
        assert_eq!(hook.location, Location::new(0, 0));
        assert_eq!((hook.glyph.width(), hook.glyph.height()), (3, 3));
        assert_eq!(recognition.stats.unresolved, 1);
    }

    #[test]
    fn runaway_component_aborts_the_run() {
        let rows = vec!["#".repeat(40); 40];
        let bitmap = Bitmap::from_rows(&rows).expect("bitmap");
        let mut dictionary = digits();
        let err = recognize(
            &bitmap,
            &mut dictionary,
            &options(Tolerance::new(3, 3)),
            &mut Trainer::disabled(),
        )
        .unwrap_err();
        assert!(is_runaway(&err));
        assert!(matches!(
            err.downcast_ref::<OcrError>(),
            Some(OcrError::RunawayConnectivity { limit: 1000, .. })
        ));
    }

    struct Scripted(Vec<&'static str>);

    impl TranscriptionOracle for Scripted {
        fn transcribe(&mut self, _glyph: &Glyph, _location: Location) -> Result<Option<String>> {
            Ok(self.0.pop().map(str::to_string))
        }
    }

    #[test]
    fn training_fills_in_unknown_pieces() {
        let bitmap = Bitmap::from_rows(&[
            "#.###", //
            "#.#.#",
            "#.###",
        ])
        .expect("bitmap");
        let mut dictionary = digits();
        // Pass 1 asks about the merged blob first (skipped), then pass 2 asks
        // about the unknown square piece.
        let mut oracle = Scripted(vec!["0", ""]);
        let mut trainer = Trainer::new(TrainingMode::Learn, &mut oracle);
        let recognition = recognize(
            &bitmap,
            &mut dictionary,
            &options(Tolerance::new(2, 2)),
            &mut trainer,
        )
        .expect("recognize");
        assert_eq!(recognition.lines, vec!["10".to_string()]);
        assert_eq!(dictionary.learned().len(), 1);
        assert_eq!(dictionary.lookup(&glyph(&["###", "#.#", "###"])), Some("0"));
    }
}
