use std::collections::BTreeMap;

use serde::Serialize;

use super::glyph::Location;

pub const WORD_SEPARATOR: char = '\t';

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recognized {
    pub text: String,
    pub width: usize,
    pub height: usize,
}

/// Serializes recognized glyphs into text lines.
///
/// Entries are visited in reading order. A change of `y` starts a new line;
/// within a line a tab is inserted when more than `word_gap` blank columns
/// separate the previous component's right edge from the next left edge.
pub fn assemble_lines(recognized: &BTreeMap<Location, Recognized>, word_gap: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_y: Option<usize> = None;
    let mut previous_end = 0usize;

    for (location, entry) in recognized {
        if current_y != Some(location.y) {
            if current_y.is_some() {
                lines.push(std::mem::take(&mut current));
            }
            current_y = Some(location.y);
        } else if location.x.saturating_sub(previous_end) > word_gap {
            current.push(WORD_SEPARATOR);
        }
        current.push_str(&entry.text);
        previous_end = location.x + entry.width;
    }
    if current_y.is_some() {
        lines.push(current);
    }
    lines
}
