use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::error::OcrError;
use super::glyph::{Glyph, GlyphOrigin};

#[derive(Debug, Clone)]
pub struct LearnedGlyph {
    pub glyph: Glyph,
    pub text: String,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GlyphDictionary {
    entries: HashMap<Glyph, String>,
    learned: Vec<LearnedGlyph>,
}

impl GlyphDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, glyph: &Glyph) -> Option<&str> {
        self.entries.get(glyph).map(String::as_str)
    }

    pub fn insert_known(&mut self, glyph: Glyph, text: impl Into<String>) -> Option<String> {
        self.entries
            .insert(glyph.with_origin(GlyphOrigin::Known), text.into())
    }

    pub fn learn(&mut self, glyph: Glyph, text: impl Into<String>, confirmed: bool) {
        let text = text.into();
        let glyph = glyph.with_origin(GlyphOrigin::Learned);
        self.entries.insert(glyph.clone(), text.clone());
        self.learned.push(LearnedGlyph {
            glyph,
            text,
            confirmed,
        });
    }

    pub fn learned(&self) -> &[LearnedGlyph] {
        &self.learned
    }

    pub fn merge(&mut self, other: GlyphDictionary) {
        self.entries.extend(other.entries);
        self.learned.extend(other.learned);
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read glyph dictionary: {}", path.display()))?;
        let dictionary = Self::from_xml(&content)
            .with_context(|| format!("failed to load glyph dictionary: {}", path.display()))?;
        debug!(
            path = %path.display(),
            glyphs = dictionary.len(),
            "loaded glyph dictionary"
        );
        Ok(dictionary)
    }

    pub fn from_xml(xml: &str) -> Result<Self, OcrError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut dictionary = GlyphDictionary::new();
        let mut saw_root = false;
        let mut pending: Option<PendingGlyph> = None;
        let mut field: Option<Field> = None;
        let mut skipped = 0usize;

        loop {
            let event = reader.read_event().map_err(|err| OcrError::MalformedDictionary {
                reason: format!("at byte {}: {}", reader.buffer_position(), err),
            })?;
            match event {
                Event::Start(e) => match e.name().as_ref() {
                    b"glyphs" => saw_root = true,
                    b"glyph" => pending = Some(PendingGlyph::default()),
                    b"bit" => field = Some(Field::Bit),
                    b"width" => field = Some(Field::Width),
                    b"string" => field = Some(Field::Text),
                    _ => {}
                },
                Event::Empty(e) => {
                    if e.name().as_ref() == b"glyphs" {
                        saw_root = true;
                    }
                }
                Event::Text(e) => {
                    let (Some(glyph), Some(field)) = (pending.as_mut(), field) else {
                        continue;
                    };
                    let value = e.unescape().map_err(|err| OcrError::MalformedDictionary {
                        reason: err.to_string(),
                    })?;
                    glyph.accept(field, &value);
                }
                Event::CData(e) => {
                    if let (Some(glyph), Some(field)) = (pending.as_mut(), field) {
                        let value = String::from_utf8_lossy(&e.into_inner()).into_owned();
                        glyph.accept(field, &value);
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"glyph" => {
                        let Some(entry) = pending.take() else {
                            continue;
                        };
                        match entry.finish() {
                            Some((glyph, text)) => {
                                dictionary.insert_known(glyph, text);
                            }
                            None => skipped += 1,
                        }
                    }
                    b"bit" | b"width" | b"string" => field = None,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(OcrError::MalformedDictionary {
                reason: "missing <glyphs> root element".to_string(),
            });
        }
        if skipped > 0 {
            warn!(skipped, "ignored incomplete glyph dictionary entries");
        }
        Ok(dictionary)
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut entries: Vec<(&Glyph, &str)> = self
            .entries
            .iter()
            .map(|(glyph, text)| (glyph, text.as_str()))
            .collect();
        entries.sort_by_cached_key(|(glyph, text)| {
            (
                text.to_string(),
                glyph.width(),
                glyph.height(),
                glyph.on_indices(),
            )
        });
        write_glyphs(entries)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let xml = self.to_xml()?;
        write_file(path, &xml)
    }

    /// Writes glyphs learned during this run. With `confirmed_only`, glyphs
    /// the operator did not confirm are left out. Nothing is written when
    /// there is nothing to save; the number of glyphs written is returned.
    pub fn save_learned(&self, path: &Path, confirmed_only: bool) -> Result<usize> {
        let entries: Vec<(&Glyph, &str)> = self
            .learned
            .iter()
            .filter(|learned| !confirmed_only || learned.confirmed)
            .map(|learned| (&learned.glyph, learned.text.as_str()))
            .collect();
        if entries.is_empty() {
            return Ok(0);
        }
        let count = entries.len();
        let xml = write_glyphs(entries)?;
        write_file(path, &xml)?;
        Ok(count)
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Bit,
    Width,
    Text,
}

#[derive(Debug, Default)]
struct PendingGlyph {
    bits: Vec<usize>,
    width: Option<usize>,
    text: String,
    invalid: bool,
}

impl PendingGlyph {
    fn accept(&mut self, field: Field, value: &str) {
        match field {
            Field::Bit => match value.trim().parse() {
                Ok(bit) => self.bits.push(bit),
                Err(_) => self.invalid = true,
            },
            Field::Width => match value.trim().parse() {
                Ok(width) => self.width = Some(width),
                Err(_) => self.invalid = true,
            },
            Field::Text => self.text.push_str(value),
        }
    }

    fn finish(self) -> Option<(Glyph, String)> {
        if self.invalid || self.text.is_empty() {
            return None;
        }
        let glyph = Glyph::from_bit_indices(self.width?, &self.bits)?;
        Some((glyph, self.text))
    }
}

fn write_glyphs<'a>(entries: impl IntoIterator<Item = (&'a Glyph, &'a str)>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("glyphs")))?;
    for (glyph, text) in entries {
        writer.write_event(Event::Start(BytesStart::new("glyph")))?;
        writer.write_event(Event::Start(BytesStart::new("bits")))?;
        for bit in glyph.on_indices() {
            write_leaf(&mut writer, "bit", &bit.to_string())?;
        }
        writer.write_event(Event::End(BytesEnd::new("bits")))?;
        write_leaf(&mut writer, "width", &glyph.width().to_string())?;
        write_leaf(&mut writer, "string", text)?;
        writer.write_event(Event::End(BytesEnd::new("glyph")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("glyphs")))?;
    let bytes = writer.into_inner();
    String::from_utf8(bytes).with_context(|| "glyph dictionary output is not UTF-8")
}

fn write_leaf(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Replaces `path` through a temp file in the same directory.
fn write_file(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    let file = tempfile::Builder::new()
        .prefix(".glyphs-")
        .suffix(".xml")
        .tempfile_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    fs::write(file.path(), content)
        .with_context(|| format!("failed to write glyph dictionary: {}", path.display()))?;
    file.persist(path)
        .with_context(|| format!("failed to replace glyph dictionary: {}", path.display()))?;
    Ok(())
}
