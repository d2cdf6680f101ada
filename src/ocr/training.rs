use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use tracing::debug;

use super::dictionary::GlyphDictionary;
use super::glyph::{Glyph, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrainingMode {
    #[default]
    Off,
    Learn,
    QueryEach,
}

impl TrainingMode {
    pub fn is_active(self) -> bool {
        self != TrainingMode::Off
    }
}

pub trait TranscriptionOracle {
    fn transcribe(&mut self, glyph: &Glyph, location: Location) -> Result<Option<String>>;

    /// Whether a freshly learned glyph should go into the training output.
    fn confirm(&mut self, _glyph: &Glyph, _text: &str) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoTraining;

impl TranscriptionOracle for NoTraining {
    fn transcribe(&mut self, _glyph: &Glyph, _location: Location) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Prompts an operator: draws the glyph on `output` and reads one line of
/// `input` per question. An empty answer skips the glyph.
pub struct ConsoleOracle<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleOracle<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .with_context(|| "failed to read transcription")?;
        if read == 0 {
            return Ok(None);
        }
        let answer = line.trim_end_matches(['\r', '\n']).to_string();
        if answer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(answer))
        }
    }
}

impl ConsoleOracle<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TranscriptionOracle for ConsoleOracle<R, W> {
    fn transcribe(&mut self, glyph: &Glyph, location: Location) -> Result<Option<String>> {
        write!(
            self.output,
            "unknown glyph {}x{} at {}:\n{}text (empty to skip)> ",
            glyph.width(),
            glyph.height(),
            location,
            glyph.to_ascii()
        )?;
        self.output.flush()?;
        self.read_answer()
    }

    fn confirm(&mut self, _glyph: &Glyph, text: &str) -> Result<bool> {
        write!(self.output, "save {:?} to training output? [Y/n] ", text)?;
        self.output.flush()?;
        let answer = self.read_answer()?;
        Ok(!matches!(
            answer.as_deref().map(str::trim),
            Some("n" | "N" | "no" | "No" | "NO")
        ))
    }
}

pub struct Trainer<'a> {
    mode: TrainingMode,
    oracle: Option<&'a mut dyn TranscriptionOracle>,
}

impl<'a> Trainer<'a> {
    pub fn new(mode: TrainingMode, oracle: &'a mut dyn TranscriptionOracle) -> Self {
        Self {
            mode,
            oracle: Some(oracle),
        }
    }

    pub fn disabled() -> Self {
        Self {
            mode: TrainingMode::Off,
            oracle: None,
        }
    }

    pub fn train(
        &mut self,
        dictionary: &mut GlyphDictionary,
        glyph: &Glyph,
        location: Location,
    ) -> Result<Option<String>> {
        if !self.mode.is_active() {
            return Ok(None);
        }
        let Some(oracle) = self.oracle.as_deref_mut() else {
            return Ok(None);
        };
        let Some(text) = oracle
            .transcribe(glyph, location)?
            .filter(|text| !text.is_empty())
        else {
            return Ok(None);
        };
        let confirmed = match self.mode {
            TrainingMode::QueryEach => oracle.confirm(glyph, &text)?,
            _ => true,
        };
        debug!(%location, text = %text, confirmed, "learned glyph");
        dictionary.learn(glyph.clone(), text.clone(), confirmed);
        Ok(Some(text))
    }
}
