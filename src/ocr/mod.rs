mod bits;
pub mod debug;
mod dictionary;
mod engine;
mod error;
mod extract;
mod glyph;
mod layout;
mod threshold;
mod training;

pub use bits::{BitVec, Bitmap};
pub use debug::OcrDebugConfig;
pub use dictionary::{GlyphDictionary, LearnedGlyph};
pub use engine::{
    recognize, OcrOptions, Recognition, RecognitionStats, Unresolved, DEFAULT_CONNECTION_LIMIT,
    DEFAULT_WORD_GAP,
};
pub use error::{is_runaway, OcrError};
pub use extract::{extract_glyph, Tolerance};
pub use glyph::{Glyph, GlyphOrigin, Location, MAX_GLYPH_AREA};
pub use layout::{assemble_lines, Recognized, WORD_SEPARATOR};
pub use threshold::{threshold, BitDepth, SourceRaster};
pub use training::{ConsoleOracle, NoTraining, Trainer, TrainingMode, TranscriptionOracle};
