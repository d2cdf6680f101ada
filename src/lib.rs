use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub mod dose;
pub mod logging;
pub mod ocr;
mod paths;
pub mod settings;

pub use dose::{
    normalize_dlp, parse_dose_screen, DoseAcquisition, DoseScreen, Phantom, Reconciliation,
    ScanRange, ScanType, Vendor,
};
pub use ocr::{
    is_runaway, recognize, threshold, BitDepth, Bitmap, GlyphDictionary, OcrError, OcrOptions,
    Recognition, SourceRaster, Trainer, TrainingMode, TranscriptionOracle,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub image: PathBuf,
    pub vendor: Vendor,
    pub dictionary: Option<PathBuf>,
    pub training: TrainingMode,
    pub train_output: Option<PathBuf>,
    pub bit_depth: BitDepth,
    pub scope: Option<String>,
    pub json: bool,
    pub debug_ocr: Option<PathBuf>,
    pub settings_path: Option<String>,
}

/// Result of reading one screen: the recognized text and what the vendor
/// grammar made of it.
#[derive(Debug, Clone)]
pub struct ScreenReading {
    pub recognition: Recognition,
    pub screen: DoseScreen,
    pub reconciliation: Option<Reconciliation>,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    lines: &'a [String],
    screen: &'a DoseScreen,
    #[serde(skip_serializing_if = "Option::is_none")]
    reconciliation: Option<&'a Reconciliation>,
    stats: ocr::RecognitionStats,
}

/// Loads an image as an 8-bit luma raster. With [`BitDepth::One`] the
/// samples are read as an overlay plane, non-zero meaning on.
pub fn load_raster(path: &Path, depth: BitDepth) -> Result<SourceRaster> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode image: {}", path.display()))?;
    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();
    let raster = SourceRaster::new(width as usize, height as usize, depth, luma.into_raw())?;
    Ok(raster)
}

/// Recognizes `bitmap` and parses the lines with the `vendor` grammar.
pub fn read_dose_screen(
    bitmap: &Bitmap,
    dictionary: &mut GlyphDictionary,
    vendor: Vendor,
    options: &OcrOptions,
    trainer: &mut Trainer<'_>,
    scope: Option<&str>,
) -> Result<ScreenReading> {
    let recognition = recognize(bitmap, dictionary, options, trainer)?;
    let screen = parse_dose_screen(&recognition.lines, vendor, scope)?;
    let reconciliation = screen.reconcile();
    info!(
        vendor = %vendor,
        acquisitions = screen.acquisitions.len(),
        total = screen.total_dlp.as_deref().unwrap_or("-"),
        "parsed dose screen"
    );
    Ok(ScreenReading {
        recognition,
        screen,
        reconciliation,
    })
}

pub fn run(config: &Config, oracle: &mut dyn TranscriptionOracle) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    let dictionary_path = config
        .dictionary
        .clone()
        .unwrap_or_else(|| settings.dictionary_path());
    let mut dictionary = load_dictionary(&dictionary_path, config.training)?;

    let raster = load_raster(&config.image, config.bit_depth)?;
    let bitmap = threshold(&raster);
    let options = settings.ocr_options(config.vendor);

    let mut trainer = if config.training.is_active() {
        Trainer::new(config.training, oracle)
    } else {
        Trainer::disabled()
    };
    let reading = read_dose_screen(
        &bitmap,
        &mut dictionary,
        config.vendor,
        &options,
        &mut trainer,
        config.scope.as_deref(),
    )
    .with_context(|| format!("failed to read dose screen: {}", config.image.display()))?;

    if config.training.is_active() {
        let output = config
            .train_output
            .clone()
            .unwrap_or_else(|| settings.training_output());
        let confirmed_only = config.training == TrainingMode::QueryEach;
        let written = dictionary.save_learned(&output, confirmed_only)?;
        info!(path = %output.display(), glyphs = written, "training output");
    }

    if let Some(dir) = config.debug_ocr.as_deref() {
        let debug = ocr::OcrDebugConfig::new(dir, &config.image)?;
        ocr::debug::write_artifacts(&debug, &bitmap, &reading.recognition)?;
    }

    if config.json {
        let output = JsonOutput {
            lines: &reading.recognition.lines,
            screen: &reading.screen,
            reconciliation: reading.reconciliation.as_ref(),
            stats: reading.recognition.stats,
        };
        return Ok(serde_json::to_string_pretty(&output)?);
    }
    Ok(format_reading(&reading))
}

fn load_dictionary(path: &Path, training: TrainingMode) -> Result<GlyphDictionary> {
    if path.exists() {
        return GlyphDictionary::load(path);
    }
    if training.is_active() {
        warn!(path = %path.display(), "glyph dictionary not found; training from scratch");
        return Ok(GlyphDictionary::new());
    }
    Err(anyhow!("glyph dictionary not found: {}", path.display()))
}

fn format_reading(reading: &ScreenReading) -> String {
    let mut output = reading.recognition.text();
    if !reading.screen.acquisitions.is_empty() || reading.screen.total_dlp.is_some() {
        output.push_str("\n\n");
    }
    for acquisition in &reading.screen.acquisitions {
        output.push_str(&format_acquisition(acquisition));
        output.push('\n');
    }
    if let Some(total) = reading.screen.total_dlp.as_deref() {
        let _ = write!(output, "total DLP {}", total);
        if let Some(reconciliation) = &reading.reconciliation {
            let verdict = if reconciliation.matches {
                "matches"
            } else {
                "MISMATCH"
            };
            let _ = write!(output, " (sum {}, {})", reconciliation.sum, verdict);
        }
    }
    output.trim_end().to_string()
}

fn format_acquisition(acquisition: &DoseAcquisition) -> String {
    let mut parts = Vec::new();
    if let Some(series) = &acquisition.series {
        parts.push(format!("series {}", series));
    }
    parts.push(acquisition.scan_type.to_string());
    if let Some(label) = &acquisition.label {
        if *label != acquisition.scan_type.to_string() {
            parts.push(format!("[{}]", label));
        }
    }
    if let Some(range) = &acquisition.scan_range {
        parts.push(format!("{}-{}", range.start, range.end));
    }
    if let Some(ctdi) = &acquisition.ctdi_vol {
        parts.push(format!("CTDIvol {}", ctdi));
    }
    if let Some(dlp) = &acquisition.dlp {
        parts.push(format!("DLP {}", dlp));
    }
    if let Some(phantom) = acquisition.phantom {
        parts.push(phantom.to_string());
    }
    parts.join(" ")
}
