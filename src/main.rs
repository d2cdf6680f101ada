use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use dose_screen_ocr::ocr::{ConsoleOracle, NoTraining};
use dose_screen_ocr::{BitDepth, TrainingMode, Vendor};

/// Exit status for an image whose on pixels form one giant component.
const EXIT_RUNAWAY: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    name = "dose-screen-ocr",
    version,
    about = "Read CT dose screens rendered as images"
)]
struct Cli {
    /// Dose screen image (png, jpeg, bmp, tiff, ...)
    #[arg(short = 'i', long = "image")]
    image: PathBuf,

    /// Vendor grammar to apply (ge, siemens)
    #[arg(short = 'v', long = "vendor")]
    vendor: Vendor,

    /// Glyph dictionary XML (defaults to settings [dictionary] path)
    #[arg(short = 'd', long = "dictionary")]
    dictionary: Option<PathBuf>,

    /// Ask for transcriptions of unknown glyphs on the console
    #[arg(short = 't', long = "train")]
    train: bool,

    /// Like --train, and confirm each learned glyph before saving it
    #[arg(long = "query-each")]
    query_each: bool,

    /// Where learned glyphs are written (defaults to settings [training] output)
    #[arg(long = "train-output")]
    train_output: Option<PathBuf>,

    /// Treat the image as an 8-bit raster or a 1-bit overlay plane
    #[arg(long = "bit-depth", default_value = "8", value_parser = parse_bit_depth)]
    bit_depth: BitDepth,

    /// Study identifier stamped on every acquisition
    #[arg(short = 's', long = "scope")]
    scope: Option<String>,

    /// Print the parsed screen as JSON
    #[arg(long = "json")]
    json: bool,

    /// Write thresholded image and recognition dump into this directory
    #[arg(long = "debug-ocr")]
    debug_ocr: Option<PathBuf>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn parse_bit_depth(value: &str) -> Result<BitDepth, String> {
    value
        .trim()
        .parse::<u8>()
        .ok()
        .and_then(BitDepth::from_bits)
        .ok_or_else(|| format!("unsupported bit depth {:?} (expected 1 or 8)", value))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = dose_screen_ocr::logging::init(cli.verbose) {
        eprintln!("error: {:#}", err);
        return ExitCode::FAILURE;
    }
    match execute(cli) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) if dose_screen_ocr::is_runaway(&err) => {
            eprintln!("error: image is probably not thresholded properly: {:#}", err);
            ExitCode::from(EXIT_RUNAWAY)
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<String> {
    let training = if cli.query_each {
        TrainingMode::QueryEach
    } else if cli.train {
        TrainingMode::Learn
    } else {
        TrainingMode::Off
    };
    let config = dose_screen_ocr::Config {
        image: cli.image,
        vendor: cli.vendor,
        dictionary: cli.dictionary,
        training,
        train_output: cli.train_output,
        bit_depth: cli.bit_depth,
        scope: cli.scope,
        json: cli.json,
        debug_ocr: cli.debug_ocr,
        settings_path: cli.read_settings,
    };
    if training.is_active() {
        let mut oracle = ConsoleOracle::stdio();
        dose_screen_ocr::run(&config, &mut oracle)
    } else {
        dose_screen_ocr::run(&config, &mut NoTraining)
    }
}
