use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::bits::Bitmap;
use super::engine::{Recognition, RecognitionStats};

const INK: Rgb<u8> = Rgb([0, 0, 0]);
const PAPER: Rgb<u8> = Rgb([255, 255, 255]);
const RECOGNIZED: Rgb<u8> = Rgb([0, 176, 0]);
const UNRESOLVED: Rgb<u8> = Rgb([220, 0, 0]);

#[derive(Debug, Clone)]
pub struct OcrDebugConfig {
    output_dir: PathBuf,
    base_name: String,
}

impl OcrDebugConfig {
    /// Artifacts for `source` go to `output_dir`, named after its file stem.
    pub fn new(output_dir: &Path, source: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir).with_context(|| {
            format!("failed to create debug dir: {}", output_dir.display())
        })?;
        let stem = source
            .file_stem()
            .and_then(|value| value.to_str())
            .unwrap_or("input");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            base_name: sanitize_filename_component(stem),
        })
    }

    pub fn threshold_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_threshold.png", self.base_name))
    }

    pub fn json_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_ocr.json", self.base_name))
    }
}

#[derive(Debug, Serialize)]
struct DebugBox<'a> {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    glyph: Option<String>,
}

#[derive(Debug, Serialize)]
struct DebugReport<'a> {
    lines: &'a [String],
    recognized: Vec<DebugBox<'a>>,
    unresolved: Vec<DebugBox<'a>>,
    stats: RecognitionStats,
}

/// Writes the thresholded bitmap with recognized (green) and unresolved
/// (red) boxes, plus a JSON dump of the recognition.
pub fn write_artifacts(
    config: &OcrDebugConfig,
    bitmap: &Bitmap,
    recognition: &Recognition,
) -> Result<()> {
    let image = render_boxes(bitmap, recognition);
    let image_path = config.threshold_path();
    image
        .save_with_format(&image_path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write ocr debug image: {}", image_path.display()))?;

    let report = DebugReport {
        lines: &recognition.lines,
        recognized: recognition
            .recognized
            .iter()
            .map(|(location, entry)| DebugBox {
                x: location.x,
                y: location.y,
                width: entry.width,
                height: entry.height,
                text: Some(&entry.text),
                glyph: None,
            })
            .collect(),
        unresolved: recognition
            .unresolved
            .iter()
            .map(|blob| DebugBox {
                x: blob.location.x,
                y: blob.location.y,
                width: blob.glyph.width(),
                height: blob.glyph.height(),
                text: None,
                glyph: Some(blob.glyph.to_ascii()),
            })
            .collect(),
        stats: recognition.stats,
    };
    let json_path = config.json_path();
    let json = serde_json::to_vec_pretty(&report)?;
    std::fs::write(&json_path, json)
        .with_context(|| format!("failed to write ocr debug json: {}", json_path.display()))?;
    info!(
        image = %image_path.display(),
        json = %json_path.display(),
        "wrote ocr debug artifacts"
    );
    Ok(())
}

fn render_boxes(bitmap: &Bitmap, recognition: &Recognition) -> RgbImage {
    let mut image = RgbImage::from_pixel(bitmap.width() as u32, bitmap.height() as u32, PAPER);
    for y in 0..bitmap.height() {
        for x in 0..bitmap.width() {
            if bitmap.get(x, y) {
                image.put_pixel(x as u32, y as u32, INK);
            }
        }
    }
    for (location, entry) in &recognition.recognized {
        outline(&mut image, location.x, location.y, entry.width, entry.height, RECOGNIZED);
    }
    for blob in &recognition.unresolved {
        outline(
            &mut image,
            blob.location.x,
            blob.location.y,
            blob.glyph.width(),
            blob.glyph.height(),
            UNRESOLVED,
        );
    }
    image
}

/// Draws a one pixel frame just outside the box, clipped to the image.
fn outline(image: &mut RgbImage, x: usize, y: usize, width: usize, height: usize, color: Rgb<u8>) {
    let (image_width, image_height) = (image.width() as i64, image.height() as i64);
    let left = x as i64 - 1;
    let top = y as i64 - 1;
    let right = (x + width) as i64;
    let bottom = (y + height) as i64;
    let mut plot = |px: i64, py: i64| {
        if px >= 0 && py >= 0 && px < image_width && py < image_height {
            image.put_pixel(px as u32, py as u32, color);
        }
    };
    for px in left..=right {
        plot(px, top);
        plot(px, bottom);
    }
    for py in top..=bottom {
        plot(left, py);
        plot(right, py);
    }
}

fn sanitize_filename_component(value: &str) -> String {
    let mut out = String::new();
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else if ch.is_whitespace() {
            out.push('_');
        }
    }
    if out.is_empty() {
        "input".to_string()
    } else {
        out
    }
}
