use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::dose::Vendor;
use crate::ocr::{OcrOptions, Tolerance, DEFAULT_CONNECTION_LIMIT, DEFAULT_WORD_GAP};
use crate::paths;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub connection_limit: usize,
    pub word_gap: usize,
    pub ge_tolerance: Tolerance,
    pub siemens_tolerance: Tolerance,
    pub dictionary_path: Option<PathBuf>,
    pub training_output: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            word_gap: DEFAULT_WORD_GAP,
            ge_tolerance: Tolerance::new(3, 3),
            siemens_tolerance: Tolerance::new(3, 1),
            dictionary_path: None,
            training_output: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    ocr: Option<OcrSettings>,
    vendor: Option<VendorSettings>,
    dictionary: Option<DictionarySettings>,
    training: Option<TrainingSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    connection_limit: Option<usize>,
    word_gap: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct VendorSettings {
    ge: Option<GapSettings>,
    siemens: Option<GapSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct GapSettings {
    gap_x: Option<usize>,
    gap_y: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct DictionarySettings {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TrainingSettings {
    output: Option<String>,
}

/// Loads the embedded defaults, then `./settings.toml`,
/// `./settings.local.toml`, the same pair under the settings directory, and
/// finally `extra_path`, which must exist when given.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    ensure_home_settings_file()?;
    let base = paths::settings_dir();
    load_settings_from(Path::new("."), base.as_deref(), extra_path)
}

pub(crate) fn load_settings_from(
    working_dir: &Path,
    base_dir: Option<&Path>,
    extra_path: Option<&Path>,
) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse embedded settings")?;
    settings.merge(defaults);

    let mut ordered_paths = vec![
        working_dir.join("settings.toml"),
        working_dir.join("settings.local.toml"),
    ];
    if let Some(base) = base_dir {
        ordered_paths.push(base.join("settings.toml"));
        ordered_paths.push(base.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn tolerance(&self, vendor: Vendor) -> Tolerance {
        match vendor {
            Vendor::Ge => self.ge_tolerance,
            Vendor::Siemens => self.siemens_tolerance,
        }
    }

    pub fn ocr_options(&self, vendor: Vendor) -> OcrOptions {
        OcrOptions {
            tolerance: self.tolerance(vendor),
            connection_limit: self.connection_limit,
            word_gap: self.word_gap,
        }
    }

    pub fn dictionary_path(&self) -> PathBuf {
        self.dictionary_path
            .clone()
            .unwrap_or_else(paths::default_dictionary_path)
    }

    pub fn training_output(&self) -> PathBuf {
        self.training_output
            .clone()
            .unwrap_or_else(paths::default_training_output)
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(ocr) = incoming.ocr {
            if let Some(limit) = ocr.connection_limit {
                if limit > 0 {
                    self.connection_limit = limit;
                }
            }
            if let Some(gap) = ocr.word_gap {
                self.word_gap = gap;
            }
        }
        if let Some(vendor) = incoming.vendor {
            if let Some(ge) = vendor.ge {
                merge_gaps(&mut self.ge_tolerance, ge);
            }
            if let Some(siemens) = vendor.siemens {
                merge_gaps(&mut self.siemens_tolerance, siemens);
            }
        }
        if let Some(dictionary) = incoming.dictionary {
            if let Some(path) = dictionary.path.as_deref().and_then(paths::normalize_dir) {
                self.dictionary_path = Some(path);
            }
        }
        if let Some(training) = incoming.training {
            if let Some(path) = training.output.as_deref().and_then(paths::normalize_dir) {
                self.training_output = Some(path);
            }
        }
    }
}

fn merge_gaps(tolerance: &mut Tolerance, incoming: GapSettings) {
    if let Some(gap) = incoming.gap_x {
        if gap > 0 {
            tolerance.x = gap;
        }
    }
    if let Some(gap) = incoming.gap_y {
        if gap > 0 {
            tolerance.y = gap;
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = paths::settings_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults() {
        let cwd = tempfile::tempdir().expect("tempdir");
        let settings = load_settings_from(cwd.path(), None, None).expect("settings");
        assert_eq!(settings, Settings::default());
        let ge = settings.ocr_options(Vendor::Ge);
        assert_eq!(ge.tolerance, Tolerance::new(3, 3));
        assert_eq!(ge.connection_limit, 1000);
        assert_eq!(ge.word_gap, 4);
        assert_eq!(settings.tolerance(Vendor::Siemens), Tolerance::new(3, 1));
    }

    #[test]
    fn later_layers_override_field_by_field() {
        let cwd = tempfile::tempdir().expect("tempdir");
        let base = tempfile::tempdir().expect("tempdir");
        fs::write(
            cwd.path().join("settings.toml"),
            "[ocr]\nword_gap = 6\n[vendor.siemens]\ngap_y = 2\n",
        )
        .expect("write");
        fs::write(
            base.path().join("settings.local.toml"),
            "[ocr]\nconnection_limit = 5000\n[dictionary]\npath = \"/srv/glyphs.xml\"\n",
        )
        .expect("write");
        let extra = cwd.path().join("run.toml");
        fs::write(&extra, "[ocr]\nword_gap = 2\n[vendor.ge]\ngap_x = 0\n").expect("write");

        let settings =
            load_settings_from(cwd.path(), Some(base.path()), Some(&extra)).expect("settings");
        assert_eq!(settings.word_gap, 2);
        assert_eq!(settings.connection_limit, 5000);
        assert_eq!(settings.siemens_tolerance, Tolerance::new(3, 2));
        // zero gaps are ignored
        assert_eq!(settings.ge_tolerance, Tolerance::new(3, 3));
        assert_eq!(settings.dictionary_path(), PathBuf::from("/srv/glyphs.xml"));
    }

    #[test]
    fn missing_explicit_settings_file_is_an_error() {
        let cwd = tempfile::tempdir().expect("tempdir");
        let missing = cwd.path().join("nope.toml");
        let err = load_settings_from(cwd.path(), None, Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }
}
