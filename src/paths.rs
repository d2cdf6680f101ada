use std::path::{Path, PathBuf};

const BASE_DIR_ENV: &str = "DOSE_SCREEN_OCR_DIR";
const BASE_DIR_NAME: &str = ".dose-screen-ocr";

/// `$DOSE_SCREEN_OCR_DIR`, else `~/.dose-screen-ocr`.
pub(crate) fn settings_dir() -> Option<PathBuf> {
    if let Some(dir) = base_dir_override() {
        return Some(dir);
    }
    default_base_dir()
}

pub(crate) fn default_dictionary_path() -> PathBuf {
    base_dir_or_relative().join("glyphs.xml")
}

pub(crate) fn default_training_output() -> PathBuf {
    base_dir_or_relative().join("learned.xml")
}

/// Expands a leading `~` and drops redundant separators. Blank input yields
/// `None`.
pub(crate) fn normalize_dir(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_tilde(trimmed);
    Some(normalize_path(PathBuf::from(expanded)))
}

fn base_dir_or_relative() -> PathBuf {
    settings_dir().unwrap_or_else(|| PathBuf::from(BASE_DIR_NAME))
}

fn base_dir_override() -> Option<PathBuf> {
    std::env::var(BASE_DIR_ENV)
        .ok()
        .and_then(|value| normalize_dir(&value))
}

fn default_base_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(BASE_DIR_NAME))
        }
    })
}

fn normalize_path(path: PathBuf) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        normalized.push(component.as_os_str());
    }
    normalized
}

fn expand_tilde(value: &str) -> String {
    if value == "~" || value.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            let home = home.trim();
            if home.is_empty() {
                return value.to_string();
            }
            if value == "~" {
                return home.to_string();
            }
            return format!("{}{}", home, &value[1..]);
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_dirs_are_rejected() {
        assert_eq!(normalize_dir("   "), None);
    }

    #[test]
    fn redundant_separators_are_dropped() {
        assert_eq!(
            normalize_dir("/tmp//dose/./glyphs"),
            Some(PathBuf::from("/tmp/dose/glyphs"))
        );
    }
}
