mod ge;
mod grammar;
mod reconcile;
mod siemens;

use anyhow::{anyhow, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub use grammar::parse_dose_screen;
pub use reconcile::{reconcile, Reconciliation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Ge,
    Siemens,
}

impl Vendor {
    pub fn as_str(self) -> &'static str {
        match self {
            Vendor::Ge => "ge",
            Vendor::Siemens => "siemens",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ge" | "gems" => Ok(Vendor::Ge),
            "siemens" => Ok(Vendor::Siemens),
            other => Err(anyhow!("unknown vendor: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanType {
    Localizer,
    Helical,
    Axial,
    Stationary,
    Unknown(String),
}

impl ScanType {
    pub fn from_label(label: &str) -> Self {
        let label = label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        match label.as_str() {
            "SCOUT" | "TOPOGRAM" => ScanType::Localizer,
            "HELICAL" | "SPIRAL" => ScanType::Helical,
            "AXIAL" | "SEQ" | "SEQUENCE" => ScanType::Axial,
            "CINE" | "SMARTPREP" | "SMART PREP" | "MONITORING" => ScanType::Stationary,
            _ => ScanType::Unknown(label),
        }
    }
}

impl Default for ScanType {
    fn default() -> Self {
        ScanType::Unknown(String::new())
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanType::Localizer => f.write_str("LOCALIZER"),
            ScanType::Helical => f.write_str("HELICAL"),
            ScanType::Axial => f.write_str("AXIAL"),
            ScanType::Stationary => f.write_str("STATIONARY"),
            ScanType::Unknown(label) => f.write_str(label),
        }
    }
}

impl Serialize for ScanType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phantom {
    #[serde(rename = "HEAD16")]
    Head16,
    #[serde(rename = "BODY16")]
    Body16,
    #[serde(rename = "BODY32")]
    Body32,
}

impl Phantom {
    pub fn from_name_and_size(name: &str, size: &str) -> Option<Self> {
        match (name.trim().to_ascii_uppercase().as_str(), size.trim()) {
            ("HEAD", "16") => Some(Phantom::Head16),
            ("BODY", "16") => Some(Phantom::Body16),
            ("BODY", "32") => Some(Phantom::Body32),
            _ => None,
        }
    }

    /// The one-letter code Siemens appends to CTDIvol.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "S" | "s" => Some(Phantom::Head16),
            "L" | "l" => Some(Phantom::Body32),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phantom::Head16 => "HEAD16",
            Phantom::Body16 => "BODY16",
            Phantom::Body32 => "BODY32",
        }
    }
}

impl fmt::Display for Phantom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    #[serde(rename = "S")]
    Superior,
    #[serde(rename = "I")]
    Inferior,
}

/// A table position such as `S19.250` or `I658.250`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnatomicalLocation {
    pub direction: Direction,
    pub magnitude: String,
}

impl AnatomicalLocation {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let mut chars = text.chars();
        let direction = match chars.next()? {
            'S' | 's' => Direction::Superior,
            'I' | 'i' => Direction::Inferior,
            _ => return None,
        };
        let magnitude = chars.as_str();
        magnitude.parse::<f64>().ok()?;
        Some(Self {
            direction,
            magnitude: magnitude.to_string(),
        })
    }

    pub fn signed(&self) -> Option<f64> {
        let value = self.magnitude.parse::<f64>().ok()?;
        Some(match self.direction {
            Direction::Superior => value,
            Direction::Inferior => -value,
        })
    }
}

impl fmt::Display for AnatomicalLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.direction {
            Direction::Superior => 'S',
            Direction::Inferior => 'I',
        };
        write!(f, "{}{}", prefix, self.magnitude)
    }
}

impl Serialize for AnatomicalLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRange {
    pub start: AnatomicalLocation,
    pub end: AnatomicalLocation,
}

impl ScanRange {
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        Some(Self {
            start: AnatomicalLocation::parse(start)?,
            end: AnatomicalLocation::parse(end)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DoseAcquisition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub scan_type: ScanType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_range: Option<ScanRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kvp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tube_current_ma: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_mas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_mas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctdi_vol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dlp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phantom: Option<Phantom>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice_thickness: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoseScreen {
    pub vendor: Vendor,
    pub acquisitions: Vec<DoseAcquisition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_dlp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_mas: Option<String>,
}

impl DoseScreen {
    pub fn new(vendor: Vendor) -> Self {
        Self {
            vendor,
            acquisitions: Vec::new(),
            total_dlp: None,
            total_mas: None,
        }
    }

    pub fn reconcile(&self) -> Option<Reconciliation> {
        reconcile(self.total_dlp.as_deref()?, &self.acquisitions)
    }
}

/// Appends `.00` to a DLP printed without a fractional part.
pub fn normalize_dlp(value: &str) -> String {
    let value = value.trim();
    if value.contains('.') {
        value.to_string()
    } else {
        format!("{}.00", value)
    }
}
