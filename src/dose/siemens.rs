use regex::Captures;

use super::grammar::{dlp, label, number, text, total, LineMatch, LineRule};
use super::{DoseAcquisition, Phantom, ScanType};

pub(super) const RULES: &[LineRule] = &[
    LineRule {
        name: "siemens-total-mas-dlp",
        pattern: r"^TOTAL\s+MAS\s+(?P<mas>[0-9][0-9.]*)\s+TOTAL\s+DLP\s*:?\s*(?P<dlp>[0-9][0-9.]*)(?:\s*MGY\S*)?$",
        extract: total,
    },
    LineRule {
        name: "siemens-total-dlp-mas",
        pattern: r"^TOTAL\s+DLP\s*:?\s*(?P<dlp>[0-9][0-9.]*)(?:\s*MGY\S*)?\s+TOTAL\s+MAS\s+(?P<mas>[0-9][0-9.]*)$",
        extract: total,
    },
    LineRule {
        name: "siemens-total-dlp",
        pattern: r"^TOTAL\s+DLP\s*:?\s*(?P<dlp>[0-9][0-9.]*)(?:\s*MGY\S*)?$",
        extract: total,
    },
    LineRule {
        name: "siemens-reference-phantom",
        pattern: r"^(?P<label>[A-Z][A-Z0-9_.+\s]*?)\s+(?P<series>\d+)\s+(?P<kv>\d+)\s+(?P<mas>[0-9][0-9.]*)\s*/\s*(?P<reference>[0-9][0-9.]*)\s+(?P<ctdi>[0-9][0-9.]*)\s*(?P<code>[LS])\s+(?P<dlp>[0-9][0-9.]*)\s+(?P<time>[0-9][0-9.]*)\s+(?P<slice>[0-9][0-9.]*)$",
        extract: acquisition,
    },
    LineRule {
        name: "siemens-reference",
        pattern: r"^(?P<label>[A-Z][A-Z0-9_.+\s]*?)\s+(?P<series>\d+)\s+(?P<kv>\d+)\s+(?P<mas>[0-9][0-9.]*)\s*/\s*(?P<reference>[0-9][0-9.]*)\s+(?P<ctdi>[0-9][0-9.]*)\s+(?P<dlp>[0-9][0-9.]*)\s+(?P<time>[0-9][0-9.]*)\s+(?P<slice>[0-9][0-9.]*)$",
        extract: acquisition,
    },
    LineRule {
        name: "siemens-plain",
        pattern: r"^(?P<label>[A-Z][A-Z0-9_.+\s]*?)\s+(?P<series>\d+)\s+(?P<kv>\d+)\s+(?P<mas>[0-9][0-9.]*)\s+(?P<ctdi>[0-9][0-9.]*)\s*(?P<code>[LS])?\s+(?P<dlp>[0-9][0-9.]*)\s+(?P<time>[0-9][0-9.]*)\s+(?P<slice>[0-9][0-9.]*)$",
        extract: acquisition,
    },
    LineRule {
        name: "siemens-topogram",
        pattern: r"^(?P<label>[A-Z][A-Z0-9_.+\s]*?)\s+(?P<series>\d+)\s+(?P<kv>\d+)\s+(?P<ma>[0-9][0-9.]*)\s*MA\s+(?P<time>[0-9][0-9.]*)\s+(?P<slice>[0-9][0-9.]*)$",
        extract: acquisition,
    },
];

fn acquisition(captures: &Captures<'_>) -> Option<LineMatch> {
    let protocol = label(captures, "label")?;
    let phantom = text(captures, "code").and_then(|code| Phantom::from_code(&code));
    Some(LineMatch::Acquisition(DoseAcquisition {
        series: text(captures, "series"),
        scan_type: ScanType::from_label(&protocol),
        label: Some(protocol),
        kvp: number(captures, "kv"),
        tube_current_ma: number(captures, "ma"),
        exposure_mas: number(captures, "mas"),
        reference_mas: number(captures, "reference"),
        ctdi_vol: number(captures, "ctdi"),
        dlp: dlp(captures, "dlp"),
        phantom,
        exposure_time: number(captures, "time"),
        slice_thickness: number(captures, "slice"),
        ..DoseAcquisition::default()
    }))
}
