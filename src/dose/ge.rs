use regex::Captures;

use super::grammar::{dlp, label, number, text, total, LineMatch, LineRule};
use super::{DoseAcquisition, Phantom, ScanRange, ScanType};

pub(super) const RULES: &[LineRule] = &[
    LineRule {
        name: "ge-total-exam-dlp",
        pattern: r"^TOTAL\s+EXAM\s+DLP\s*:?\s*(?P<dlp>[0-9][0-9.]*)$",
        extract: total,
    },
    LineRule {
        name: "ge-exam-total-dlp",
        pattern: r"^EXAM\s+TOTAL\s+DLP\s*:?\s*(?P<dlp>[0-9][0-9.]*)$",
        extract: total,
    },
    LineRule {
        name: "ge-total-dlp",
        pattern: r"^TOTAL\s+DLP\s*:?\s*(?P<dlp>[0-9][0-9.]*)$",
        extract: total,
    },
    LineRule {
        name: "ge-ranged-phantom",
        pattern: r"^(?P<series>\d+)\s+(?P<kind>[A-Z][A-Z\s]*?)\s+(?P<start>[SI][0-9.]+)\s*-\s*(?P<end>[SI][0-9.]+)\s+(?P<ctdi>[0-9][0-9.]*)\s+(?P<dlp>[0-9][0-9.]*)\s+(?P<phantom>BODY|HEAD)\s*(?P<size>\d+)$",
        extract: acquisition,
    },
    LineRule {
        name: "ge-ranged",
        pattern: r"^(?P<series>\d+)\s+(?P<kind>[A-Z][A-Z\s]*?)\s+(?P<start>[SI][0-9.]+)\s*-\s*(?P<end>[SI][0-9.]+)\s+(?P<ctdi>[0-9][0-9.]*)\s+(?P<dlp>[0-9][0-9.]*)$",
        extract: acquisition,
    },
    LineRule {
        name: "ge-unranged",
        pattern: r"^(?P<series>\d+)\s+(?P<kind>[A-Z][A-Z\s]*?)\s+(?P<ctdi>[0-9][0-9.]*)\s+(?P<dlp>[0-9][0-9.]*)(?:\s+(?P<phantom>BODY|HEAD)\s*(?P<size>\d+))?$",
        extract: acquisition,
    },
    LineRule {
        name: "ge-scout",
        pattern: r"^(?P<series>\d+)\s+(?P<kind>SCOUT)(?:\s*-)*$",
        extract: acquisition,
    },
];

fn acquisition(captures: &Captures<'_>) -> Option<LineMatch> {
    let kind = label(captures, "kind")?;
    let scan_range = match (text(captures, "start"), text(captures, "end")) {
        (Some(start), Some(end)) => ScanRange::parse(&start, &end),
        _ => None,
    };
    let phantom = match (text(captures, "phantom"), text(captures, "size")) {
        (Some(name), Some(size)) => Phantom::from_name_and_size(&name, &size),
        _ => None,
    };
    Some(LineMatch::Acquisition(DoseAcquisition {
        series: text(captures, "series"),
        scan_type: ScanType::from_label(&kind),
        label: Some(kind),
        scan_range,
        ctdi_vol: number(captures, "ctdi"),
        dlp: dlp(captures, "dlp"),
        phantom,
        ..DoseAcquisition::default()
    }))
}

#[cfg(test)]
mod tests {
    use crate::dose::{parse_dose_screen, Phantom, ScanType, Vendor};

    #[test]
    fn helical_line_with_range_and_phantom() {
        let screen = parse_dose_screen(
            &["2 HELICAL S19.250-I658.250 17.95 1299.58 BODY 32"],
            Vendor::Ge,
            Some("1.2.840.1"),
        )
        .expect("parse");
        assert_eq!(screen.acquisitions.len(), 1);
        let acquisition = &screen.acquisitions[0];
        assert_eq!(acquisition.scope.as_deref(), Some("1.2.840.1"));
        assert_eq!(acquisition.series.as_deref(), Some("2"));
        assert_eq!(acquisition.scan_type, ScanType::Helical);
        let range = acquisition.scan_range.as_ref().expect("range");
        assert_eq!(range.start.to_string(), "S19.250");
        assert_eq!(range.end.to_string(), "I658.250");
        assert_eq!(acquisition.ctdi_vol.as_deref(), Some("17.95"));
        assert_eq!(acquisition.dlp.as_deref(), Some("1299.58"));
        assert_eq!(acquisition.phantom, Some(Phantom::Body32));
    }

    #[test]
    fn total_exam_dlp_reconciles() {
        let screen = parse_dose_screen(
            &[
                "2 HELICAL S19.250-I658.250 17.95 1299.58 BODY 32",
                "Total Exam DLP: 1299.58",
            ],
            Vendor::Ge,
            None,
        )
        .expect("parse");
        assert_eq!(screen.total_dlp.as_deref(), Some("1299.58"));
        let reconciliation = screen.reconcile().expect("reconciliation");
        assert!(reconciliation.matches);
    }

    #[test]
    fn dlp_without_decimals_is_normalized() {
        let screen = parse_dose_screen(
            &["3\tAxial\tI10.000-I40.000\t21.4\t312\tHead 16", "Exam Total DLP 312"],
            Vendor::Ge,
            None,
        )
        .expect("parse");
        let acquisition = &screen.acquisitions[0];
        assert_eq!(acquisition.dlp.as_deref(), Some("312.00"));
        assert_eq!(acquisition.scan_type, ScanType::Axial);
        assert_eq!(acquisition.phantom, Some(Phantom::Head16));
        assert_eq!(screen.total_dlp.as_deref(), Some("312.00"));
    }

    #[test]
    fn scout_and_stationary_rows() {
        let screen = parse_dose_screen(
            &["1 Scout - - - -", "4 Smart Prep 5.62 2.81"],
            Vendor::Ge,
            None,
        )
        .expect("parse");
        assert_eq!(screen.acquisitions.len(), 2);
        assert_eq!(screen.acquisitions[0].scan_type, ScanType::Localizer);
        assert_eq!(screen.acquisitions[0].dlp, None);
        assert_eq!(screen.acquisitions[1].scan_type, ScanType::Stationary);
        assert_eq!(screen.acquisitions[1].label.as_deref(), Some("SMART PREP"));
        assert_eq!(screen.acquisitions[1].dlp.as_deref(), Some("2.81"));
        assert_eq!(screen.acquisitions[1].scan_range, None);
    }

    #[test]
    fn unparsable_number_is_absent_not_zero() {
        let screen = parse_dose_screen(
            &["2 HELICAL S19.250-I658.250 17.9.5 1299.58 BODY 32"],
            Vendor::Ge,
            None,
        )
        .expect("parse");
        let acquisition = &screen.acquisitions[0];
        assert_eq!(acquisition.ctdi_vol, None);
        assert_eq!(acquisition.dlp.as_deref(), Some("1299.58"));
    }
}
