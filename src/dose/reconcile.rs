use serde::Serialize;
use tracing::{debug, warn};

use super::DoseAcquisition;

/// Printed total against the sum of the acquisitions, both at the total's
/// precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub total: String,
    pub sum: String,
    pub matches: bool,
}

/// Returns `None` when `total` is not a number. Acquisitions without a
/// readable DLP do not contribute to the sum. A mismatch is logged and
/// reported through `matches`.
pub fn reconcile(total: &str, acquisitions: &[DoseAcquisition]) -> Option<Reconciliation> {
    let total = total.trim();
    let total_value = total.parse::<f64>().ok()?;
    let decimals = total
        .split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(0);

    let sum_value: f64 = acquisitions
        .iter()
        .filter_map(|acquisition| acquisition.dlp.as_deref())
        .filter_map(|dlp| dlp.parse::<f64>().ok())
        .sum();

    let total = format!("{:.*}", decimals, total_value);
    let sum = format!("{:.*}", decimals, sum_value);
    let matches = total == sum;
    if matches {
        debug!(total = %total, "total DLP matches acquisition sum");
    } else {
        warn!(total = %total, sum = %sum, "total DLP does not match acquisition sum");
    }
    Some(Reconciliation {
        total,
        sum,
        matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_dlp(dlp: Option<&str>) -> DoseAcquisition {
        DoseAcquisition {
            dlp: dlp.map(str::to_string),
            ..DoseAcquisition::default()
        }
    }

    #[test]
    fn matching_sum() {
        let acquisitions = [with_dlp(Some("1000.50")), with_dlp(None), with_dlp(Some("299.08"))];
        let result = reconcile("1299.58", &acquisitions).expect("reconciliation");
        assert_eq!(
            result,
            Reconciliation {
                total: "1299.58".to_string(),
                sum: "1299.58".to_string(),
                matches: true,
            }
        );
    }

    #[test]
    fn compares_at_total_precision() {
        let acquisitions = [with_dlp(Some("491.6")), with_dlp(Some("12.3"))];
        let result = reconcile("504", &acquisitions).expect("reconciliation");
        assert_eq!(result.sum, "504");
        assert!(result.matches);
    }

    #[test]
    fn mismatch_is_a_value_not_an_error() {
        let acquisitions = [with_dlp(Some("100.00"))];
        let result = reconcile("120.00", &acquisitions).expect("reconciliation");
        assert!(!result.matches);
        assert_eq!(result.sum, "100.00");
    }

    #[test]
    fn unreadable_total_yields_nothing() {
        assert!(reconcile("12.3.4", &[]).is_none());
    }
}
