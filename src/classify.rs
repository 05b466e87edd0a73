// Severity and liveness classification. Total and side-effect free; called on every render.

use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) of the nominal band.
pub const NOMINAL_MAX: f64 = 50.0;
/// Upper bound (inclusive) of the warning band.
pub const WARNING_MAX: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Nominal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Up,
    Down,
    Unknown,
}

/// `v <= 50` nominal, `50 < v <= 80` warning, otherwise critical (NaN included).
pub fn classify(value: f64) -> Severity {
    if value <= NOMINAL_MAX {
        Severity::Nominal
    } else if value <= WARNING_MAX {
        Severity::Warning
    } else {
        Severity::Critical
    }
}

/// "up" and "running" are up, any other non-empty label is down, missing or empty is unknown.
pub fn classify_liveness(label: Option<&str>) -> Liveness {
    match label {
        None | Some("") => Liveness::Unknown,
        Some("up" | "running") => Liveness::Up,
        Some(_) => Liveness::Down,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_band_boundaries() {
        assert_eq!(classify(30.0), Severity::Nominal);
        assert_eq!(classify(50.0), Severity::Nominal);
        assert_eq!(classify(51.0), Severity::Warning);
        assert_eq!(classify(80.0), Severity::Warning);
        assert_eq!(classify(81.0), Severity::Critical);
        assert_eq!(classify(95.0), Severity::Critical);
    }

    #[test]
    fn classify_between_integer_boundaries() {
        assert_eq!(classify(50.0001), Severity::Warning);
        assert_eq!(classify(80.0001), Severity::Critical);
        assert_eq!(classify(0.0), Severity::Nominal);
    }

    #[test]
    fn classify_is_total_on_non_finite() {
        assert_eq!(classify(f64::NAN), Severity::Critical);
        assert_eq!(classify(f64::INFINITY), Severity::Critical);
        assert_eq!(classify(f64::NEG_INFINITY), Severity::Nominal);
    }

    #[test]
    fn classify_liveness_labels() {
        assert_eq!(classify_liveness(None), Liveness::Unknown);
        assert_eq!(classify_liveness(Some("")), Liveness::Unknown);
        assert_eq!(classify_liveness(Some("up")), Liveness::Up);
        assert_eq!(classify_liveness(Some("running")), Liveness::Up);
        assert_eq!(classify_liveness(Some("stopped")), Liveness::Down);
        assert_eq!(classify_liveness(Some("down")), Liveness::Down);
    }
}
