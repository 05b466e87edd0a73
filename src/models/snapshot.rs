// Merged snapshot of one successful poll cycle

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContainerStatus;
use crate::classify::{Liveness, Severity, classify, classify_liveness};

/// A usage percentage, guaranteed finite and within [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Percent(f64);

impl Percent {
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && (0.0..=100.0).contains(&value)).then_some(Self(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Percent {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Percent::new(value).ok_or_else(|| format!("percentage out of range: {value}"))
    }
}

impl From<Percent> for f64 {
    fn from(p: Percent) -> f64 {
        p.0
    }
}

/// A metric value tagged with its severity tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReading {
    pub value: Percent,
    pub severity: Severity,
}

impl MetricReading {
    pub fn new(value: Percent) -> Self {
        Self {
            value,
            severity: classify(value.get()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSection {
    pub cpu: MetricReading,
    pub ram: MetricReading,
    pub disk: MetricReading,
    pub containers: Vec<ContainerStatus>,
}

/// A named service's reported label and the liveness derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub label: Option<String>,
    pub liveness: Liveness,
}

impl ServiceStatus {
    pub fn from_label(label: Option<String>) -> Self {
        let liveness = classify_liveness(label.as_deref());
        Self { label, liveness }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesSection {
    pub redis: ServiceStatus,
    pub ingestor: ServiceStatus,
}

/// Historical archive summary. `error` marks a degraded archive without failing the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSummary {
    pub symbol_count: u64,
    /// Latest stored bar per symbol; `None` when the symbol's series is empty.
    pub sample_dates: BTreeMap<String, Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSection {
    /// Live event count per symbol.
    pub streams: BTreeMap<String, u64>,
    pub archive: ArchiveSummary,
}

/// One immutable, fully merged poll result. Shared as `Arc<Snapshot>` and replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub system: SystemSection,
    pub services: ServicesSection,
    pub data: DataSection,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn container(&self, id: &str) -> Option<&ContainerStatus> {
        self.system.containers.iter().find(|c| c.id == id)
    }

    /// Sub-system errors embedded in an otherwise valid snapshot.
    pub fn soft_degradations(&self) -> impl Iterator<Item = &str> {
        self.data.archive.error.as_deref().into_iter()
    }
}

/// Parse an archive sample date. Accepts RFC 3339 with `T` or space separator;
/// offset-less values are UTC; the backend's "Empty" marker yields `None`.
pub fn parse_sample_date(raw: &str) -> Result<Option<DateTime<Utc>>, String> {
    if raw == "Empty" {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| Some(naive.and_utc()))
        .map_err(|_| format!("not an ISO-8601 date-time: {raw:?}"))
}
