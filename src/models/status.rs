// Wire shapes of the three backend responses, validated into snapshot sections.
// Validation errors are plain reasons; the aggregator wraps them with the endpoint.

use std::collections::{BTreeMap, HashSet};

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::ContainerStatus;
use super::snapshot::{
    ArchiveSummary, DataSection, MetricReading, Percent, ServiceStatus, ServicesSection,
    SystemSection, parse_sample_date,
};

/// GET /status/system
#[derive(Debug, Clone, Deserialize)]
pub struct SystemStatusResponse {
    pub cpu: f64,
    pub ram: f64,
    pub disk: f64,
    #[serde(deserialize_with = "objects")]
    pub containers: Vec<ContainerEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerEntry {
    pub id: String,
    pub name: String,
    pub status: String,
}

/// GET /status/services. A missing or null label means the service state is unknown.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesStatusResponse {
    #[serde(default)]
    pub redis: Option<String>,
    #[serde(default)]
    pub ingestor: Option<String>,
}

/// GET /status/data
#[derive(Debug, Clone, Deserialize)]
pub struct DataStatusResponse {
    pub streams: BTreeMap<String, u64>,
    #[serde(alias = "arctic", deserialize_with = "object")]
    pub archive: ArchiveResponse,
}

/// Archive probe result. On probe failure the backend sends only `error`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveResponse {
    #[serde(default)]
    pub symbol_count: Option<u64>,
    #[serde(default)]
    pub sample_dates: BTreeMap<String, String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Parse a response body that must be a JSON object.
/// Derived struct impls also accept arrays and fill fields by position.
pub fn from_object_slice<W: DeserializeOwned>(body: &[u8]) -> serde_json::Result<W> {
    let map: Map<String, Value> = serde_json::from_slice(body)?;
    W::deserialize(Value::Object(map))
}

fn object<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let map = Map::<String, Value>::deserialize(d)?;
    T::deserialize(Value::Object(map)).map_err(D::Error::custom)
}

fn objects<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Vec::<Map<String, Value>>::deserialize(d)?
        .into_iter()
        .map(|map| T::deserialize(Value::Object(map)).map_err(D::Error::custom))
        .collect()
}

fn metric(field: &str, value: f64) -> Result<MetricReading, String> {
    Percent::new(value)
        .map(MetricReading::new)
        .ok_or_else(|| format!("{field} must be a percentage in [0, 100], got {value}"))
}

impl TryFrom<SystemStatusResponse> for SystemSection {
    type Error = String;

    fn try_from(r: SystemStatusResponse) -> Result<Self, Self::Error> {
        let cpu = metric("cpu", r.cpu)?;
        let ram = metric("ram", r.ram)?;
        let disk = metric("disk", r.disk)?;
        let mut containers = Vec::with_capacity(r.containers.len());
        let mut ids = HashSet::new();
        for (i, c) in r.containers.into_iter().enumerate() {
            if c.id.is_empty() {
                return Err(format!("containers[{i}].id must be non-empty"));
            }
            if !ids.insert(c.id.clone()) {
                return Err(format!("containers[{i}].id {:?} is not unique", c.id));
            }
            containers.push(ContainerStatus::new(c.id, c.name, c.status));
        }
        Ok(SystemSection {
            cpu,
            ram,
            disk,
            containers,
        })
    }
}

impl TryFrom<ServicesStatusResponse> for ServicesSection {
    type Error = String;

    fn try_from(r: ServicesStatusResponse) -> Result<Self, Self::Error> {
        Ok(ServicesSection {
            redis: ServiceStatus::from_label(r.redis),
            ingestor: ServiceStatus::from_label(r.ingestor),
        })
    }
}

impl TryFrom<DataStatusResponse> for DataSection {
    type Error = String;

    fn try_from(r: DataStatusResponse) -> Result<Self, Self::Error> {
        let ArchiveResponse {
            symbol_count,
            sample_dates,
            error,
        } = r.archive;

        let symbol_count = match (symbol_count, &error) {
            (Some(n), _) => n,
            (None, Some(_)) => 0,
            (None, None) => return Err("archive.symbol_count is required".into()),
        };

        let mut dates = BTreeMap::new();
        for (symbol, raw) in sample_dates {
            let parsed = parse_sample_date(&raw)
                .map_err(|reason| format!("archive.sample_dates.{symbol}: {reason}"))?;
            dates.insert(symbol, parsed);
        }

        Ok(DataSection {
            streams: r.streams,
            archive: ArchiveSummary {
                symbol_count,
                sample_dates: dates,
                error,
            },
        })
    }
}
