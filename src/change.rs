// Change detection between consecutive committed snapshots.
// Each logical entity is reduced to a classified state; transitions are emitted in key order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::classify::{Liveness, Severity};
use crate::models::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cpu,
    Ram,
    Disk,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Cpu => "cpu",
            Metric::Ram => "ram",
            Metric::Disk => "disk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Redis,
    Ingestor,
}

impl Service {
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Redis => "redis",
            Service::Ingestor => "ingestor",
        }
    }
}

/// Logical entity identity. Ordered by kind, then by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum EntityKey {
    Metric(Metric),
    Service(Service),
    Container(String),
    Stream(String),
    Archive,
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Metric(m) => write!(f, "metric:{}", m.as_str()),
            EntityKey::Service(s) => write!(f, "service:{}", s.as_str()),
            EntityKey::Container(id) => write!(f, "container:{id}"),
            EntityKey::Stream(symbol) => write!(f, "stream:{symbol}"),
            EntityKey::Archive => f.write_str("archive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Severity,
    Liveness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntityState {
    Severity(Severity),
    Liveness(Liveness),
}

impl EntityState {
    pub fn field(self) -> Field {
        match self {
            EntityState::Severity(_) => Field::Severity,
            EntityState::Liveness(_) => Field::Liveness,
        }
    }
}

/// A change of one entity's classified state. `None` means the entity is absent on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub key: EntityKey,
    pub field: Field,
    pub from: Option<EntityState>,
    pub to: Option<EntityState>,
}

fn entity_states(s: &Snapshot) -> BTreeMap<EntityKey, EntityState> {
    let mut out = BTreeMap::new();
    for (metric, reading) in [
        (Metric::Cpu, &s.system.cpu),
        (Metric::Ram, &s.system.ram),
        (Metric::Disk, &s.system.disk),
    ] {
        out.insert(
            EntityKey::Metric(metric),
            EntityState::Severity(reading.severity),
        );
    }
    for (service, status) in [
        (Service::Redis, &s.services.redis),
        (Service::Ingestor, &s.services.ingestor),
    ] {
        out.insert(
            EntityKey::Service(service),
            EntityState::Liveness(status.liveness),
        );
    }
    for c in &s.system.containers {
        out.insert(
            EntityKey::Container(c.id.clone()),
            EntityState::Liveness(c.liveness()),
        );
    }
    for (symbol, count) in &s.data.streams {
        let flowing = if *count > 0 {
            Liveness::Up
        } else {
            Liveness::Down
        };
        out.insert(
            EntityKey::Stream(symbol.clone()),
            EntityState::Liveness(flowing),
        );
    }
    let archive = if s.data.archive.error.is_some() {
        Liveness::Down
    } else {
        Liveness::Up
    };
    out.insert(EntityKey::Archive, EntityState::Liveness(archive));
    out
}

/// Transitions from `previous` to `current`, sorted by entity key.
/// With no previous snapshot every entity appears with `from = None`.
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> Vec<Transition> {
    let before = previous.map(entity_states).unwrap_or_default();
    let after = entity_states(current);

    let keys: BTreeSet<&EntityKey> = before.keys().chain(after.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let from = before.get(key).copied();
            let to = after.get(key).copied();
            if from == to {
                return None;
            }
            let field = to.or(from)?.field();
            Some(Transition {
                key: key.clone(),
                field,
                from,
                to,
            })
        })
        .collect()
}
