// Change detector tests

mod common;

use chrono::Duration;
use common::*;
use opsboard::change::{EntityKey, EntityState, Field, Metric, Service, diff};
use opsboard::classify::{Liveness, Severity};
use opsboard::models::{ContainerStatus, MetricReading, Percent, ServiceStatus};

fn reading(v: f64) -> MetricReading {
    MetricReading::new(Percent::new(v).unwrap())
}

#[test]
fn test_first_snapshot_reports_every_entity_as_new() {
    let snapshot = sample_snapshot(base_time());
    let transitions = diff(None, &snapshot);

    let keys: Vec<String> = transitions.iter().map(|t| t.key.to_string()).collect();
    assert_eq!(
        keys,
        vec![
            "metric:cpu",
            "metric:ram",
            "metric:disk",
            "service:redis",
            "service:ingestor",
            "container:c1",
            "stream:AAPL",
            "archive",
        ]
    );
    assert!(transitions.iter().all(|t| t.from.is_none() && t.to.is_some()));
    assert_eq!(
        transitions[1].to,
        Some(EntityState::Severity(Severity::Critical))
    );
}

#[test]
fn test_identical_snapshots_yield_no_transitions() {
    let a = sample_snapshot(base_time());
    let b = sample_snapshot(base_time() + Duration::seconds(2));
    assert!(diff(Some(&a), &b).is_empty());
}

#[test]
fn test_value_change_within_tier_is_not_a_transition() {
    let a = sample_snapshot(base_time());
    let mut b = a.clone();
    b.system.cpu = reading(12.0);
    b.system.disk = reading(79.9);
    b.data.streams.insert("AAPL".into(), 9000);
    assert!(diff(Some(&a), &b).is_empty());
}

#[test]
fn test_tier_and_liveness_changes_are_sorted() {
    let a = sample_snapshot(base_time());
    let mut b = a.clone();
    b.data.archive.error = Some("lmdb: map full".into());
    b.services.ingestor = ServiceStatus::from_label(Some("stopped".into()));
    b.system.cpu = reading(50.01);
    b.data.streams.insert("AAPL".into(), 0);

    let transitions = diff(Some(&a), &b);
    let summary: Vec<_> = transitions
        .iter()
        .map(|t| (t.key.clone(), t.field, t.from, t.to))
        .collect();
    assert_eq!(
        summary,
        vec![
            (
                EntityKey::Metric(Metric::Cpu),
                Field::Severity,
                Some(EntityState::Severity(Severity::Nominal)),
                Some(EntityState::Severity(Severity::Warning)),
            ),
            (
                EntityKey::Service(Service::Ingestor),
                Field::Liveness,
                Some(EntityState::Liveness(Liveness::Up)),
                Some(EntityState::Liveness(Liveness::Down)),
            ),
            (
                EntityKey::Stream("AAPL".into()),
                Field::Liveness,
                Some(EntityState::Liveness(Liveness::Up)),
                Some(EntityState::Liveness(Liveness::Down)),
            ),
            (
                EntityKey::Archive,
                Field::Liveness,
                Some(EntityState::Liveness(Liveness::Up)),
                Some(EntityState::Liveness(Liveness::Down)),
            ),
        ]
    );
}

#[test]
fn test_container_added_and_removed() {
    let a = sample_snapshot(base_time());
    let mut b = a.clone();
    b.system.containers = vec![ContainerStatus::new(
        "c2".into(),
        "redis".into(),
        "exited".into(),
    )];

    let transitions = diff(Some(&a), &b);
    assert_eq!(transitions.len(), 2);
    assert_eq!(transitions[0].key, EntityKey::Container("c1".into()));
    assert_eq!(
        transitions[0].from,
        Some(EntityState::Liveness(Liveness::Up))
    );
    assert_eq!(transitions[0].to, None);
    assert_eq!(transitions[0].field, Field::Liveness);
    assert_eq!(transitions[1].key, EntityKey::Container("c2".into()));
    assert_eq!(transitions[1].from, None);
    assert_eq!(
        transitions[1].to,
        Some(EntityState::Liveness(Liveness::Down))
    );
}

#[test]
fn test_stream_appearing_is_reported() {
    let a = sample_snapshot(base_time());
    let mut b = a.clone();
    b.data.streams.insert("EURUSD".into(), 4);
    let transitions = diff(Some(&a), &b);
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].key, EntityKey::Stream("EURUSD".into()));
    assert_eq!(transitions[0].from, None);
}
