// Shared test helpers: scripted backend source, sample payloads, paused clock

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use opsboard::aggregator::{Clock, SnapshotAggregator, decode};
use opsboard::backend::{Endpoint, StatusSource};
use opsboard::error::FetchError;
use opsboard::models::*;
use std::sync::Arc;

pub const SYSTEM_OK: &str = r#"{"cpu": 45, "ram": 91, "disk": 60,
    "containers": [{"id": "c1", "name": "ingestor", "status": "running"}]}"#;
pub const SERVICES_OK: &str = r#"{"redis": "up", "ingestor": "up"}"#;
pub const DATA_OK: &str = r#"{"streams": {"AAPL": 120},
    "archive": {"symbol_count": 500, "sample_dates": {"AAPL": "2024-01-01T00:00:00+00:00"}}}"#;

pub fn ok_payload(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::System => SYSTEM_OK,
        Endpoint::Services => SERVICES_OK,
        Endpoint::Data => DATA_OK,
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Snapshot decoded from the OK payloads, stamped with `captured_at`.
pub fn sample_snapshot(captured_at: DateTime<Utc>) -> Snapshot {
    Snapshot {
        system: decode::<SystemStatusResponse, SystemSection>(
            Endpoint::System,
            SYSTEM_OK.as_bytes(),
        )
        .unwrap(),
        services: decode::<ServicesStatusResponse, ServicesSection>(
            Endpoint::Services,
            SERVICES_OK.as_bytes(),
        )
        .unwrap(),
        data: decode::<DataStatusResponse, DataSection>(Endpoint::Data, DATA_OK.as_bytes())
            .unwrap(),
        captured_at,
    }
}

/// Clock that follows tokio's (possibly paused) time, starting at `base_time()`.
pub fn tokio_clock() -> Clock {
    let origin = tokio::time::Instant::now();
    Arc::new(move || {
        base_time() + chrono::Duration::from_std(origin.elapsed()).unwrap_or_default()
    })
}

#[derive(Clone)]
struct Script {
    reply: Result<String, FetchError>,
    delay: Duration,
}

/// In-memory backend whose replies and latencies can be changed between cycles.
pub struct ScriptedSource {
    scripts: Mutex<HashMap<Endpoint, Script>>,
    in_flight: Mutex<HashMap<Endpoint, usize>>,
    max_in_flight: Mutex<HashMap<Endpoint, usize>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    /// All endpoints answer with the OK payloads, without delay.
    pub fn healthy() -> Self {
        let scripts = Endpoint::ALL
            .into_iter()
            .map(|e| {
                (
                    e,
                    Script {
                        reply: Ok(ok_payload(e).to_string()),
                        delay: Duration::ZERO,
                    },
                )
            })
            .collect();
        Self {
            scripts: Mutex::new(scripts),
            in_flight: Mutex::new(HashMap::new()),
            max_in_flight: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_body(&self, endpoint: Endpoint, body: &str) {
        self.scripts.lock().unwrap().get_mut(&endpoint).unwrap().reply = Ok(body.to_string());
    }

    pub fn set_error(&self, endpoint: Endpoint, error: FetchError) {
        self.scripts.lock().unwrap().get_mut(&endpoint).unwrap().reply = Err(error);
    }

    pub fn set_delay(&self, endpoint: Endpoint, delay: Duration) {
        self.scripts.lock().unwrap().get_mut(&endpoint).unwrap().delay = delay;
    }

    pub fn set_all_delays(&self, delay: Duration) {
        for e in Endpoint::ALL {
            self.set_delay(e, delay);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent requests seen for one endpoint.
    pub fn max_in_flight(&self, endpoint: Endpoint) -> usize {
        self.max_in_flight
            .lock()
            .unwrap()
            .get(&endpoint)
            .copied()
            .unwrap_or(0)
    }
}

/// Decrements the in-flight count even when the request future is dropped mid-delay.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<Endpoint, usize>>,
    endpoint: Endpoint,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(n) = self.in_flight.lock().unwrap().get_mut(&self.endpoint) {
            *n -= 1;
        }
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch(&self, endpoint: Endpoint) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap()[&endpoint].clone();
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let n = in_flight.entry(endpoint).or_insert(0);
            *n += 1;
            let mut max = self.max_in_flight.lock().unwrap();
            let m = max.entry(endpoint).or_insert(0);
            *m = (*m).max(*n);
        }
        let _done = InFlightGuard {
            in_flight: &self.in_flight,
            endpoint,
        };
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        script.reply.map(Bytes::from)
    }
}

pub fn aggregator(source: ScriptedSource, timeout: Duration) -> SnapshotAggregator<ScriptedSource> {
    SnapshotAggregator::with_clock(source, timeout, tokio_clock())
}
