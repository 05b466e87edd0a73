// Snapshot aggregation: three concurrent sub-fetches, validated and merged all-or-nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::backend::{Endpoint, StatusSource};
use crate::error::{AggregationError, FetchError};
use crate::models::{
    DataSection, DataStatusResponse, ServicesSection, ServicesStatusResponse, Snapshot,
    SystemSection, SystemStatusResponse, from_object_slice,
};

/// Wall-clock source for `captured_at`.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct SnapshotAggregator<S> {
    source: S,
    timeout: Duration,
    clock: Clock,
}

impl<S: StatusSource> SnapshotAggregator<S> {
    /// `timeout` bounds each sub-fetch; an elapsed sub-fetch fails the cycle like any other error.
    pub fn new(source: S, timeout: Duration) -> Self {
        Self::with_clock(source, timeout, Arc::new(Utc::now))
    }

    pub fn with_clock(source: S, timeout: Duration, clock: Clock) -> Self {
        Self {
            source,
            timeout,
            clock,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs one poll cycle. Returns a snapshot only if all three endpoints succeed and validate.
    #[instrument(skip(self), fields(operation = "fetch_snapshot"))]
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, AggregationError> {
        let (system, services, data) = tokio::join!(
            self.fetch_section::<SystemStatusResponse, SystemSection>(Endpoint::System),
            self.fetch_section::<ServicesStatusResponse, ServicesSection>(Endpoint::Services),
            self.fetch_section::<DataStatusResponse, DataSection>(Endpoint::Data),
        );
        let captured_at = (self.clock)();

        match (system, services, data) {
            (Ok(system), Ok(services), Ok(data)) => Ok(Snapshot {
                system,
                services,
                data,
                captured_at,
            }),
            (system, services, data) => Err(AggregationError::new(
                [system.err(), services.err(), data.err()]
                    .into_iter()
                    .flatten()
                    .collect(),
            )),
        }
    }

    async fn fetch_section<W, T>(&self, endpoint: Endpoint) -> Result<T, FetchError>
    where
        W: DeserializeOwned,
        T: TryFrom<W, Error = String>,
    {
        let body = tokio::time::timeout(self.timeout, self.source.fetch(endpoint))
            .await
            .map_err(|_| FetchError::Timeout {
                endpoint,
                timeout_ms: self.timeout.as_millis() as u64,
            })??;
        decode::<W, T>(endpoint, &body)
    }
}

/// Parse and validate one endpoint body. Invalid JSON, a body that is not an object, and
/// out-of-contract values are all schema violations.
pub fn decode<W, T>(endpoint: Endpoint, body: &[u8]) -> Result<T, FetchError>
where
    W: DeserializeOwned,
    T: TryFrom<W, Error = String>,
{
    let wire: W = from_object_slice(body).map_err(|e| FetchError::SchemaViolation {
        endpoint,
        reason: e.to_string(),
    })?;
    T::try_from(wire).map_err(|reason| FetchError::SchemaViolation { endpoint, reason })
}
