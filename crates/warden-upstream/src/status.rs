use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;

use warden_core::TimedCache;
use warden_types::error::CoreError;
use warden_types::records::{ServiceState, ServiceStatus, StatusSnapshot};

use crate::client::{ProbeOutcome, UpstreamClient};

/// How long one snapshot stays fresh.
pub const SNAPSHOT_FRESHNESS: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ServiceTarget {
    pub name: String,
    pub url: String,
}

/// Probes the configured services and caches the result.
///
/// Snapshots are immutable; a `Fixed` state means the previous snapshot
/// had the service `Down` and this probe found it `Up` again. Concurrent
/// `current()` callers during a refresh share one probe fan-out via the
/// cache's single-flight guard.
#[derive(Clone)]
pub struct StatusAggregator {
    client: UpstreamClient,
    services: Arc<Vec<ServiceTarget>>,
    cache: TimedCache<StatusSnapshot>,
    previous: Arc<Mutex<HashMap<String, ServiceState>>>,
}

impl StatusAggregator {
    pub fn new(client: UpstreamClient, services: Vec<ServiceTarget>) -> Self {
        Self {
            client,
            services: Arc::new(services),
            cache: TimedCache::new(),
            previous: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The current snapshot, probing only if the cached one has gone
    /// stale.
    pub async fn current(&self) -> Result<StatusSnapshot, CoreError> {
        self.cache
            .get_or_refresh(SNAPSHOT_FRESHNESS, || self.probe_all())
            .await
    }

    async fn probe_all(&self) -> Result<StatusSnapshot, CoreError> {
        let probes = self
            .services
            .iter()
            .map(|target| async {
                let outcome = self.client.probe(&target.url).await;
                (target.name.clone(), outcome)
            })
            .collect::<Vec<_>>();

        let outcomes = join_all(probes).await;

        let mut previous = self.previous.lock().unwrap();
        let services = outcomes
            .into_iter()
            .map(|(name, outcome)| {
                let state = next_state(previous.get(&name).copied(), outcome);
                previous.insert(name.clone(), state);
                ServiceStatus { service: name, state }
            })
            .collect();

        Ok(StatusSnapshot {
            services,
            checked_at: Utc::now(),
        })
    }
}

/// Derive a service's reported state from its last reported state and the
/// fresh probe outcome.
fn next_state(prev: Option<ServiceState>, outcome: ProbeOutcome) -> ServiceState {
    match outcome {
        ProbeOutcome::Up => match prev {
            Some(ServiceState::Down) => ServiceState::Fixed,
            _ => ServiceState::Up,
        },
        ProbeOutcome::Down => ServiceState::Down,
        ProbeOutcome::Unreachable => ServiceState::Unknown,
    }
}
