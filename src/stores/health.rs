//! Backend connectivity status and the background poller that feeds it.
//!
//! Health is advisory: nothing here ever surfaces an error, and other
//! flows never wait on it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::Store;
use crate::client::BackendClient;
use crate::config::{ClientConfig, HEALTH_POLL_INTERVAL, HEALTH_RETRIES, HEALTH_RETRY_DELAY};
use crate::models::{HealthState, HealthStatus};

#[derive(Default)]
pub struct HealthStore {
    status: Store<HealthStatus>,
}

impl HealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> HealthStatus {
        self.status.get()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<HealthStatus> {
        self.status.subscribe()
    }

    /// Record a check result, stamped with the current time.
    pub fn record(&self, state: HealthState) {
        self.status.set(HealthStatus {
            status: state,
            last_check: chrono::Utc::now().timestamp_millis(),
        });
    }
}

// ═══════════════════════════════════════════════════════════
// Polling
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    pub interval: Duration,
    /// Extra attempts after a failed check, within one poll.
    pub retries: u32,
    pub retry_delay: Duration,
    /// State reported when every attempt failed.
    pub unreachable_state: HealthState,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            interval: HEALTH_POLL_INTERVAL,
            retries: HEALTH_RETRIES,
            retry_delay: HEALTH_RETRY_DELAY,
            unreachable_state: HealthState::Degraded,
        }
    }
}

impl HealthPolicy {
    /// Dev mode treats a missing local backend as online.
    pub fn from_config(config: &ClientConfig) -> Self {
        let unreachable_state = if config.dev_mode {
            HealthState::Online
        } else {
            HealthState::Degraded
        };
        Self {
            unreachable_state,
            ..Self::default()
        }
    }
}

/// One poll: check, retrying on failure, and record the outcome.
pub async fn poll_once(
    client: &BackendClient,
    store: &HealthStore,
    policy: &HealthPolicy,
) -> HealthState {
    let mut attempt = 0;
    let state = loop {
        match client.check_health().await {
            Ok(report) if report.is_ok() => break HealthState::Online,
            Ok(report) => {
                tracing::info!(status = %report.status, "backend reports degraded health");
                break HealthState::Degraded;
            }
            Err(e) if attempt < policy.retries => {
                attempt += 1;
                tracing::debug!(error = %e, attempt, "health check failed, retrying");
                tokio::time::sleep(policy.retry_delay).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "backend unreachable");
                break policy.unreachable_state;
            }
        }
    };

    store.record(state);
    state
}

/// Background poller. Stops when dropped.
pub struct HealthMonitor {
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Poll immediately, then every `policy.interval`.
    pub fn spawn(client: BackendClient, store: Arc<HealthStore>, policy: HealthPolicy) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(policy.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                poll_once(&client, &store, &policy).await;
            }
        });
        tracing::debug!(interval_secs = policy.interval.as_secs(), "health monitor started");
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
