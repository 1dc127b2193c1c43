//! Cordons a node, evicts its pods and waits until nothing evictable is left on it.
//!
//! DaemonSet pods and mirror pods are exempt: they are neither evicted nor waited for.
//! Evictions are submitted once. A pod that refuses to leave (e.g. blocked by a
//! PodDisruptionBudget) just keeps showing up in the next listing until the deadline.

use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;
use tokio::select;
use tokio::time::Instant;
use tracing::{Level, debug, info, span, warn};

use crate::consts::{
    DEFAULT_DRAIN_TIMEOUT, DEFAULT_EVICTION_GRACE_PERIOD, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL,
};
use crate::error_codes::{is_429_too_many_requests_error, is_transient_error};
use crate::instrumented;
use crate::orchestration::OrchestrationClient;
use crate::shutdown::Shutdown;
use crate::workload::{WorkloadRef, evictable_pods};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DrainParams {
    /// Measured from drain start, bounds only the wait for quiescence.
    /// The deadline is inclusive: a poll landing exactly on it is the last one, so the
    /// drain times out with `timeout <= elapsed < timeout + poll_interval`.
    pub timeout: Duration,
    /// Raised to `MIN_POLL_INTERVAL` (100ms) if shorter.
    pub poll_interval: Duration,
    pub grace_period: Duration,
}

impl Default for DrainParams {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DRAIN_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace_period: DEFAULT_EVICTION_GRACE_PERIOD,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DrainOutcome {
    /// no evictable pod is left on the node
    Drained,
    /// evictable pods were still present at the deadline
    TimedOut,
    /// shutdown was requested while evicting or waiting
    Cancelled,
}

#[derive(Debug, Error)]
pub enum DrainError {
    #[error("failed to cordon node")]
    Cordon(#[source] kube::Error),
    #[error("failed to list pods on node")]
    ListPods(#[source] kube::Error),
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct EvictionSummary {
    pub requested: usize,
    pub failed: usize,
}

struct DrainSession<'a> {
    node_name: &'a str,
    started_at: Instant,
    deadline: Instant,
    poll_interval: Duration,
    pending: BTreeSet<WorkloadRef>,
}

impl<'a> DrainSession<'a> {
    fn start(node_name: &'a str, params: &DrainParams) -> Self {
        let started_at = Instant::now();
        if params.poll_interval < MIN_POLL_INTERVAL {
            warn!(
                poll_interval = ?params.poll_interval,
                "Poll interval is too short, using {MIN_POLL_INTERVAL:?}"
            );
        }

        Self {
            node_name,
            started_at,
            deadline: started_at + params.timeout,
            poll_interval: params.poll_interval.max(MIN_POLL_INTERVAL),
            pending: BTreeSet::new(),
        }
    }

    async fn refresh<C: OrchestrationClient>(&mut self, client: &C) -> Result<(), DrainError> {
        let pods = client
            .list_pods_on_node(self.node_name)
            .await
            .map_err(DrainError::ListPods)?;

        self.pending = evictable_pods(&pods).map(WorkloadRef::from_pod).collect();
        Ok(())
    }

    fn is_quiescent(&self) -> bool {
        self.pending.is_empty()
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    fn next_wait(&self, now: Instant) -> Duration {
        self.poll_interval
            .min(self.deadline.saturating_duration_since(now))
    }
}

pub async fn drain<C: OrchestrationClient>(
    client: &C,
    node_name: &str,
    params: &DrainParams,
    shutdown: &Shutdown,
) -> Result<DrainOutcome, DrainError> {
    instrumented!(span!(Level::INFO, "drain", node = node_name), async {
        let mut session = DrainSession::start(node_name, params);

        cordon(client, node_name).await?;

        session.refresh(client).await?;
        let summary = evict_all(client, &session.pending, params.grace_period, shutdown).await;
        if summary.failed > 0 {
            warn!(
                requested = summary.requested,
                failed = summary.failed,
                "Some evictions were not accepted, waiting anyway"
            );
        }

        wait_for_quiescence(client, &mut session, shutdown).await
    })
    .await
}

async fn cordon<C: OrchestrationClient>(client: &C, node_name: &str) -> Result<(), DrainError> {
    debug!("cordoning node");
    client
        .set_schedulable(node_name, false)
        .await
        .map_err(DrainError::Cordon)?;

    info!("Node cordoned");
    Ok(())
}

async fn evict_all<C: OrchestrationClient>(
    client: &C,
    targets: &BTreeSet<WorkloadRef>,
    grace_period: Duration,
    shutdown: &Shutdown,
) -> EvictionSummary {
    let mut summary = EvictionSummary::default();
    for target in targets {
        if shutdown.is_shutdown_triggered() {
            info!(
                skipped = targets.len() - summary.requested,
                "Shutdown requested, skipping remaining evictions"
            );
            break;
        }

        summary.requested += 1;
        let result = client
            .request_eviction(&target.namespace, &target.name, grace_period)
            .await;

        match result {
            Ok(()) => info!(pod = %target, "Eviction requested"),
            Err(err) => {
                summary.failed += 1;
                if is_429_too_many_requests_error(&err) {
                    warn!(pod = %target, %err, "Eviction refused by PodDisruptionBudget");
                } else {
                    warn!(
                        pod = %target,
                        %err,
                        transient = is_transient_error(&err),
                        "Failed to evict"
                    );
                }
            }
        }
    }

    summary
}

async fn wait_for_quiescence<C: OrchestrationClient>(
    client: &C,
    session: &mut DrainSession<'_>,
    shutdown: &Shutdown,
) -> Result<DrainOutcome, DrainError> {
    loop {
        if shutdown.is_shutdown_triggered() {
            info!("Drain cancelled");
            return Ok(DrainOutcome::Cancelled);
        }

        session.refresh(client).await?;
        if session.is_quiescent() {
            info!(
                elapsed = ?session.started_at.elapsed(),
                "Node successfully drained"
            );
            return Ok(DrainOutcome::Drained);
        }

        let now = Instant::now();
        if session.is_expired(now) {
            warn!(
                remaining = session.pending.len(),
                "Timeout waiting for node to drain"
            );
            return Ok(DrainOutcome::TimedOut);
        }

        info!(
            remaining = session.pending.len(),
            "Waiting for {} pods to be evicted",
            session.pending.len()
        );
        debug!(pending = ?session.pending);

        select! {
            _ = tokio::time::sleep(session.next_wait(now)) => {}
            _ = shutdown.wait_shutdown_triggered() => {
                info!("Drain cancelled");
                return Ok(DrainOutcome::Cancelled);
            }
        }
    }
}
