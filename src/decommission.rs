use std::pin::pin;
use std::process::ExitCode;

use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use thiserror::Error;
use tokio::select;
use tracing::{Level, error, info, span, warn};

use crate::consts::{HOSTNAME_ADDRESS_TYPE, SHUTDOWN_COMMAND};
use crate::drain::{DrainError, DrainOutcome, DrainParams, drain};
use crate::instrumented;
use crate::orchestration::OrchestrationClient;
use crate::remote_exec::{RemoteExecError, RemoteExecutor};
use crate::safety_guard::is_eligible_for_decommission;
use crate::shutdown::Shutdown;
use crate::try_some;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecommissionParams {
    pub node_name: String,
    pub ssh_user: String,
    pub drain: DrainParams,
}

/// Process exit status of a decommission run. The numeric codes are stable:
///
/// | status         | code |
/// |----------------|------|
/// | Success        | 0    |
/// | NodeNotFound   | 10   |
/// | IneligibleNode | 11   |
/// | CordonFailed   | 12   |
/// | DrainTimedOut  | 13   |
/// | ShutdownFailed | 14   |
/// | ApiError       | 15   |
/// | Cancelled      | 130  |
///
/// Code 1 is left for failures before the run starts, and clap uses 2 for usage errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExitStatus {
    Success,
    NodeNotFound,
    IneligibleNode,
    CordonFailed,
    DrainTimedOut,
    ShutdownFailed,
    ApiError,
    Cancelled,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::NodeNotFound => 10,
            ExitStatus::IneligibleNode => 11,
            ExitStatus::CordonFailed => 12,
            ExitStatus::DrainTimedOut => 13,
            ExitStatus::ShutdownFailed => 14,
            ExitStatus::ApiError => 15,
            ExitStatus::Cancelled => 130,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

#[derive(Debug, Error)]
pub enum DecommissionError {
    #[error("node not found")]
    NodeNotFound,
    #[error("failed to look up node")]
    Lookup(#[source] kube::Error),
    #[error("node is a control-plane node, refusing to decommission it")]
    Ineligible,
    #[error(transparent)]
    Drain(#[from] DrainError),
    #[error("timed out waiting for node to drain")]
    DrainTimedOut,
    #[error("cancelled while waiting for node to drain")]
    Cancelled,
    #[error("failed to run shutdown command on '{host}'")]
    ShutdownChannel {
        host: String,
        #[source]
        source: RemoteExecError,
    },
    #[error("shutdown command on '{host}' exited with {exit_code}: {stderr}")]
    ShutdownCommand {
        host: String,
        exit_code: i32,
        stderr: String,
    },
}

impl DecommissionError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            DecommissionError::NodeNotFound => ExitStatus::NodeNotFound,
            DecommissionError::Lookup(_) => ExitStatus::ApiError,
            DecommissionError::Ineligible => ExitStatus::IneligibleNode,
            DecommissionError::Drain(DrainError::Cordon(_)) => ExitStatus::CordonFailed,
            DecommissionError::Drain(DrainError::ListPods(_)) => ExitStatus::ApiError,
            DecommissionError::DrainTimedOut => ExitStatus::DrainTimedOut,
            DecommissionError::Cancelled => ExitStatus::Cancelled,
            DecommissionError::ShutdownChannel { .. } => ExitStatus::ShutdownFailed,
            DecommissionError::ShutdownCommand { .. } => ExitStatus::ShutdownFailed,
        }
    }

    pub fn phase(&self) -> &'static str {
        match self {
            DecommissionError::NodeNotFound | DecommissionError::Lookup(_) => "lookup",
            DecommissionError::Ineligible => "safety check",
            DecommissionError::Drain(DrainError::Cordon(_)) => "cordon",
            DecommissionError::Drain(DrainError::ListPods(_))
            | DecommissionError::DrainTimedOut
            | DecommissionError::Cancelled => "drain",
            DecommissionError::ShutdownChannel { .. }
            | DecommissionError::ShutdownCommand { .. } => "shutdown",
        }
    }
}

/// Cordon and drain the node, then power off its host.
///
/// Nothing is rolled back on failure: a node that fails to drain or to shut down stays
/// cordoned, with whatever pods were already evicted gone.
pub async fn decommission<C, R>(
    client: &C,
    remote: &R,
    params: &DecommissionParams,
    shutdown: &Shutdown,
) -> ExitStatus
where
    C: OrchestrationClient,
    R: RemoteExecutor,
{
    let node_name = params.node_name.as_str();
    instrumented!(span!(Level::INFO, "decommission", node = node_name), async {
        match try_decommission(client, remote, params, shutdown).await {
            Ok(()) => {
                info!("Node decommissioned");
                ExitStatus::Success
            }
            Err(err) => {
                let status = err.exit_status();
                error!(
                    node = node_name,
                    phase = err.phase(),
                    ?status,
                    "Decommission failed: {err}"
                );
                status
            }
        }
    })
    .await
}

pub async fn try_decommission<C, R>(
    client: &C,
    remote: &R,
    params: &DecommissionParams,
    shutdown: &Shutdown,
) -> Result<(), DecommissionError>
where
    C: OrchestrationClient,
    R: RemoteExecutor,
{
    let node_name = params.node_name.as_str();

    let node = client
        .get_node(node_name)
        .await
        .map_err(DecommissionError::Lookup)?
        .ok_or(DecommissionError::NodeNotFound)?;

    if !is_eligible_for_decommission(&node) {
        return Err(DecommissionError::Ineligible);
    }
    info!("Node is eligible for decommission");

    match drain(client, node_name, &params.drain, shutdown).await? {
        DrainOutcome::Drained => {}
        DrainOutcome::TimedOut => return Err(DecommissionError::DrainTimedOut),
        DrainOutcome::Cancelled => return Err(DecommissionError::Cancelled),
    }

    let host = get_host_address(&node);
    info!(%host, user = %params.ssh_user, "Shutting down host");
    let output = {
        let mut command = pin!(remote.run_privileged(&host, &params.ssh_user, SHUTDOWN_COMMAND));
        select! {
            output = &mut command => output,
            _ = shutdown.wait_shutdown_triggered() => {
                warn!(%host, "Shutdown requested, waiting for the shutdown command to finish");
                command.await
            }
        }
    }
    .map_err(|source| DecommissionError::ShutdownChannel {
            host: host.clone(),
            source,
        })?;

    if !output.success() {
        return Err(DecommissionError::ShutdownCommand {
            host,
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_owned(),
        });
    }

    info!(%host, "Shutdown command issued successfully");
    Ok(())
}

/// The node's registered hostname, falling back to the node name.
pub fn get_host_address(node: &Node) -> String {
    let hostname = try_some!(node.status?.addresses?).and_then(|addresses| {
        addresses
            .iter()
            .find(|address| address.type_ == HOSTNAME_ADDRESS_TYPE)
            .map(|address| address.address.clone())
    });

    match hostname {
        Some(hostname) if !hostname.is_empty() => hostname,
        _ => node.name_any(),
    }
}
