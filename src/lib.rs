mod api_resolver;
mod config;
mod consts;
mod decommission;
mod drain;
mod error_codes;
mod orchestration;
mod remote_exec;
mod safety_guard;
mod shutdown;
mod utils;
mod workload;


pub use crate::api_resolver::ApiResolver;
pub use crate::config::Config;
pub use crate::decommission::{
    DecommissionError, DecommissionParams, ExitStatus, decommission, get_host_address,
    try_decommission,
};
pub use crate::drain::{DrainError, DrainOutcome, DrainParams, EvictionSummary, drain};
pub use crate::orchestration::OrchestrationClient;
pub use crate::remote_exec::{CommandOutput, RemoteExecError, RemoteExecutor, SshExecutor};
pub use crate::safety_guard::{is_control_plane_node, is_eligible_for_decommission};
pub use crate::shutdown::Shutdown;
pub use crate::workload::{WorkloadRef, is_drain_exempt};

#[cfg(test)]
#[macro_use]
extern crate assert_matches;
