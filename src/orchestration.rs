use std::future::Future;
use std::time::Duration;

use k8s_openapi::api::core::v1::{Node, Pod};

/// Cluster operations the drain needs. Implementations are expected to be authenticated
/// already; every call uses the implementation's own request timeout.
pub trait OrchestrationClient {
    /// `Ok(None)` when no node has this name.
    fn get_node(&self, name: &str) -> impl Future<Output = kube::Result<Option<Node>>> + Send;

    /// A point-in-time list of every pod bound to the node, in all namespaces.
    fn list_pods_on_node(
        &self,
        node_name: &str,
    ) -> impl Future<Output = kube::Result<Vec<Pod>>> + Send;

    /// Must be idempotent: cordoning an already cordoned node succeeds.
    fn set_schedulable(
        &self,
        node_name: &str,
        schedulable: bool,
    ) -> impl Future<Output = kube::Result<()>> + Send;

    fn request_eviction(
        &self,
        namespace: &str,
        name: &str,
        grace_period: Duration,
    ) -> impl Future<Output = kube::Result<()>> + Send;
}
