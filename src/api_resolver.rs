use std::time::Duration;

use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{DeleteParams, EvictParams, ListParams};
use kube::{Api, Client, Config};
use tracing::debug;

use crate::error_codes::is_404_not_found_error;
use crate::orchestration::OrchestrationClient;

#[derive(Clone)]
pub struct ApiResolver {
    pub client: Client,
}

impl ApiResolver {
    pub fn try_new(config: Config) -> kube::Result<Self> {
        let client = Client::try_from(config)?;
        Ok(Self { client })
    }

    pub fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    pub fn all_pods(&self) -> Api<Pod> {
        Api::all(self.client.clone())
    }

    pub fn pods_in(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl OrchestrationClient for ApiResolver {
    async fn get_node(&self, name: &str) -> kube::Result<Option<Node>> {
        self.nodes().get_opt(name).await
    }

    async fn list_pods_on_node(&self, node_name: &str) -> kube::Result<Vec<Pod>> {
        let params = ListParams::default().fields(&format!("spec.nodeName={node_name}"));
        let list = self.all_pods().list(&params).await?;
        Ok(list.items)
    }

    async fn set_schedulable(&self, node_name: &str, schedulable: bool) -> kube::Result<()> {
        let nodes = self.nodes();
        if schedulable {
            nodes.uncordon(node_name).await?;
        } else {
            nodes.cordon(node_name).await?;
        }

        Ok(())
    }

    async fn request_eviction(
        &self,
        namespace: &str,
        name: &str,
        grace_period: Duration,
    ) -> kube::Result<()> {
        let params = EvictParams {
            delete_options: Some(DeleteParams {
                grace_period_seconds: Some(grace_period_seconds(grace_period)),
                ..DeleteParams::default()
            }),
            ..EvictParams::default()
        };

        let result = self.pods_in(namespace).evict(name, &params).await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_404_not_found_error(&err) => {
                debug!(%namespace, %name, "pod is gone anyway");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Whole seconds for `DeleteOptions.gracePeriodSeconds`, saturating at `u32::MAX`.
fn grace_period_seconds(grace_period: Duration) -> u32 {
    u32::try_from(grace_period.as_secs()).unwrap_or(u32::MAX)
}
