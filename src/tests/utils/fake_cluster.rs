use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use k8s_openapi::api::core::v1::{Node, Pod};
use kube::error::ErrorResponse;
use serde_json::{Map, Value, json};

use crate::orchestration::OrchestrationClient;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Call {
    GetNode(String),
    ListPods(String),
    SetSchedulable(String, bool),
    Evict {
        namespace: String,
        name: String,
        grace_period: Duration,
    },
}

struct FakePod {
    pod: Pod,
    node_name: String,
    namespace: String,
    name: String,
    /// hidden from the first n lists of its node
    visible_after_lists: usize,
    /// accepts evictions but never terminates
    stubborn: bool,
    /// removed once this many more lists have seen it
    gone_after_lists: Option<usize>,
}

#[derive(Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    pods: Vec<FakePod>,
    calls: Vec<Call>,
    rejected_evictions: HashSet<(String, String)>,
    eviction_lag: usize,
    fail_cordon: bool,
    fail_get_node: bool,
    /// lists of a node beyond this count fail
    list_limit: Option<usize>,
    list_counts: BTreeMap<String, usize>,
}

/// In-memory cluster. Evicted pods disappear after `eviction_lag` further lists of their
/// node, which is enough to observe them as "remaining" for a while.
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn add_node(&self, name: &str, labels: &[(&str, &str)]) {
        let labels: Map<String, Value> = labels
            .iter()
            .map(|(key, value)| (key.to_string(), Value::from(*value)))
            .collect();
        let node: Node = serde_json::from_value(json!({
            "metadata": {
                "name": name,
                "labels": labels,
            },
        }))
        .expect("Invalid json");

        self.state.lock().unwrap().nodes.insert(name.to_owned(), node);
    }

    pub fn add_pod(&self, node_name: &str, namespace: &str, name: &str) {
        self.insert_pod(node_name, namespace, name, "ReplicaSet", None, 0, false);
    }

    pub fn add_daemon_set_pod(&self, node_name: &str, namespace: &str, name: &str) {
        self.insert_pod(node_name, namespace, name, "DaemonSet", None, 0, false);
    }

    pub fn add_mirror_pod(&self, node_name: &str, namespace: &str, name: &str) {
        let annotations = json!({ "kubernetes.io/config.mirror": "checksum" });
        self.insert_pod(node_name, namespace, name, "Node", Some(annotations), 0, false);
    }

    pub fn add_stubborn_pod(&self, node_name: &str, namespace: &str, name: &str) {
        self.insert_pod(node_name, namespace, name, "ReplicaSet", None, 0, true);
    }

    pub fn add_pod_after_lists(&self, node_name: &str, namespace: &str, name: &str, lists: usize) {
        self.insert_pod(node_name, namespace, name, "ReplicaSet", None, lists, false);
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_pod(
        &self,
        node_name: &str,
        namespace: &str,
        name: &str,
        owner_kind: &str,
        annotations: Option<Value>,
        visible_after_lists: usize,
        stubborn: bool,
    ) {
        let pod: Pod = serde_json::from_value(json!({
            "metadata": {
                "name": name,
                "namespace": namespace,
                "annotations": annotations.unwrap_or_else(|| json!({})),
                "ownerReferences": [{
                    "apiVersion": "apps/v1",
                    "kind": owner_kind,
                    "name": format!("{name}-owner"),
                    "uid": format!("{name}-owner-uid"),
                    "controller": true,
                }],
            },
            "spec": {
                "nodeName": node_name,
                "containers": [],
            },
        }))
        .expect("Invalid json");

        self.state.lock().unwrap().pods.push(FakePod {
            pod,
            node_name: node_name.to_owned(),
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            visible_after_lists,
            stubborn,
            gone_after_lists: None,
        });
    }

    pub fn reject_eviction(&self, namespace: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_evictions
            .insert((namespace.to_owned(), name.to_owned()));
    }

    pub fn set_eviction_lag(&self, lists: usize) {
        self.state.lock().unwrap().eviction_lag = lists;
    }

    pub fn fail_cordon(&self) {
        self.state.lock().unwrap().fail_cordon = true;
    }

    pub fn fail_get_node(&self) {
        self.state.lock().unwrap().fail_get_node = true;
    }

    pub fn fail_list_after(&self, lists: usize) {
        self.state.lock().unwrap().list_limit = Some(lists);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn evictions(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Evict {
                    namespace, name, ..
                } => Some((namespace, name)),
                _ => None,
            })
            .collect()
    }

    pub fn is_mutated(&self) -> bool {
        self.calls()
            .iter()
            .any(|call| matches!(call, Call::SetSchedulable(..) | Call::Evict { .. }))
    }

    pub fn list_count(&self, node_name: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.list_counts.get(node_name).copied().unwrap_or_default()
    }

    pub fn is_cordoned(&self, node_name: &str) -> bool {
        let state = self.state.lock().unwrap();
        let Some(node) = state.nodes.get(node_name) else {
            return false;
        };

        node.spec
            .as_ref()
            .and_then(|spec| spec.unschedulable)
            .unwrap_or(false)
    }

    pub fn is_pod_present(&self, namespace: &str, name: &str) -> bool {
        let state = self.state.lock().unwrap();
        state
            .pods
            .iter()
            .any(|pod| pod.namespace == namespace && pod.name == name)
    }
}

fn api_error(code: u16, reason: &str, message: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_owned(),
        message: message.to_owned(),
        reason: reason.to_owned(),
        code,
    })
}

impl OrchestrationClient for FakeCluster {
    async fn get_node(&self, name: &str) -> kube::Result<Option<Node>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetNode(name.to_owned()));

        if state.fail_get_node {
            return Err(api_error(503, "ServiceUnavailable", "apiserver is shutting down"));
        }

        Ok(state.nodes.get(name).cloned())
    }

    async fn list_pods_on_node(&self, node_name: &str) -> kube::Result<Vec<Pod>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListPods(node_name.to_owned()));

        let count = {
            let count = state.list_counts.entry(node_name.to_owned()).or_default();
            *count += 1;
            *count
        };

        if state.list_limit.is_some_and(|limit| count > limit) {
            return Err(api_error(500, "InternalError", "etcdserver: request timed out"));
        }

        state
            .pods
            .retain(|pod| pod.node_name != node_name || pod.gone_after_lists != Some(0));

        let mut listed = Vec::new();
        for pod in state.pods.iter_mut() {
            if pod.node_name != node_name || count <= pod.visible_after_lists {
                continue;
            }

            if let Some(remaining) = pod.gone_after_lists.as_mut() {
                *remaining -= 1;
            }
            listed.push(pod.pod.clone());
        }

        Ok(listed)
    }

    async fn set_schedulable(&self, node_name: &str, schedulable: bool) -> kube::Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::SetSchedulable(node_name.to_owned(), schedulable));

        if state.fail_cordon {
            return Err(api_error(500, "InternalError", "etcd is unavailable"));
        }

        let Some(node) = state.nodes.get_mut(node_name) else {
            return Err(api_error(404, "NotFound", "node not found"));
        };

        node.spec.get_or_insert_with(Default::default).unschedulable = Some(!schedulable);
        Ok(())
    }

    async fn request_eviction(
        &self,
        namespace: &str,
        name: &str,
        grace_period: Duration,
    ) -> kube::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Evict {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            grace_period,
        });

        if state
            .rejected_evictions
            .contains(&(namespace.to_owned(), name.to_owned()))
        {
            return Err(api_error(
                429,
                "TooManyRequests",
                "Cannot evict pod as it would violate the pod's disruption budget.",
            ));
        }

        let lag = state.eviction_lag;
        let pod = state
            .pods
            .iter_mut()
            .find(|pod| pod.namespace == namespace && pod.name == name);
        if let Some(pod) = pod {
            if !pod.stubborn && pod.gone_after_lists.is_none() {
                pod.gone_after_lists = Some(lag);
            }
        }

        Ok(())
    }
}
