use std::fmt::{Display, Formatter};

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;

use crate::consts::{DAEMON_SET_KIND, MIRROR_POD_ANNOTATION_KEY};
use crate::try_some;

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct WorkloadRef {
    pub namespace: String,
    pub name: String,
}

impl WorkloadRef {
    pub fn from_pod(pod: &Pod) -> Self {
        Self {
            namespace: pod.namespace().unwrap_or_default(),
            name: pod.name_any(),
        }
    }
}

impl Display for WorkloadRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// DaemonSet pods tolerate the cordon and would be recreated anyway. Mirror pods are
/// owned by the kubelet and can't be evicted through the API.
pub fn is_drain_exempt(pod: &Pod) -> bool {
    is_daemon_set_pod(pod) || is_mirror_pod(pod)
}

pub fn is_daemon_set_pod(pod: &Pod) -> bool {
    let Some(owner_references) = try_some!(pod.metadata.owner_references?) else {
        return false;
    };

    owner_references
        .iter()
        .any(|owner| owner.kind == DAEMON_SET_KIND)
}

pub fn is_mirror_pod(pod: &Pod) -> bool {
    pod.annotations().contains_key(MIRROR_POD_ANNOTATION_KEY)
}

pub fn evictable_pods(pods: &[Pod]) -> impl Iterator<Item = &Pod> {
    pods.iter().filter(|pod| !is_drain_exempt(pod))
}
