use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;

use crate::consts::CONTROL_PLANE_ROLE_LABEL_KEYS;

/// A node is eligible unless it carries any control-plane role label. The label value is
/// irrelevant; `node-role.kubernetes.io/control-plane: ""` is the common form.
pub fn is_eligible_for_decommission(node: &Node) -> bool {
    !is_control_plane_node(node)
}

pub fn is_control_plane_node(node: &Node) -> bool {
    let labels = node.labels();
    CONTROL_PLANE_ROLE_LABEL_KEYS
        .iter()
        .any(|key| labels.contains_key(*key))
}
