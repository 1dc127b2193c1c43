use std::time::Duration;

pub const CONTROL_PLANE_ROLE_LABEL_KEYS: &[&str] = &[
    "node-role.kubernetes.io/control-plane",
    "node-role.kubernetes.io/master",
];

pub const MIRROR_POD_ANNOTATION_KEY: &str = "kubernetes.io/config.mirror";
pub const DAEMON_SET_KIND: &str = "DaemonSet";

pub const HOSTNAME_ADDRESS_TYPE: &str = "Hostname";

pub const DEFAULT_SSH_USER: &str = "root";
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_EVICTION_GRACE_PERIOD: Duration = Duration::from_secs(30);

pub const SHUTDOWN_COMMAND: &[&str] = &["shutdown", "-h", "now"];
