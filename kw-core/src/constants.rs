use lazy_static::lazy_static;

use crate::k8s::ResourceKind;

// Watch timing
//
// kube refuses watch timeouts >= 295s, so this is as long as a single subscription is allowed to
// live before the apiserver closes it and we reconnect.
pub const WATCH_TIMEOUT_SECONDS: u32 = 290;
pub const MAX_WATCH_RETRIES: u32 = 5;
pub const RETRY_DELAY_STEP_SECONDS: u64 = 2;
pub const RECONNECT_DELAY_SECONDS: u64 = 1;
pub const STOP_GRACE_PERIOD_SECONDS: u64 = 10;
pub const SERVER_VERSION_TIMEOUT_SECONDS: u64 = 5;

// Discovery
pub const WATCH_VERB: &str = "watch";
pub const CORE_API_VERSION: &str = "v1";

// Store and output
pub const SEARCH_RESULT_LIMIT: usize = 100;
pub const SPEC_SUMMARY_MAX_LEN: usize = 200;

// Defaults
pub const DEFAULT_NAMESPACE: &str = "default";

// Kinds
pub const POD_KIND: &str = "Pod";
pub const DEPLOYMENT_KIND: &str = "Deployment";
pub const SERVICE_KIND: &str = "Service";
pub const CONFIG_MAP_KIND: &str = "ConfigMap";
pub const NAMESPACE_KIND: &str = "Namespace";

// Watched when neither an explicit kind list nor "watch all" is configured
lazy_static! {
    pub static ref DEFAULT_WATCHED_KINDS: Vec<ResourceKind> = vec![
        ResourceKind::new("", "v1", POD_KIND, true),
        ResourceKind::new("apps", "v1", DEPLOYMENT_KIND, true),
        ResourceKind::new("", "v1", SERVICE_KIND, true),
        ResourceKind::new("", "v1", CONFIG_MAP_KIND, true),
        ResourceKind::new("", "v1", NAMESPACE_KIND, false),
    ];
}
