use kw_core::prelude::*;
use lazy_static::lazy_static;

pub const TEST_DEPLOYMENT: &str = "the-deployment";
pub const TEST_POD: &str = "the-pod";
pub const TEST_NAMESPACE: &str = "test-namespace";
pub const TEST_RESOURCE_VERSION: &str = "1234";

lazy_static! {
    pub static ref DEPL_KIND: ResourceKind = ResourceKind::new("apps", "v1", DEPLOYMENT_KIND, true);
    pub static ref POD_RESOURCE_KIND: ResourceKind = ResourceKind::new("", "v1", POD_KIND, true);
    pub static ref NS_KIND: ResourceKind = ResourceKind::new("", "v1", NAMESPACE_KIND, false);
}
