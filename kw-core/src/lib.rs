#![cfg_attr(coverage, feature(coverage_attribute))]
pub mod constants;
pub mod errors;
pub mod k8s;
pub mod logging;

pub mod prelude {
    pub use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
    pub use kube::api::DynamicObject;

    pub use crate::constants::*;
    pub use crate::errors::EmptyResult;
    pub use crate::k8s::ResourceKind;
}
