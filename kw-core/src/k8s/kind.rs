use std::collections::HashMap;
use std::fmt;

use kube::api::{
    ApiResource,
    GroupVersionKind,
};
use lazy_static::lazy_static;

lazy_static! {
    static ref KIND_PLURALS: HashMap<&'static str, &'static str> = HashMap::from([
        ("Pod", "pods"),
        ("Deployment", "deployments"),
        ("Service", "services"),
        ("ConfigMap", "configmaps"),
        ("Secret", "secrets"),
        ("Namespace", "namespaces"),
        ("Node", "nodes"),
        ("PersistentVolume", "persistentvolumes"),
        ("PersistentVolumeClaim", "persistentvolumeclaims"),
        ("Ingress", "ingresses"),
        ("Job", "jobs"),
        ("CronJob", "cronjobs"),
        ("StatefulSet", "statefulsets"),
        ("DaemonSet", "daemonsets"),
        ("ServiceAccount", "serviceaccounts"),
        ("Role", "roles"),
        ("RoleBinding", "rolebindings"),
        ("ClusterRole", "clusterroles"),
        ("ClusterRoleBinding", "clusterrolebindings"),
        ("CustomResourceDefinition", "customresourcedefinitions"),
    ]);
}

/// Map a kind name onto the plural path segment used to address its collection.
///
/// Well-known kinds come from a fixed table; anything else gets its first character lowercased
/// and an "s" appended.  The fallback does not know about irregular plurals ("Policy" becomes
/// "policys"), which is why [`ResourceKind`] lets callers override the plural.
pub fn resource_name(kind: &str) -> String {
    if let Some(plural) = KIND_PLURALS.get(kind) {
        return (*plural).into();
    }

    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => format!("{}{}s", first.to_lowercase(), chars.as_str()),
        None => "s".into(),
    }
}

/// Split an apiVersion string into its (group, version) parts.  Core types ("v1") have an empty
/// group; anything without a "/" is treated as a bare version.
pub fn split_group_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.into(), version.into()),
        None => ("".into(), api_version.into()),
    }
}

/// A watchable collection: the GVK of the objects in it, whether it is namespaced, and
/// (optionally) the plural resource name the apiserver uses for it.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct ResourceKind {
    gvk: GroupVersionKind,
    namespaced: bool,
    plural: Option<String>,
}

impl ResourceKind {
    pub fn new(group: &str, version: &str, kind: &str, namespaced: bool) -> ResourceKind {
        ResourceKind {
            gvk: GroupVersionKind::gvk(group, version, kind),
            namespaced,
            plural: None,
        }
    }

    pub fn from_api_version(api_version: &str, kind: &str, namespaced: bool) -> ResourceKind {
        let (group, version) = split_group_version(api_version);
        ResourceKind::new(&group, &version, kind, namespaced)
    }

    pub fn with_plural(mut self, plural: &str) -> ResourceKind {
        self.plural = Some(plural.into());
        self
    }

    pub fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    pub fn kind(&self) -> &str {
        &self.gvk.kind
    }

    pub fn group(&self) -> &str {
        &self.gvk.group
    }

    pub fn version(&self) -> &str {
        &self.gvk.version
    }

    pub fn api_version(&self) -> String {
        self.gvk.api_version()
    }

    pub fn namespaced(&self) -> bool {
        self.namespaced
    }

    pub fn plural(&self) -> String {
        match &self.plural {
            Some(p) => p.clone(),
            None => resource_name(self.kind()),
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk_with_plural(&self.gvk, &self.plural())
    }
}

// Formatted as "Kind.group/version" (or "Kind/version" for the core group), which is how the
// watch loops identify themselves in log lines.
impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.group().is_empty() {
            write!(f, "{}/{}", self.kind(), self.version())
        } else {
            write!(f, "{}.{}/{}", self.kind(), self.group(), self.version())
        }
    }
}
