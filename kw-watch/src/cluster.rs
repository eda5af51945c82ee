use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{
    StreamExt,
    TryStreamExt,
    future,
};
use kube::api::{
    Api,
    WatchEvent,
    WatchParams,
};
use kube::config::{
    KubeConfigOptions,
    Kubeconfig,
};
use kw_core::prelude::*;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use tracing::*;

use crate::errors::*;
use crate::event::{
    RawEvent,
    ServerError,
};

// Some apiservers (and aggregated APIs in particular) answer with a 500 or 503 and this message
// rather than a plain 404 when a resource type isn't served.
const RESOURCE_NOT_FOUND_MSG: &str = "could not find the requested resource";

pub type RawEventStream = BoxStream<'static, anyhow::Result<RawEvent>>;

/// The type catalog of a cluster: every resource list we managed to fetch, plus the
/// group-versions we couldn't fetch along with the reason.
#[derive(Clone, Debug, Default)]
pub struct ApiCatalog {
    pub resource_lists: Vec<metav1::APIResourceList>,
    pub failures: Vec<(String, String)>,
}

/// Everything the watch engine needs from the cluster.  The kube-backed implementation is
/// [`KubeClusterApi`]; tests substitute a mock.
#[cfg_attr(any(test, feature = "mock"), automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Open one watch on the collection for `kind`, scoped to `namespace` if the kind is
    /// namespaced and a namespace is given.  A kind the cluster doesn't serve fails with
    /// `WatchError::UnsupportedResource`; anything else is treated as retryable.
    async fn open_watch(&self, kind: &ResourceKind, namespace: Option<String>) -> anyhow::Result<RawEventStream>;

    async fn api_catalog(&self) -> anyhow::Result<ApiCatalog>;

    /// The resource list for a single group-version ("v1", "apps/v1", ...).
    async fn api_resources(&self, api_version: &str) -> anyhow::Result<metav1::APIResourceList>;

    async fn server_version(&self) -> anyhow::Result<String>;
}

pub struct KubeClusterApi {
    client: kube::Client,
}

impl KubeClusterApi {
    pub fn new(client: kube::Client) -> KubeClusterApi {
        KubeClusterApi { client }
    }

    // An explicit kubeconfig path takes precedence; otherwise we fall back to the usual
    // $KUBECONFIG / ~/.kube/config / in-cluster inference.
    pub async fn from_kubeconfig(path: Option<&str>) -> anyhow::Result<KubeClusterApi> {
        let config = match path {
            Some(p) => {
                let kubeconfig = Kubeconfig::read_from(p)
                    .map_err(|e| WatchError::client_configuration(&format!("reading {p}: {e}")))?;
                kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| WatchError::client_configuration(&format!("loading {p}: {e}")))?
            },
            None => kube::Config::infer()
                .await
                .map_err(|e| WatchError::client_configuration(&e.to_string()))?,
        };

        info!("connecting to Kubernetes API server at {}", config.cluster_url);
        let client = kube::Client::try_from(config).map_err(|e| WatchError::client_configuration(&e.to_string()))?;
        Ok(KubeClusterApi::new(client))
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn open_watch(&self, kind: &ResourceKind, namespace: Option<String>) -> anyhow::Result<RawEventStream> {
        let ar = kind.api_resource();
        let api: Api<DynamicObject> = match namespace {
            Some(ns) if kind.namespaced() => Api::namespaced_with(self.client.clone(), &ns, &ar),
            _ => Api::all_with(self.client.clone(), &ar),
        };

        // kube doesn't look at the response status when it opens a watch, so a type the cluster
        // doesn't serve usually shows up as a 404 error on the first line of the stream rather than
        // as a failed open.  Both paths go through the same classification.
        let name = kind.to_string();
        let wp = WatchParams::default().timeout(WATCH_TIMEOUT_SECONDS);
        let stream = api.watch(&wp, "0").await.map_err(|e| classify_kube_error(&name, e))?;

        Ok(stream
            .map_err(move |e| classify_kube_error(&name, e))
            .try_filter_map(|evt| future::ready(Ok(raw_event_from(evt))))
            .boxed())
    }

    async fn api_catalog(&self) -> anyhow::Result<ApiCatalog> {
        let mut catalog = ApiCatalog::default();

        match self.client.list_core_api_versions().await {
            Ok(core) => {
                for version in core.versions {
                    match self.client.list_core_api_resources(&version).await {
                        Ok(list) => catalog.resource_lists.push(list),
                        Err(err) => catalog.failures.push((version, err.to_string())),
                    }
                }
            },
            Err(err) => catalog.failures.push((CORE_API_VERSION.into(), err.to_string())),
        }

        // If we can't even get the group list there's nothing useful we can say about the
        // cluster, so that's the one failure that aborts discovery.
        let groups = self
            .client
            .list_api_groups()
            .await
            .map_err(|e| WatchError::discovery_failed(&e.to_string()))?;
        for group in groups.groups {
            for gv in group.versions {
                match self.client.list_api_group_resources(&gv.group_version).await {
                    Ok(list) => catalog.resource_lists.push(list),
                    Err(err) => catalog.failures.push((gv.group_version, err.to_string())),
                }
            }
        }

        Ok(catalog)
    }

    async fn api_resources(&self, api_version: &str) -> anyhow::Result<metav1::APIResourceList> {
        let res = if api_version.contains('/') {
            self.client.list_api_group_resources(api_version).await
        } else {
            self.client.list_core_api_resources(api_version).await
        };
        res.map_err(|e| WatchError::discovery_failed(&format!("{api_version}: {e}")))
    }

    async fn server_version(&self) -> anyhow::Result<String> {
        let info = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| WatchError::connection_failed(&e.to_string()))?;
        Ok(info.git_version)
    }
}

fn classify_kube_error(kind: &str, err: kube::Error) -> anyhow::Error {
    match &err {
        kube::Error::Api(resp) if resp.code == 404 || resp.message.contains(RESOURCE_NOT_FOUND_MSG) => {
            WatchError::unsupported_resource(kind)
        },
        _ => WatchError::connection_failed(&format!("{kind}: {err}")),
    }
}

pub(crate) fn raw_event_from(evt: WatchEvent<DynamicObject>) -> Option<RawEvent> {
    match evt {
        WatchEvent::Added(obj) => Some(RawEvent::Added(obj)),
        WatchEvent::Modified(obj) => Some(RawEvent::Modified(obj)),
        WatchEvent::Deleted(obj) => Some(RawEvent::Deleted(obj)),
        WatchEvent::Bookmark(_) => None,
        WatchEvent::Error(e) => Some(RawEvent::Error(ServerError {
            code: e.code,
            reason: e.reason.clone(),
            message: e.message.clone(),
        })),
    }
}
