#![cfg_attr(coverage, feature(coverage_attribute))]
mod format;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use kw_core::logging;
use kw_core::prelude::*;
use kw_store::SharedStore;
use kw_watch::{
    ClusterApi,
    EventHandler,
    KubeClusterApi,
    ResourceEvent,
    WatchError,
    WatchSupervisor,
    WatcherConfig,
    resolve_kind,
};
use tokio::signal::unix::{
    SignalKind,
    signal,
};
use tokio::time::{
    Instant,
    Interval,
    interval_at,
    timeout,
};
use tracing::*;

use crate::format::format_event;

#[derive(Parser, Debug)]
#[command(about = "watch Kubernetes resources and keep an in-memory index of them", version)]
struct Options {
    #[arg(short, long, help = "namespace to watch (for namespaced resources) [default: default]")]
    namespace: Option<String>,

    #[arg(short = 'A', long, help = "watch resources across all namespaces")]
    all_namespaces: bool,

    #[arg(long, help = "watch every resource type the cluster can watch")]
    all: bool,

    #[arg(short, long, requires = "api_version", help = "resource kind to watch (e.g., Pod, Deployment)")]
    kind: Option<String>,

    #[arg(long, requires = "kind", help = "API version of the resource (e.g., v1, apps/v1)")]
    api_version: Option<String>,

    #[arg(short, long, help = "YAML file listing the kinds to watch")]
    config_file: Option<String>,

    #[arg(long, help = "path to the kubeconfig file")]
    kubeconfig: Option<String>,

    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[arg(long, default_value_t = 60, help = "seconds between index size reports (0 to disable)")]
    summary_interval: u64,
}

// Prints every event and records it in the index.
struct PrintAndStore {
    store: SharedStore,
}

#[async_trait]
impl EventHandler for PrintAndStore {
    async fn handle(&self, event: ResourceEvent) {
        println!("{}", format_event(&event));
        self.store.handle(event).await;
    }
}

// Flags win over the config file: --all-namespaces beats any namespace and --namespace beats the
// file's namespace.  An explicit --kind needs the cluster to resolve, see `explicit_kind`.
fn build_config(args: &Options) -> anyhow::Result<WatcherConfig> {
    let mut config = match &args.config_file {
        Some(filename) => WatcherConfig::load(filename)?,
        None => WatcherConfig::default(),
    };

    config.namespace = if args.all_namespaces {
        None
    } else {
        Some(
            args.namespace
                .clone()
                .or(config.namespace.take())
                .unwrap_or_else(|| DEFAULT_NAMESPACE.into()),
        )
    };

    if args.all {
        config.watch_all = true;
    }

    Ok(config)
}

// --kind/--api-version replace the file's kind list; the server's resource list decides whether
// the kind is namespaced and what its plural is.
async fn explicit_kind(args: &Options, api: &dyn ClusterApi) -> Option<ResourceKind> {
    let (kind, api_version) = (args.kind.as_ref()?, args.api_version.as_ref()?);
    Some(resolve_kind(api, api_version, kind).await)
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        },
        None => std::future::pending().await,
    }
}

async fn wait_for_shutdown(store: &SharedStore, summary_interval: u64) -> EmptyResult {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut ticker = (summary_interval > 0).then(|| {
        let period = Duration::from_secs(summary_interval);
        interval_at(Instant::now() + period, period)
    });

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                info!("received interrupt, shutting down");
                return Ok(());
            },
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                return Ok(());
            },
            _ = tick(&mut ticker) => info!("{} resources indexed", store.count().await),
        }
    }
}

async fn run(args: Options) -> EmptyResult {
    let mut config = build_config(&args)?;
    let api = KubeClusterApi::from_kubeconfig(args.kubeconfig.as_deref()).await?;

    let version = timeout(Duration::from_secs(SERVER_VERSION_TIMEOUT_SECONDS), api.server_version())
        .await
        .map_err(|_| WatchError::connection_failed("timed out waiting for the API server version"))??;
    info!("connected to Kubernetes {version}");

    if let Some(kind) = explicit_kind(&args, &api).await {
        config.kinds = vec![kind];
    }

    match &config.namespace {
        Some(ns) => info!("starting to watch resources in namespace: {ns}"),
        None => info!("starting to watch resources across all namespaces"),
    }

    let store = SharedStore::new();
    let supervisor = WatchSupervisor::new(Arc::new(api), config);
    supervisor.start(Arc::new(PrintAndStore { store: store.clone() })).await?;
    info!("watchers started, press Ctrl+C to exit");

    wait_for_shutdown(&store, args.summary_interval).await?;

    supervisor.stop().await;
    info!("watcher stopped cleanly, {} resources indexed", store.count().await);
    Ok(())
}

#[tokio::main]
async fn main() -> EmptyResult {
    let args = Options::parse();
    logging::setup(&args.verbosity);
    run(args).await
}

#[cfg(test)]
mod tests;
