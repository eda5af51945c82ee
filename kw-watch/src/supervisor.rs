use std::sync::Arc;
use std::sync::atomic::{
    AtomicBool,
    AtomicUsize,
    Ordering,
};
use std::time::Duration;

use kw_core::prelude::*;
use tokio::sync::{
    Mutex,
    watch,
};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::cluster::ClusterApi;
use crate::config::WatcherConfig;
use crate::discovery::discover_watchable;
use crate::errors::*;
use crate::event::EventHandler;
use crate::kind_watcher::{
    KindWatcher,
    LoopExit,
    SubscriptionState,
};

struct ActiveRun {
    cancel: CancellationToken,
    js: JoinSet<LoopExit>,
    states: Vec<(ResourceKind, watch::Receiver<SubscriptionState>)>,
}

// Decrements the live-loop counter when the task's future is dropped, whether the loop returned
// normally or the task was aborted.
struct LoopGuard(Arc<AtomicUsize>);

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owns the lifecycle of every watch loop.  `start` spawns one [`KindWatcher`] per selected kind
/// and returns immediately; `stop` cancels them all and waits (for a bounded time) for them to
/// drain.  A supervisor can be restarted after it's been stopped.
pub struct WatchSupervisor {
    api: Arc<dyn ClusterApi>,
    config: WatcherConfig,
    run: Mutex<Option<ActiveRun>>,
    watching: AtomicBool,
    active: Arc<AtomicUsize>,
}

impl WatchSupervisor {
    pub fn new(api: Arc<dyn ClusterApi>, config: WatcherConfig) -> WatchSupervisor {
        WatchSupervisor {
            api,
            config,
            run: Mutex::new(None),
            watching: AtomicBool::new(false),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn start(&self, handler: Arc<dyn EventHandler>) -> EmptyResult {
        // The lock is held until the run is recorded, so two concurrent starts can't both win.
        let mut run = self.run.lock().await;
        if run.is_some() {
            return Err(WatchError::already_running(&self.active_loops()));
        }

        let kinds = self.resolve_kinds().await?;
        let scope = self.config.namespace.as_deref().unwrap_or("all namespaces");
        info!("starting {} watch loops in {scope}", kinds.len());

        let cancel = CancellationToken::new();
        let mut js = JoinSet::new();
        let mut states = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let (watcher, state_rx) = KindWatcher::new(
                kind.clone(),
                self.config.namespace.clone(),
                self.api.clone(),
                handler.clone(),
                cancel.child_token(),
            );

            self.active.fetch_add(1, Ordering::SeqCst);
            let guard = LoopGuard(self.active.clone());
            js.spawn(async move {
                let _guard = guard;
                watcher.run().await
            });
            states.push((kind, state_rx));
        }

        *run = Some(ActiveRun { cancel, js, states });
        self.watching.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        let Some(mut active) = run.take() else {
            debug!("watcher is not running, nothing to stop");
            return;
        };

        self.watching.store(false, Ordering::SeqCst);
        info!("stopping {} watch loops", active.js.len());
        active.cancel.cancel();

        let drain = async {
            while let Some(res) = active.js.join_next().await {
                match res {
                    Ok(exit) => debug!("watch loop exited: {exit:?}"),
                    Err(err) => warn!("watch loop task failed: {err}"),
                }
            }
        };

        if timeout(Duration::from_secs(STOP_GRACE_PERIOD_SECONDS), drain).await.is_err() {
            warn!(
                "timed out after {STOP_GRACE_PERIOD_SECONDS}s waiting for watch loops; aborting {} remaining",
                active.js.len()
            );
            active.js.abort_all();
        } else {
            info!("all watch loops stopped");
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }

    pub fn active_loops(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub async fn subscription_states(&self) -> Vec<(ResourceKind, SubscriptionState)> {
        match self.run.lock().await.as_ref() {
            Some(active) => active.states.iter().map(|(kind, rx)| (kind.clone(), *rx.borrow())).collect(),
            None => vec![],
        }
    }

    async fn resolve_kinds(&self) -> anyhow::Result<Vec<ResourceKind>> {
        if !self.config.kinds.is_empty() {
            return Ok(self.config.kinds.clone());
        }

        if self.config.watch_all {
            return discover_watchable(self.api.as_ref()).await;
        }

        Ok(DEFAULT_WATCHED_KINDS.to_vec())
    }
}
