use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kw_core::prelude::*;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::cluster::{
    ClusterApi,
    RawEventStream,
};
use crate::errors::*;
use crate::event::EventHandler;
use crate::normalizer::Normalizer;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubscriptionState {
    Created,
    Watching,
    Retrying,
    Terminated,
}

/// Why a watch loop stopped for good.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoopExit {
    Cancelled,
    Unsupported,
    GaveUp,
}

enum StreamEnd {
    Closed,
    Cancelled,
    Unsupported,
    Failed(anyhow::Error),
}

// The KindWatcher drives the subscription for a single kind: it opens a watch, pushes everything
// that comes off the stream through the normalizer and into the handler, and reopens the watch
// when the apiserver closes it.  Open failures are retried with a linearly increasing delay
// (2s, 4s, ... 10s); after MAX_WATCH_RETRIES consecutive failures the loop gives up.  The apiserver
// reports rejected watches (403, 500, ...) as an error on the first line of the body, so an error
// before anything else has come off the stream is an open failure too.  A stream that closes
// cleanly is the normal end of a server-side watch timeout, so it doesn't count against the retry
// budget.
//
// Every wait (open, read, sleep) races the cancellation token, so a stop request is honored
// promptly no matter what the loop is doing.
pub struct KindWatcher {
    kind: ResourceKind,
    namespace: Option<String>,
    api: Arc<dyn ClusterApi>,
    handler: Arc<dyn EventHandler>,
    normalizer: Normalizer,
    cancel: CancellationToken,
    state_tx: watch::Sender<SubscriptionState>,
    retries: u32,
}

impl KindWatcher {
    pub fn new(
        kind: ResourceKind,
        namespace: Option<String>,
        api: Arc<dyn ClusterApi>,
        handler: Arc<dyn EventHandler>,
        cancel: CancellationToken,
    ) -> (KindWatcher, watch::Receiver<SubscriptionState>) {
        let (state_tx, state_rx) = watch::channel(SubscriptionState::Created);
        let watcher = KindWatcher {
            normalizer: Normalizer::new(kind.clone()),
            kind,
            namespace,
            api,
            handler,
            cancel,
            state_tx,
            retries: 0,
        };
        (watcher, state_rx)
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub async fn run(mut self) -> LoopExit {
        info!("starting watch loop for {}", self.kind);
        let exit = self.watch_until_done().await;
        self.set_state(SubscriptionState::Terminated);
        info!("watch loop for {} terminated: {exit:?}", self.kind);
        exit
    }

    async fn watch_until_done(&mut self) -> LoopExit {
        loop {
            if self.cancel.is_cancelled() {
                return LoopExit::Cancelled;
            }

            let res = tokio::select! {
                _ = self.cancel.cancelled() => return LoopExit::Cancelled,
                res = self.api.open_watch(&self.kind, self.namespace.clone()) => res,
            };

            let end = match res {
                Ok(stream) => {
                    self.set_state(SubscriptionState::Watching);
                    debug!("watch opened for {}", self.kind);
                    self.consume(stream).await
                },
                Err(err) if WatchError::is_unsupported_resource(&err) => StreamEnd::Unsupported,
                Err(err) => StreamEnd::Failed(err),
            };

            match end {
                StreamEnd::Closed => {
                    debug!("watch stream for {} closed, reconnecting in {RECONNECT_DELAY_SECONDS}s", self.kind);
                    self.set_state(SubscriptionState::Retrying);
                    if !self.pause(RECONNECT_DELAY_SECONDS).await {
                        return LoopExit::Cancelled;
                    }
                },
                StreamEnd::Cancelled => return LoopExit::Cancelled,
                StreamEnd::Unsupported => {
                    warn!("{} is not served by this cluster, skipping", self.kind);
                    return LoopExit::Unsupported;
                },
                StreamEnd::Failed(err) => {
                    if let Some(exit) = self.back_off(err).await {
                        return exit;
                    }
                },
            }
        }
    }

    // Returns the exit reason if the loop should stop instead of retrying.
    async fn back_off(&mut self, err: anyhow::Error) -> Option<LoopExit> {
        self.retries += 1;
        if self.retries > MAX_WATCH_RETRIES {
            kwerr!(err, "giving up on {} after {} failed attempts", self.kind, self.retries);
            return Some(LoopExit::GaveUp);
        }

        let delay = RETRY_DELAY_STEP_SECONDS * u64::from(self.retries);
        warn!(
            "could not open watch for {} (attempt {}/{}), retrying in {delay}s: {err}",
            self.kind, self.retries, MAX_WATCH_RETRIES
        );
        self.set_state(SubscriptionState::Retrying);
        if !self.pause(delay).await {
            return Some(LoopExit::Cancelled);
        }
        None
    }

    // The retry budget is only reset once the stream proves the watch was accepted: either an
    // event comes through or the server ends it cleanly.
    async fn consume(&mut self, mut stream: RawEventStream) -> StreamEnd {
        let mut accepted = false;
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return StreamEnd::Cancelled,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(raw)) => {
                    if !accepted {
                        accepted = true;
                        self.retries = 0;
                    }

                    let evt = self.normalizer.normalize(raw);
                    debug!(
                        "{} {} {} (rv={})",
                        evt.event_type, self.kind, evt.identity, evt.resource_version
                    );
                    self.handler.handle(evt).await;
                },
                Some(Err(err)) if WatchError::is_unsupported_resource(&err) => return StreamEnd::Unsupported,
                Some(Err(err)) if !accepted => return StreamEnd::Failed(err),
                Some(Err(err)) => {
                    warn!("watch stream for {} failed: {err}", self.kind);
                    return StreamEnd::Closed;
                },
                None => {
                    self.retries = 0;
                    return StreamEnd::Closed;
                },
            }
        }
    }

    async fn pause(&self, secs: u64) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = sleep(Duration::from_secs(secs)) => true,
        }
    }

    fn set_state(&self, state: SubscriptionState) {
        self.state_tx.send_replace(state);
    }
}
