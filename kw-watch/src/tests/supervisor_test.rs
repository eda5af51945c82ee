use std::time::Duration;

use assertables::*;
use async_trait::async_trait;
use futures::{
    StreamExt,
    stream,
};
use tokio::time::Instant;

use super::*;
use crate::cluster::MockClusterApi;
use crate::errors::*;

// Every watch opens successfully and then stays quiet until cancelled.
fn quiet_api() -> MockClusterApi {
    let mut api = MockClusterApi::new();
    api.expect_open_watch().returning(|_, _| Ok(stream::pending().boxed()));
    api
}

fn explicit_config() -> WatcherConfig {
    WatcherConfig {
        namespace: Some(TEST_NAMESPACE.into()),
        kinds: vec![DEPL_KIND.clone(), POD_RESOURCE_KIND.clone()],
        watch_all: false,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn test_stop_without_start() {
    let supervisor = WatchSupervisor::new(Arc::new(MockClusterApi::new()), WatcherConfig::default());
    assert!(!supervisor.is_watching());

    supervisor.stop().await;
    assert!(!supervisor.is_watching());
    assert_eq!(supervisor.active_loops(), 0);
    assert!(supervisor.subscription_states().await.is_empty());
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_start_and_stop(recorder: (Arc<dyn EventHandler>, Recorded)) {
    let supervisor = WatchSupervisor::new(Arc::new(quiet_api()), explicit_config());

    supervisor.start(recorder.0).await.unwrap();
    assert!(supervisor.is_watching());
    assert_eq!(supervisor.active_loops(), 2);

    settle().await;
    let states = supervisor.subscription_states().await;
    assert_eq!(states, vec![
        (DEPL_KIND.clone(), SubscriptionState::Watching),
        (POD_RESOURCE_KIND.clone(), SubscriptionState::Watching),
    ]);

    supervisor.stop().await;
    assert!(!supervisor.is_watching());
    assert_eq!(supervisor.active_loops(), 0);
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_start_twice_is_rejected(recorder: (Arc<dyn EventHandler>, Recorded)) {
    let supervisor = WatchSupervisor::new(Arc::new(quiet_api()), explicit_config());
    supervisor.start(recorder.0.clone()).await.unwrap();
    settle().await;

    let err = supervisor.start(recorder.0).await.unwrap_err();
    assert!(WatchError::is_already_running(&err));
    assert!(matches!(err.downcast_ref::<WatchError>(), Some(WatchError::AlreadyRunning(2))));

    // The first run is untouched
    assert!(supervisor.is_watching());
    assert_eq!(supervisor.active_loops(), 2);
    assert!(
        supervisor
            .subscription_states()
            .await
            .iter()
            .all(|(_, s)| *s == SubscriptionState::Watching)
    );

    supervisor.stop().await;
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_restart_after_stop(recorder: (Arc<dyn EventHandler>, Recorded)) {
    let supervisor = WatchSupervisor::new(Arc::new(quiet_api()), explicit_config());

    supervisor.start(recorder.0.clone()).await.unwrap();
    supervisor.stop().await;
    supervisor.start(recorder.0).await.unwrap();
    assert!(supervisor.is_watching());
    assert_eq!(supervisor.active_loops(), 2);
    supervisor.stop().await;
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_default_kinds(recorder: (Arc<dyn EventHandler>, Recorded)) {
    let mut api = MockClusterApi::new();
    api.expect_api_catalog().never();
    api.expect_open_watch()
        .withf(|kind, ns| !kind.namespaced() || ns.as_deref() == Some(DEFAULT_NAMESPACE))
        .returning(|_, _| Ok(stream::pending().boxed()));

    let config = WatcherConfig { namespace: Some(DEFAULT_NAMESPACE.into()), ..Default::default() };
    let supervisor = WatchSupervisor::new(Arc::new(api), config);
    supervisor.start(recorder.0).await.unwrap();
    settle().await;

    let kinds: Vec<_> = supervisor.subscription_states().await.into_iter().map(|(k, _)| k).collect();
    assert_eq!(kinds, *DEFAULT_WATCHED_KINDS);
    supervisor.stop().await;
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_watch_all_uses_discovery(recorder: (Arc<dyn EventHandler>, Recorded)) {
    let catalog = ApiCatalog {
        resource_lists: vec![serde_json::from_value(apps_v1_discovery()).unwrap()],
        failures: vec![],
    };

    let mut api = MockClusterApi::new();
    api.expect_api_catalog().times(1).returning(move || Ok(catalog.clone()));
    api.expect_open_watch().times(3).returning(|_, _| Ok(stream::pending().boxed()));

    let config = WatcherConfig { watch_all: true, ..Default::default() };
    let supervisor = WatchSupervisor::new(Arc::new(api), config);
    supervisor.start(recorder.0).await.unwrap();
    settle().await;

    let kinds: Vec<_> = supervisor
        .subscription_states()
        .await
        .into_iter()
        .map(|(k, _)| k.kind().to_string())
        .collect();
    assert_eq!(kinds, vec!["DaemonSet", "Deployment", "StatefulSet"]);
    supervisor.stop().await;
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn test_discovery_failure_leaves_supervisor_stopped(recorder: (Arc<dyn EventHandler>, Recorded)) {
    let mut api = MockClusterApi::new();
    api.expect_api_catalog()
        .returning(|| Err(WatchError::discovery_failed("connection refused")));
    api.expect_open_watch().never();

    let config = WatcherConfig { watch_all: true, ..Default::default() };
    let supervisor = WatchSupervisor::new(Arc::new(api), config);

    let err = supervisor.start(recorder.0).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<WatchError>(), Some(WatchError::DiscoveryFailed(_))));
    assert!(!supervisor.is_watching());
    assert_eq!(supervisor.active_loops(), 0);
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_unsupported_kind_does_not_affect_others(
    recorder: (Arc<dyn EventHandler>, Recorded),
    test_pod: DynamicObject,
) {
    let mut api = MockClusterApi::new();
    api.expect_open_watch().returning(move |kind, _| {
        if kind.kind() == DEPLOYMENT_KIND {
            Err(WatchError::unsupported_resource(&kind.to_string()))
        } else {
            let events = vec![Ok(RawEvent::Added(test_pod.clone()))];
            Ok(stream::iter(events).chain(stream::pending()).boxed())
        }
    });

    let supervisor = WatchSupervisor::new(Arc::new(api), explicit_config());
    supervisor.start(recorder.0).await.unwrap();
    settle().await;

    assert_eq!(supervisor.active_loops(), 1);
    assert_eq!(supervisor.subscription_states().await, vec![
        (DEPL_KIND.clone(), SubscriptionState::Terminated),
        (POD_RESOURCE_KIND.clone(), SubscriptionState::Watching),
    ]);
    {
        let events = recorder.1.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, *POD_RESOURCE_KIND);
        assert_eq!(events[0].identity, Identity::new(TEST_NAMESPACE, TEST_POD));
    }

    supervisor.stop().await;
    assert_eq!(supervisor.active_loops(), 0);
}

// Never finishes handling an event, so the loop that calls it can't observe cancellation.
struct StuckHandler;

#[async_trait]
impl EventHandler for StuckHandler {
    async fn handle(&self, _: ResourceEvent) {
        std::future::pending::<()>().await;
    }
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_stop_aborts_stuck_loops(test_deployment: DynamicObject) {
    let mut api = MockClusterApi::new();
    api.expect_open_watch().times(1).returning(move |_, _| {
        let events = stream::iter(vec![Ok(RawEvent::Added(test_deployment.clone()))]);
        Ok(events.chain(stream::pending()).boxed())
    });

    let config = WatcherConfig { kinds: vec![DEPL_KIND.clone()], ..explicit_config() };
    let supervisor = WatchSupervisor::new(Arc::new(api), config);
    supervisor.start(Arc::new(StuckHandler)).await.unwrap();
    settle().await;
    assert_eq!(supervisor.active_loops(), 1);

    let start = Instant::now();
    supervisor.stop().await;

    assert_ge!(start.elapsed(), Duration::from_secs(STOP_GRACE_PERIOD_SECONDS));
    assert_lt!(start.elapsed(), Duration::from_secs(STOP_GRACE_PERIOD_SECONDS + 1));
    assert!(!supervisor.is_watching());
    assert!(logs_contain("aborting 1 remaining"));

    settle().await;
    assert_eq!(supervisor.active_loops(), 0);
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_concurrent_starts(recorder: (Arc<dyn EventHandler>, Recorded)) {
    // Two kinds, one run: anything more than two opens means both starts spawned loops.
    let mut api = MockClusterApi::new();
    api.expect_open_watch().times(2).returning(|_, _| Ok(stream::pending().boxed()));
    let supervisor = WatchSupervisor::new(Arc::new(api), explicit_config());

    let (first, second) = tokio::join!(supervisor.start(recorder.0.clone()), supervisor.start(recorder.0.clone()));
    let results = [first, second];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| r.as_ref().is_err_and(WatchError::is_already_running))
            .count(),
        1
    );

    settle().await;
    assert_eq!(supervisor.active_loops(), 2);
    assert_eq!(supervisor.subscription_states().await.len(), 2);

    supervisor.stop().await;
    assert_eq!(supervisor.active_loops(), 0);
}
