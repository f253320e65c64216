//! End-to-end polling and merge scenarios against mock providers.

use std::sync::Arc;
use std::time::Duration;

use provider_aggregator::document::HttpConfiguration;
use provider_aggregator::lifecycle::{Aggregator, LifecycleError, PollerSettings, Shutdown};
use provider_aggregator::polling::PollOutcome;
use provider_aggregator::registry::{MemoryRegistry, SourceId, SourceRegistry, SourceUpdate};
use provider_aggregator::status::{self, SourceHealth};
use serde_json::json;

mod common;
use common::{document, new_source, MockProvider};

fn settings() -> PollerSettings {
    PollerSettings {
        min_interval: Duration::from_secs(5),
        fetch_timeout: Duration::from_secs(2),
    }
}

fn aggregator(registry: Arc<MemoryRegistry>) -> Aggregator {
    Aggregator::new(registry, settings(), Shutdown::new()).unwrap()
}

#[tokio::test]
async fn test_add_then_remove_source() {
    let provider = MockProvider::start(200, &document(&["r1", "r2"], &["svc"])).await;
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry.clone());
    let local = HttpConfiguration::default();

    let source = registry.create(new_source("edge", &provider.url(), 1)).await.unwrap();
    aggregator.on_source_created(&source).await;

    assert!(aggregator.is_polling(source.id));
    let merged = aggregator.merged(&local);
    assert_eq!(merged.config.http.routers.len(), 2);
    assert_eq!(merged.config.http.services.len(), 1);
    assert!(merged.conflicts.is_empty());

    let stored = registry.get(source.id).await.unwrap().unwrap();
    assert!(stored.last_fetched.is_some());
    assert_eq!(stored.counts.routers, 2);

    aggregator.on_source_deleted(source.id).unwrap();
    registry.delete(source.id).await.unwrap();

    // Gone from the very next merge, without waiting for a poll.
    assert!(aggregator.merged(&local).config.http.is_empty());
    assert!(!aggregator.is_polling(source.id));
    assert!(aggregator.cache().get(source.id).is_none());
}

#[tokio::test]
async fn test_fetch_failure_after_success_excludes_source() {
    let provider = MockProvider::start(200, &document(&["api"], &[])).await;
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry.clone());
    let local = HttpConfiguration::default();

    let source = registry.create(new_source("flaky", &provider.url(), 1)).await.unwrap();
    aggregator.start(&source).await;
    assert_eq!(aggregator.merged(&local).config.http.routers.len(), 1);

    provider.respond(500, "");
    let outcome = aggregator.refresh_and_wait(source.id).await.unwrap();
    assert_eq!(outcome, PollOutcome::Failed);

    // The document is retained but the erroring source stays out of the merge.
    let snapshot = aggregator.cache().get(source.id).unwrap();
    assert!(snapshot.document.is_some());
    assert_eq!(snapshot.last_error, "HTTP 500: Internal Server Error");
    assert!(aggregator.merged(&local).config.http.is_empty());

    let stored = registry.get(source.id).await.unwrap().unwrap();
    assert_eq!(stored.last_error, "HTTP 500: Internal Server Error");
    assert_eq!(stored.counts.routers, 1);

    let report = status::sources_info(registry.as_ref(), aggregator.cache(), local.counts())
        .await
        .unwrap();
    assert_eq!(report[1].name, "flaky");
    assert_eq!(report[1].status, SourceHealth::Degraded);

    // Recovery clears the error and the source participates again.
    provider.respond(200, &document(&["api", "web"], &[]));
    assert_eq!(aggregator.refresh_and_wait(source.id).await.unwrap(), PollOutcome::Updated);
    assert_eq!(aggregator.merged(&local).config.http.routers.len(), 2);
}

#[tokio::test]
async fn test_unreachable_source_is_unhealthy() {
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry.clone());

    let source = registry
        .create(new_source("down", "http://127.0.0.1:1/config", 1))
        .await
        .unwrap();
    aggregator.start(&source).await;

    let snapshot = aggregator.cache().get(source.id).unwrap();
    assert!(snapshot.document.is_none());
    assert!(snapshot.last_error.starts_with("Connection error: "));

    let report = status::sources_info(registry.as_ref(), aggregator.cache(), Default::default())
        .await
        .unwrap();
    assert_eq!(report[1].status, SourceHealth::Unhealthy);
}

#[tokio::test]
async fn test_refresh_unknown_source_is_not_found() {
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry);

    let err = aggregator.refresh_now(SourceId(404)).await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(SourceId(404))));
    assert!(matches!(aggregator.stop(SourceId(404)), Err(LifecycleError::NotFound(_))));
}

#[tokio::test]
async fn test_refresh_now_does_not_block() {
    let provider = MockProvider::start(200, &document(&["r"], &[])).await;
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry.clone());

    let source = registry.create(new_source("slow", &provider.url(), 1)).await.unwrap();
    aggregator.start(&source).await;
    assert_eq!(provider.hits(), 1);

    provider.set_delay(Duration::from_millis(500));
    let started = tokio::time::Instant::now();
    aggregator.refresh_now(source.id).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(400));

    assert!(common::eventually(Duration::from_secs(3), || provider.hits() == 2).await);
}

#[tokio::test]
async fn test_priority_change_restarts_poller() {
    let a = MockProvider::start(200, &document(&["shared"], &[])).await;
    let b = MockProvider::start(200, &json!({"http": {"routers": {"shared": {"service": "from-b"}}}}).to_string()).await;
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry.clone());
    let local = HttpConfiguration::default();

    let source_a = registry.create(new_source("a", &a.url(), 10)).await.unwrap();
    let source_b = registry.create(new_source("b", &b.url(), 5)).await.unwrap();
    aggregator.start_all().await.unwrap();
    assert_eq!(aggregator.poller_count(), 2);

    let merged = aggregator.merged(&local);
    assert_ne!(merged.config.http.routers["shared"]["service"], json!("from-b"));
    assert_eq!(merged.conflicts[0].source, "b");
    assert_eq!(merged.conflicts[0].source_priority, 5);

    let updated = registry
        .update(
            source_b.id,
            SourceUpdate {
                priority: Some(20),
                ..SourceUpdate::default()
            },
        )
        .await
        .unwrap();
    aggregator.on_source_updated(&updated).await;

    let merged = aggregator.merged(&local);
    assert_eq!(merged.config.http.routers["shared"]["service"], json!("from-b"));
    assert_eq!(merged.conflicts[0].source, "a");
    assert_eq!(merged.conflicts[0].overridden_by, "b");
    assert_eq!(merged.conflicts[0].source_priority, 10);
    assert_eq!(aggregator.poller_count(), 2);
    assert!(aggregator.is_polling(source_a.id));
}

#[tokio::test]
async fn test_deactivation_stops_and_evicts() {
    let provider = MockProvider::start(200, &document(&["r"], &[])).await;
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry.clone());

    let source = registry.create(new_source("edge", &provider.url(), 1)).await.unwrap();
    aggregator.start(&source).await;
    assert!(aggregator.is_polling(source.id));

    let updated = registry
        .update(
            source.id,
            SourceUpdate {
                is_active: Some(false),
                ..SourceUpdate::default()
            },
        )
        .await
        .unwrap();
    aggregator.on_source_updated(&updated).await;

    assert!(!aggregator.is_polling(source.id));
    assert!(aggregator.cache().get(source.id).is_none());
    assert!(aggregator.merged(&HttpConfiguration::default()).config.http.is_empty());
}

#[tokio::test]
async fn test_late_result_after_stop_is_discarded() {
    let provider = MockProvider::start(200, &document(&["late"], &[])).await;
    provider.set_delay(Duration::from_millis(500));
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry.clone());

    let source = registry.create(new_source("slow", &provider.url(), 1)).await.unwrap();
    let starting = {
        let aggregator = aggregator.clone();
        let source = source.clone();
        tokio::spawn(async move { aggregator.start(&source).await })
    };

    assert!(common::eventually(Duration::from_secs(2), || provider.hits() == 1).await);
    aggregator.stop(source.id).unwrap();
    starting.await.unwrap();

    assert!(aggregator.cache().get(source.id).is_none());
    assert!(!aggregator.is_polling(source.id));
    assert!(aggregator.merged(&HttpConfiguration::default()).config.http.is_empty());
}

#[tokio::test]
async fn test_local_items_win_over_sources() {
    let provider = MockProvider::start(200, &document(&["app", "extra"], &[])).await;
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry.clone());

    let mut local = HttpConfiguration::default();
    local.routers.insert("app".into(), json!({"rule": "Host(`local.example.com`)"}));

    let source = registry.create(new_source("remote", &provider.url(), 100)).await.unwrap();
    aggregator.start(&source).await;

    let merged = aggregator.merged(&local);
    assert_eq!(merged.config.http.routers["app"], json!({"rule": "Host(`local.example.com`)"}));
    assert!(merged.config.http.routers.contains_key("extra"));
    assert_eq!(merged.conflicts.len(), 1);
    assert_eq!(merged.conflicts[0].overridden_by, "local");
}

#[tokio::test]
async fn test_scheduled_tick_refreshes_document() {
    let provider = MockProvider::start(200, &document(&["v1"], &[])).await;
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry.clone());
    let local = HttpConfiguration::default();

    let mut new = new_source("ticking", &provider.url(), 1);
    new.refresh_interval = 5;
    let source = registry.create(new).await.unwrap();
    aggregator.start(&source).await;
    assert!(aggregator.merged(&local).config.http.routers.contains_key("v1"));

    provider.respond(200, &document(&["v2"], &[]));
    let refreshed = common::eventually(Duration::from_secs(9), || {
        aggregator.merged(&local).config.http.routers.contains_key("v2")
    })
    .await;
    assert!(refreshed);
}

#[tokio::test]
async fn test_poller_stops_when_source_disappears() {
    let provider = MockProvider::start(200, &document(&["r"], &[])).await;
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry.clone());

    let mut new = new_source("orphan", &provider.url(), 1);
    new.refresh_interval = 5;
    let source = registry.create(new).await.unwrap();
    aggregator.start(&source).await;

    // Removed behind the aggregator's back; the next tick notices.
    registry.delete(source.id).await.unwrap();
    let stopped = common::eventually(Duration::from_secs(9), || !aggregator.is_polling(source.id)).await;
    assert!(stopped);
    assert!(aggregator.cache().get(source.id).is_none());
}

#[tokio::test]
async fn test_start_all_fails_without_registry() {
    let aggregator = Aggregator::new(Arc::new(common::UnavailableRegistry), settings(), Shutdown::new()).unwrap();
    let err = aggregator.start_all().await.unwrap_err();
    assert!(matches!(err, LifecycleError::StartupLoad(_)));
}

#[tokio::test]
async fn test_start_all_skips_inactive_and_stop_all_clears() {
    let provider = MockProvider::start(200, &document(&["r"], &[])).await;
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry.clone());

    registry.create(new_source("one", &provider.url(), 1)).await.unwrap();
    let mut inactive = new_source("two", &provider.url(), 2);
    inactive.is_active = false;
    registry.create(inactive).await.unwrap();

    assert_eq!(aggregator.start_all().await.unwrap(), 2);
    assert_eq!(aggregator.poller_count(), 1);
    assert_eq!(provider.hits(), 1);

    aggregator.stop_all().await;
    assert_eq!(aggregator.poller_count(), 0);
}

#[tokio::test]
async fn test_shutdown_broadcast_ends_pollers() {
    let provider = MockProvider::start(200, &document(&["r"], &[])).await;
    let registry = Arc::new(MemoryRegistry::new());
    let shutdown = Shutdown::new();
    let aggregator = Aggregator::new(registry.clone(), settings(), shutdown.clone()).unwrap();

    registry.create(new_source("one", &provider.url(), 1)).await.unwrap();
    aggregator.start_all().await.unwrap();
    assert_eq!(shutdown.receiver_count(), 1);

    shutdown.trigger();
    assert!(common::eventually(Duration::from_secs(2), || shutdown.receiver_count() == 0).await);
}

#[tokio::test]
async fn test_oversized_interval_keeps_poller_alive() {
    let provider = MockProvider::start(200, &document(&["r"], &[])).await;
    let registry = Arc::new(MemoryRegistry::new());
    let shutdown = Shutdown::new();
    let aggregator = Aggregator::new(registry.clone(), settings(), shutdown.clone()).unwrap();

    // The registry refuses such intervals; a record from another store may still carry one.
    let mut source = registry.create(new_source("sleepy", &provider.url(), 1)).await.unwrap();
    source.refresh_interval = u64::MAX;
    aggregator.start(&source).await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(aggregator.is_polling(source.id));
    // A poller task that died would have dropped its shutdown receiver.
    assert_eq!(shutdown.receiver_count(), 1);

    aggregator.stop_all().await;
    assert_eq!(shutdown.receiver_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_start_and_stop_never_orphan_a_poller() {
    let provider = MockProvider::start(200, &document(&["r"], &[])).await;
    let registry = Arc::new(MemoryRegistry::new());
    let aggregator = aggregator(registry.clone());
    let source = registry.create(new_source("racy", &provider.url(), 1)).await.unwrap();

    for _ in 0..50 {
        let starting = {
            let aggregator = aggregator.clone();
            let source = source.clone();
            tokio::spawn(async move { aggregator.start(&source).await })
        };
        let stopping = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                let _ = aggregator.stop(source.id);
            })
        };
        starting.await.unwrap();
        stopping.await.unwrap();

        // Either the stop won and nothing is left, or the start won and owns the slot.
        assert_eq!(
            aggregator.is_polling(source.id),
            aggregator.cache().get(source.id).is_some()
        );
        let _ = aggregator.stop(source.id);
    }
}
