//! End-to-end placement flows through the public coordinators.

use adkit_lib::test_utils::{MockAdNetwork, MockFullScreenAd, MockOverlay, SwitchGate};
use adkit_lib::{
    shared_registry, FullScreenEvent, Gates, LoadCoordinator, LoadEvent, PlacementConfig,
    PlacementKey, PresentationCoordinator, ScreenLifecycle, SharedRegistry, ShowError, ShowEvent,
    Unavailable,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    network: Arc<MockAdNetwork>,
    overlay: Arc<MockOverlay>,
    online: Arc<SwitchGate>,
    entitled: Arc<SwitchGate>,
    registry: SharedRegistry,
    loads: LoadCoordinator,
    shows: PresentationCoordinator,
}

fn harness(network: MockAdNetwork) -> Harness {
    let network = Arc::new(network);
    let overlay = Arc::new(MockOverlay::new());
    let online = SwitchGate::new_shared(true);
    let entitled = SwitchGate::new_shared(false);
    let registry = shared_registry();
    let gates = Gates::new(online.clone(), entitled.clone());

    Harness {
        loads: LoadCoordinator::new(registry.clone(), gates.clone(), network.clone()),
        shows: PresentationCoordinator::new(
            registry.clone(),
            gates,
            network.clone(),
            overlay.clone(),
            Duration::from_millis(1000),
        ),
        network,
        overlay,
        online,
        entitled,
        registry,
    }
}

#[tokio::test(start_paused = true)]
async fn test_load_show_dismiss_for_key_42() {
    let h = harness(MockAdNetwork::new());
    let lifecycle = ScreenLifecycle::new("main");
    let key = PlacementKey::Id(42);
    let config = PlacementConfig::new("ad-x");

    assert_eq!(h.loads.request_load(key.clone(), &config).await, LoadEvent::Loaded);
    {
        let registry = h.registry.lock().unwrap();
        let slot = registry.get(&key).unwrap();
        assert!(!slot.is_loading());
        let handle = slot.handle().unwrap();
        assert_eq!(handle.unit_id(), "ad-x");
        assert_eq!(
            handle.downcast_ref::<MockFullScreenAd>(),
            Some(&MockFullScreenAd { serial: 1 })
        );
    }

    let mut stream = h.shows.show(key.clone(), &config, &lifecycle.screen());
    assert_eq!(h.overlay.open_count(), 1);
    assert_eq!(h.network.show_calls(), 0);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(h.network.show_calls(), 1);

    h.network.emit(FullScreenEvent::Impression);
    h.network.emit(FullScreenEvent::Shown);
    h.network.emit(FullScreenEvent::Clicked);
    h.network.emit(FullScreenEvent::Dismissed);

    assert_eq!(stream.next().await, Some(ShowEvent::Impression));
    assert_eq!(stream.next().await, Some(ShowEvent::Shown));
    assert_eq!(stream.next().await, Some(ShowEvent::Clicked));
    assert_eq!(stream.next().await, Some(ShowEvent::Dismissed));
    assert_eq!(stream.next().await, None);

    assert!(h.registry.lock().unwrap().get(&key).is_none());
    assert_eq!(h.overlay.open_count(), 0);
}

#[tokio::test]
async fn test_offline_load_creates_no_slot() {
    let h = harness(MockAdNetwork::new());
    h.online.set(false);

    let event = h
        .loads
        .request_load(PlacementKey::Id(42), &PlacementConfig::new("ad-x"))
        .await;

    assert_eq!(event, LoadEvent::NotAvailable(Unavailable::NetworkUnavailable));
    assert!(h.registry.lock().unwrap().is_empty());
    assert_eq!(h.network.load_requests(), 0);
}

#[tokio::test]
async fn test_remote_kill_switch_reported_before_entitlement() {
    let h = harness(MockAdNetwork::new());
    h.entitled.set(true);
    let config = PlacementConfig::new("ad-x").with_remote_enabled(false);

    let event = h.loads.request_load(PlacementKey::Id(1), &config).await;
    assert_eq!(event, LoadEvent::NotAvailable(Unavailable::ConfigurationDisabled));
}

#[tokio::test]
async fn test_load_failure_allows_fresh_attempt() {
    let h = harness(MockAdNetwork::new().fail_next_load(3));
    let key = PlacementKey::from("results");
    let config = PlacementConfig::new("ad-x");

    assert_eq!(
        h.loads.request_load(key.clone(), &config).await,
        LoadEvent::FailedToLoad { code: 3 }
    );
    {
        let registry = h.registry.lock().unwrap();
        let slot = registry.get(&key).unwrap();
        assert!(!slot.is_loading());
        assert!(slot.handle().is_none());
    }

    assert_eq!(h.loads.request_load(key.clone(), &config).await, LoadEvent::Loaded);
    assert_eq!(h.network.load_requests(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_show_after_dismiss_requires_new_load() {
    let h = harness(MockAdNetwork::new().with_show_script(vec![
        FullScreenEvent::Shown,
        FullScreenEvent::Dismissed,
    ]));
    let lifecycle = ScreenLifecycle::new("main");
    let key = PlacementKey::Id(5);
    let config = PlacementConfig::new("ad-x");

    h.loads.request_load(key.clone(), &config).await;
    let first = h.shows.show(key.clone(), &config, &lifecycle.screen());
    assert_eq!(first.terminal().await, ShowEvent::Dismissed);

    let second = h.shows.show(key.clone(), &config, &lifecycle.screen());
    assert_eq!(
        second.terminal().await,
        ShowEvent::NotAvailable(Unavailable::NoAdReady)
    );

    h.loads.request_load(key.clone(), &config).await;
    let third = h.shows.show(key.clone(), &config, &lifecycle.screen());
    assert_eq!(third.terminal().await, ShowEvent::Dismissed);
    assert_eq!(h.network.show_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_show_failure_releases_slot() {
    let h = harness(MockAdNetwork::new().with_show_script(vec![FullScreenEvent::FailedToShow(
        ShowError::new(1, "ad already used"),
    )]));
    let lifecycle = ScreenLifecycle::new("main");
    let key = PlacementKey::Id(8);
    let config = PlacementConfig::new("ad-x");

    h.loads.request_load(key.clone(), &config).await;
    let events = h.shows.show(key.clone(), &config, &lifecycle.screen()).collect().await;

    assert_eq!(
        events,
        vec![ShowEvent::FailedToShow(ShowError::new(1, "ad already used"))]
    );
    assert!(!h.loads.is_ready(&key));
    assert_eq!(h.overlay.open_count(), 0);
}

#[tokio::test]
async fn test_entitled_user_never_reaches_network() {
    let h = harness(MockAdNetwork::new());
    let lifecycle = ScreenLifecycle::new("main");
    let key = PlacementKey::Id(42);
    let config = PlacementConfig::new("ad-x");

    h.loads.request_load(key.clone(), &config).await;
    h.entitled.set(true);

    assert_eq!(
        h.loads.request_load(PlacementKey::Id(43), &config).await,
        LoadEvent::NotAvailable(Unavailable::NotEntitled)
    );
    let stream = h.shows.show(key.clone(), &config, &lifecycle.screen());
    assert_eq!(
        stream.terminal().await,
        ShowEvent::NotAvailable(Unavailable::NotEntitled)
    );

    assert_eq!(h.network.load_requests(), 1);
    assert_eq!(h.network.show_calls(), 0);
    assert_eq!(h.overlay.opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_lifecycle_cancels_pending_show() {
    let h = harness(MockAdNetwork::new());
    let lifecycle = ScreenLifecycle::new("main");
    let key = PlacementKey::Id(11);
    let config = PlacementConfig::new("ad-x");

    h.loads.request_load(key.clone(), &config).await;
    let stream = h.shows.show(key.clone(), &config, &lifecycle.screen());
    drop(lifecycle);

    assert_eq!(stream.terminal().await, ShowEvent::Cancelled);
    assert_eq!(h.network.show_calls(), 0);
    assert_eq!(h.overlay.open_count(), 0);
    assert!(h.loads.is_ready(&key));
}

#[tokio::test(start_paused = true)]
async fn test_show_rechecks_gates_with_ad_cached() {
    let h = harness(MockAdNetwork::new());
    let lifecycle = ScreenLifecycle::new("main");
    let key = PlacementKey::Id(3);
    let config = PlacementConfig::new("ad-x");
    assert_eq!(h.loads.request_load(key.clone(), &config).await, LoadEvent::Loaded);

    h.online.set(false);
    let offline = h.shows.show(key.clone(), &config, &lifecycle.screen());
    assert_eq!(
        offline.terminal().await,
        ShowEvent::NotAvailable(Unavailable::NetworkUnavailable)
    );

    h.online.set(true);
    let disabled = config.clone().with_remote_enabled(false);
    let killed = h.shows.show(key.clone(), &disabled, &lifecycle.screen());
    assert_eq!(
        killed.terminal().await,
        ShowEvent::NotAvailable(Unavailable::ConfigurationDisabled)
    );

    h.entitled.set(true);
    let purchased = h.shows.show(key.clone(), &config, &lifecycle.screen());
    assert_eq!(
        purchased.terminal().await,
        ShowEvent::NotAvailable(Unavailable::NotEntitled)
    );

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(h.network.show_calls(), 0);
    assert_eq!(h.overlay.open_count(), 0);
    assert!(h.loads.is_ready(&key));
    assert!(!h.registry.lock().unwrap().get(&key).unwrap().is_presenting());
}
