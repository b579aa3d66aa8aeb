//! Tests for the AdMediator facade driven by a remote-config document.

use adkit_lib::test_utils::{MockAdNetwork, MockContainer, MockOverlay, SurfaceCall, SwitchGate};
use adkit_lib::{
    AdError, AdMediator, BannerKind, FullScreenEvent, LoadEvent, MediationConfig, ScreenLifecycle,
    ShowEvent, Unavailable,
};
use std::sync::Arc;
use std::time::Duration;

const REMOTE_CONFIG: &str = r#"{
    "grace_delay_ms": 250,
    "placements": {
        "level_end": { "unit_id": "unit/level-end" },
        "home_banner": { "unit_id": "unit/home-banner", "kind": "banner" },
        "results_banner": {
            "unit_id": "unit/results-banner",
            "kind": "collapsible_banner",
            "collapsible": "bottom"
        },
        "feed_native": { "unit_id": "unit/feed", "kind": "native", "native_layout": "small" },
        "app_open": { "unit_id": "unit/app-open", "kind": "app_open" },
        "legacy": { "unit_id": "unit/legacy", "remote_enabled": false }
    }
}"#;

fn create_mediator() -> (AdMediator, Arc<MockAdNetwork>, Arc<MockOverlay>) {
    let config = MediationConfig::from_json(REMOTE_CONFIG).unwrap();
    let network = Arc::new(MockAdNetwork::new());
    let overlay = Arc::new(MockOverlay::new());
    let mediator = AdMediator::new(
        config,
        network.clone(),
        overlay.clone(),
        SwitchGate::new_shared(true),
        SwitchGate::new_shared(false),
    );
    (mediator, network, overlay)
}

#[tokio::test(start_paused = true)]
async fn test_interstitial_flow_uses_configured_grace_delay() {
    let (mediator, network, overlay) = create_mediator();
    let lifecycle = ScreenLifecycle::new("game");

    assert_eq!(
        mediator.request_load_named("level_end").await.unwrap(),
        LoadEvent::Loaded
    );
    let stream = mediator.show_named("level_end", &lifecycle.screen()).unwrap();

    tokio::time::sleep(Duration::from_millis(249)).await;
    assert_eq!(network.show_calls(), 0);
    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(network.show_calls(), 1);

    network.emit(FullScreenEvent::Dismissed);
    assert_eq!(stream.terminal().await, ShowEvent::Dismissed);
    assert_eq!(overlay.open_count(), 0);
    assert!(!mediator.is_ready("level_end"));
}

#[tokio::test]
async fn test_disabled_placement_is_not_requested() {
    let (mediator, network, _) = create_mediator();

    assert_eq!(
        mediator.request_load_named("legacy").await.unwrap(),
        LoadEvent::NotAvailable(Unavailable::ConfigurationDisabled)
    );
    assert_eq!(network.load_requests(), 0);
    assert_eq!(mediator.slot_count(), 0);
}

#[tokio::test]
async fn test_unknown_placement_is_a_config_error() {
    let (mediator, _, _) = create_mediator();
    let lifecycle = ScreenLifecycle::new("game");

    assert!(matches!(
        mediator.show_named("nope", &lifecycle.screen()),
        Err(AdError::Config(_))
    ));
}

#[tokio::test]
async fn test_collapsible_banner_request_and_teardown() {
    let (mediator, network, _) = create_mediator();
    let container = Arc::new(MockContainer::new(1440, 3.0));

    let event = mediator
        .bind_surface_named("results_banner", container.clone())
        .await
        .unwrap();
    assert_eq!(event, LoadEvent::Loaded);
    assert!(container.has_child());

    let requests = network.surface_requests();
    let request = &requests[0];
    assert_eq!(request.ad.extras.get("collapsible").map(String::as_str), Some("bottom"));
    assert_eq!(request.size.width_dp, 480);
    assert!(mediator.surfaces().is_loaded(BannerKind::Collapsible));

    // Destroy twice: destroyed exactly once, then nulled.
    mediator.on_screen_destroyed();
    mediator.on_screen_destroyed();
    assert!(mediator.surfaces().surface(BannerKind::Collapsible).is_none());
    assert_eq!(
        network.surfaces()[0].calls(),
        vec![SurfaceCall::Load, SurfaceCall::Destroy]
    );
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_binding_follows_screen() {
    let (mediator, network, _) = create_mediator();
    let lifecycle = ScreenLifecycle::new("home");
    let binding = mediator.bind_lifecycle(&lifecycle.screen());

    mediator
        .bind_surface_named("home_banner", Arc::new(MockContainer::new(1080, 2.5)))
        .await
        .unwrap();
    lifecycle.pause();
    tokio::time::sleep(Duration::from_millis(1)).await;
    drop(lifecycle);
    binding.await.unwrap();

    assert!(mediator.surfaces().surface(BannerKind::Plain).is_none());
    assert_eq!(
        network.surfaces()[0].calls(),
        vec![SurfaceCall::Load, SurfaceCall::Pause, SurfaceCall::Destroy]
    );
}

#[tokio::test]
async fn test_native_and_app_open_placements() {
    let (mediator, network, _) = create_mediator();
    let lifecycle = ScreenLifecycle::new("feed");

    assert_eq!(
        mediator
            .load_native_named("feed_native", &lifecycle.screen())
            .await
            .unwrap(),
        LoadEvent::Loaded
    );
    assert!(mediator.native().is_some());
    mediator.destroy_native();
    assert!(network.natives()[0].is_destroyed());

    let app_open = mediator.app_open().unwrap();
    assert_eq!(app_open.load().await, LoadEvent::Loaded);
    assert!(app_open.is_ad_available());
}
