//! The per-session composition root.

use crate::app_open::{AppOpenCoordinator, APP_OPEN_KEY};
use crate::client::{AdNetworkClient, NativeAd};
use crate::config::{MediationConfig, PlacementConfig};
use crate::gates::{ConsentGate, EntitlementGate, Gates, NetworkGate, SwitchGate};
use crate::load::{LoadCoordinator, LoadEvent};
use crate::native::NativeAdCoordinator;
use crate::presentation::{PresentationCoordinator, ShowStream};
use crate::screen::{DisplayContainer, HostScreen, LoadingOverlay};
use crate::slot::PlacementKey;
use crate::surface::SurfaceLifecycleBinder;
use crate::{lock_registry, shared_registry, Result, SharedRegistry};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Owns the registry, the gates and every coordinator for one host session.
///
/// Construct one per session and hand it to the screens that show ads. Keyed
/// operations take an explicit [`PlacementConfig`]; the `_named` variants
/// resolve it from the [`MediationConfig`] and key the slot by name.
pub struct AdMediator {
    config: MediationConfig,
    registry: SharedRegistry,
    gates: Gates,
    loads: LoadCoordinator,
    shows: PresentationCoordinator,
    surfaces: Arc<SurfaceLifecycleBinder>,
    natives: NativeAdCoordinator,
    app_open: Option<AppOpenCoordinator>,
}

impl AdMediator {
    /// Build a mediator. Consent defaults to granted; see
    /// [`with_consent`](Self::with_consent).
    pub fn new(
        config: MediationConfig,
        client: Arc<dyn AdNetworkClient>,
        overlay: Arc<dyn LoadingOverlay>,
        network: Arc<dyn NetworkGate>,
        entitlement: Arc<dyn EntitlementGate>,
    ) -> Self {
        let registry = shared_registry();
        let gates = Gates::new(network, entitlement);
        let loads = LoadCoordinator::new(registry.clone(), gates.clone(), client.clone());
        let shows = PresentationCoordinator::new(
            registry.clone(),
            gates.clone(),
            client.clone(),
            overlay,
            config.grace_delay(),
        );
        let surfaces = Arc::new(SurfaceLifecycleBinder::new(gates.clone(), client.clone()));
        let natives = NativeAdCoordinator::new(gates.clone(), client);

        let mut mediator = Self {
            config,
            registry,
            gates,
            loads,
            shows,
            surfaces,
            natives,
            app_open: None,
        };
        mediator.app_open = mediator.build_app_open(SwitchGate::new_shared(true));
        mediator
    }

    /// Gate app-open reloads on `consent`.
    pub fn with_consent(mut self, consent: Arc<dyn ConsentGate>) -> Self {
        self.app_open = self.build_app_open(consent);
        self
    }

    fn build_app_open(&self, consent: Arc<dyn ConsentGate>) -> Option<AppOpenCoordinator> {
        let placement = self.config.placements.get(APP_OPEN_KEY)?;
        Some(AppOpenCoordinator::new(
            placement.clone(),
            self.config.app_open_expiry(),
            self.loads.clone(),
            self.shows.clone(),
            consent,
        ))
    }

    pub fn config(&self) -> &MediationConfig {
        &self.config
    }

    /// Load the full-screen ad for `key`.
    pub async fn request_load(
        &self,
        key: impl Into<PlacementKey>,
        config: &PlacementConfig,
    ) -> LoadEvent {
        self.loads.request_load(key.into(), config).await
    }

    /// Load the named placement from the mediation config.
    pub async fn request_load_named(&self, name: &str) -> Result<LoadEvent> {
        let placement = self.config.placement(name)?;
        Ok(self.loads.request_load(PlacementKey::from(name), placement).await)
    }

    /// Show the ad cached for `key` over `screen`. Requires a tokio runtime.
    pub fn show(
        &self,
        key: impl Into<PlacementKey>,
        config: &PlacementConfig,
        screen: &HostScreen,
    ) -> ShowStream {
        self.shows.show(key.into(), config, screen)
    }

    pub fn show_named(&self, name: &str, screen: &HostScreen) -> Result<ShowStream> {
        let placement = self.config.placement(name)?;
        Ok(self.shows.show(PlacementKey::from(name), placement, screen))
    }

    /// Load a banner into `container`.
    pub async fn bind_surface(
        &self,
        container: Arc<dyn DisplayContainer>,
        config: &PlacementConfig,
    ) -> LoadEvent {
        self.surfaces.bind_surface(container, config).await
    }

    pub async fn bind_surface_named(
        &self,
        name: &str,
        container: Arc<dyn DisplayContainer>,
    ) -> Result<LoadEvent> {
        let placement = self.config.placement(name)?;
        Ok(self.surfaces.bind_surface(container, placement).await)
    }

    /// Forward `screen` transitions to the banner surfaces.
    pub fn bind_lifecycle(&self, screen: &HostScreen) -> JoinHandle<()> {
        self.surfaces.bind_lifecycle(screen)
    }

    pub fn on_screen_resumed(&self) {
        self.surfaces.on_screen_resumed();
    }

    pub fn on_screen_paused(&self) {
        self.surfaces.on_screen_paused();
    }

    pub fn on_screen_destroyed(&self) {
        self.surfaces.on_screen_destroyed();
    }

    pub fn surfaces(&self) -> &Arc<SurfaceLifecycleBinder> {
        &self.surfaces
    }

    pub async fn load_native(&self, config: &PlacementConfig, screen: &HostScreen) -> LoadEvent {
        self.natives.load_native(config, screen).await
    }

    pub async fn load_native_named(&self, name: &str, screen: &HostScreen) -> Result<LoadEvent> {
        let placement = self.config.placement(name)?;
        Ok(self.natives.load_native(placement, screen).await)
    }

    pub fn native(&self) -> Option<Arc<dyn NativeAd>> {
        self.natives.native()
    }

    pub fn record_native_impression(&self) -> Option<Arc<dyn NativeAd>> {
        self.natives.record_impression()
    }

    pub fn destroy_native(&self) {
        self.natives.destroy_native();
    }

    /// The app-open coordinator, when an `app_open` placement is configured.
    pub fn app_open(&self) -> Option<&AppOpenCoordinator> {
        self.app_open.as_ref()
    }

    /// Drop the cached ad for `key` unless it is on screen.
    pub fn release(&self, key: impl Into<PlacementKey>) -> bool {
        self.loads.release(&key.into())
    }

    pub fn is_ready(&self, key: impl Into<PlacementKey>) -> bool {
        self.loads.is_ready(&key.into())
    }

    /// Keys with an unexpired ad cached.
    pub fn ready_placements(&self) -> Vec<PlacementKey> {
        let registry = lock_registry(&self.registry);
        let now = Instant::now();
        let mut keys: Vec<PlacementKey> = registry
            .keys()
            .filter(|key| registry.get(key).map(|slot| slot.is_ready(now)).unwrap_or(false))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Number of slots in the registry, loading or loaded.
    pub fn slot_count(&self) -> usize {
        lock_registry(&self.registry).len()
    }

    pub fn is_network_reachable(&self) -> bool {
        self.gates.is_network_reachable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlacementKind;
    use crate::errors::AdError;
    use crate::screen::ScreenLifecycle;
    use crate::test_utils::{MockAdNetwork, MockOverlay};

    fn mediator(config: MediationConfig) -> (AdMediator, Arc<MockAdNetwork>) {
        let network = Arc::new(MockAdNetwork::new());
        let mediator = AdMediator::new(
            config,
            network.clone(),
            Arc::new(MockOverlay::new()),
            SwitchGate::new_shared(true),
            SwitchGate::new_shared(false),
        );
        (mediator, network)
    }

    #[tokio::test]
    async fn named_placements_resolve_from_config() {
        let config = MediationConfig::default()
            .with_placement("level_end", PlacementConfig::new("unit-level-end"));
        let (mediator, network) = mediator(config);

        let event = mediator.request_load_named("level_end").await.unwrap();
        assert_eq!(event, LoadEvent::Loaded);
        assert!(mediator.is_ready("level_end"));
        assert_eq!(mediator.ready_placements(), vec![PlacementKey::from("level_end")]);
        assert_eq!(network.recorded_requests()[0].unit_id, "unit-level-end");

        let err = mediator.request_load_named("missing").await.unwrap_err();
        assert!(matches!(err, AdError::Config(_)));
    }

    #[tokio::test]
    async fn app_open_exists_only_when_configured() {
        let (without, _) = mediator(MediationConfig::default());
        assert!(without.app_open().is_none());

        let config = MediationConfig::default().with_placement(
            APP_OPEN_KEY,
            PlacementConfig::new("unit-app-open"),
        );
        let (with, _) = mediator(config);
        let app_open = with.app_open().unwrap();
        assert_eq!(app_open.config().kind, PlacementKind::AppOpen);
        assert_eq!(app_open.config().expiry(), Some(with.config().app_open_expiry()));
    }

    #[tokio::test]
    async fn release_refuses_presenting_slot() {
        let config = MediationConfig::default().with_placement("p", PlacementConfig::new("u"));
        let (mediator, _) = mediator(config);
        let lifecycle = ScreenLifecycle::new("main");

        mediator.request_load_named("p").await.unwrap();
        let _stream = mediator.show_named("p", &lifecycle.screen()).unwrap();
        assert!(!mediator.release("p"));
        assert_eq!(mediator.slot_count(), 1);
    }
}
