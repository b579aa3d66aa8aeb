//! Native placement: a single cached native ad rendered by the host.

use crate::client::{AdNetworkClient, AdRequest, NativeAd};
use crate::config::PlacementConfig;
use crate::gates::Gates;
use crate::load::LoadEvent;
use crate::screen::HostScreen;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

#[derive(Default)]
struct NativeState {
    ad: Option<Arc<dyn NativeAd>>,
    loading: bool,
    generation: u64,
}

/// Loads and caches at most one native ad.
///
/// A native ad is shown once: recording its impression clears the cache so
/// the next load fetches a fresh one.
#[derive(Clone)]
pub struct NativeAdCoordinator {
    gates: Gates,
    client: Arc<dyn AdNetworkClient>,
    state: Arc<Mutex<NativeState>>,
}

impl NativeAdCoordinator {
    pub fn new(gates: Gates, client: Arc<dyn AdNetworkClient>) -> Self {
        Self {
            gates,
            client,
            state: Arc::new(Mutex::new(NativeState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NativeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Load a native ad for display on `screen`.
    ///
    /// An ad that arrives after `screen` was destroyed is destroyed on the spot
    /// and the load resolves to `Abandoned`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, config, screen), fields(unit_id = %config.unit_id)))]
    pub async fn load_native(&self, config: &PlacementConfig, screen: &HostScreen) -> LoadEvent {
        if let Err(reason) = self.gates.check(config.remote_enabled) {
            return LoadEvent::NotAvailable(reason);
        }

        let generation = {
            let mut state = self.lock();
            if state.ad.is_some() || state.loading {
                crate::log_debug("native ad already loaded");
                return LoadEvent::Loaded;
            }
            state.loading = true;
            state.generation += 1;
            state.generation
        };

        let (tx, rx) = oneshot::channel();
        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        let request = AdRequest::for_placement(config);
        let layout = config.native_layout.unwrap_or_default();
        let screen = screen.clone();

        tokio::spawn(async move {
            let result = client.request_native(request, layout).await;

            let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
            let current = guard.generation == generation;
            if current {
                guard.loading = false;
            }

            let event = match result {
                Ok(ad) if !current || screen.is_destroyed() => {
                    drop(guard);
                    crate::log_debug("native ad arrived after its screen was torn down");
                    ad.destroy();
                    LoadEvent::Abandoned
                }
                Ok(ad) => {
                    guard.ad = Some(ad);
                    LoadEvent::Loaded
                }
                Err(_) if !current => LoadEvent::Abandoned,
                Err(err) => {
                    crate::log_warn(&format!("native ad failed to load: {}", err));
                    LoadEvent::FailedToLoad { code: err.code }
                }
            };
            let _ = tx.send(event);
        });

        rx.await.unwrap_or(LoadEvent::Abandoned)
    }

    /// The cached ad, if any.
    pub fn native(&self) -> Option<Arc<dyn NativeAd>> {
        self.lock().ad.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Forget the cached ad once it has been seen. The host keeps rendering it.
    pub fn record_impression(&self) -> Option<Arc<dyn NativeAd>> {
        self.lock().ad.take()
    }

    /// Destroy the cached ad and discard any load in flight.
    pub fn destroy_native(&self) {
        let ad = {
            let mut state = self.lock();
            state.loading = false;
            state.generation += 1;
            state.ad.take()
        };
        if let Some(ad) = ad {
            ad.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NativeLayout;
    use crate::errors::Unavailable;
    use crate::gates::SwitchGate;
    use crate::screen::ScreenLifecycle;
    use crate::test_utils::MockAdNetwork;
    use std::time::Duration;

    fn coordinator(network: Arc<MockAdNetwork>, entitled: bool) -> NativeAdCoordinator {
        NativeAdCoordinator::new(
            Gates::new(SwitchGate::new_shared(true), SwitchGate::new_shared(entitled)),
            network,
        )
    }

    fn placement() -> PlacementConfig {
        PlacementConfig::new("native-unit").with_native_layout(NativeLayout::Large)
    }

    #[tokio::test]
    async fn load_is_idempotent_while_cached() {
        let network = Arc::new(MockAdNetwork::new());
        let natives = coordinator(network.clone(), false);
        let screen = ScreenLifecycle::new("feed");

        assert_eq!(natives.load_native(&placement(), &screen.screen()).await, LoadEvent::Loaded);
        assert_eq!(natives.load_native(&placement(), &screen.screen()).await, LoadEvent::Loaded);
        assert_eq!(network.native_requests(), 1);
        assert_eq!(network.natives()[0].layout, NativeLayout::Large);
        assert!(natives.native().is_some());
    }

    #[tokio::test]
    async fn impression_clears_cache() {
        let network = Arc::new(MockAdNetwork::new());
        let natives = coordinator(network.clone(), false);
        let screen = ScreenLifecycle::new("feed");

        natives.load_native(&placement(), &screen.screen()).await;
        assert!(natives.record_impression().is_some());
        assert!(natives.native().is_none());
        assert!(!network.natives()[0].is_destroyed());

        natives.load_native(&placement(), &screen.screen()).await;
        assert_eq!(network.native_requests(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn late_arrival_on_destroyed_screen_is_destroyed() {
        let network = Arc::new(MockAdNetwork::new().with_load_delay(Duration::from_millis(100)));
        let natives = coordinator(network.clone(), false);
        let lifecycle = ScreenLifecycle::new("feed");

        let pending = {
            let natives = natives.clone();
            let screen = lifecycle.screen();
            tokio::spawn(async move { natives.load_native(&placement(), &screen).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        lifecycle.destroy();

        assert_eq!(pending.await.unwrap(), LoadEvent::Abandoned);
        assert!(natives.native().is_none());
        assert!(!natives.is_loading());
        assert!(network.natives()[0].is_destroyed());
    }

    #[tokio::test]
    async fn destroy_native_is_idempotent() {
        let network = Arc::new(MockAdNetwork::new());
        let natives = coordinator(network.clone(), false);
        let screen = ScreenLifecycle::new("feed");

        natives.load_native(&placement(), &screen.screen()).await;
        natives.destroy_native();
        natives.destroy_native();
        assert!(natives.native().is_none());
        assert_eq!(network.natives()[0].destroy_count(), 1);
    }

    #[tokio::test]
    async fn failure_and_gating() {
        let network = Arc::new(MockAdNetwork::new().fail_next_native(2));
        let natives = coordinator(network.clone(), false);
        let screen = ScreenLifecycle::new("feed");

        assert_eq!(
            natives.load_native(&placement(), &screen.screen()).await,
            LoadEvent::FailedToLoad { code: 2 }
        );
        assert!(!natives.is_loading());

        let entitled = coordinator(network.clone(), true);
        assert_eq!(
            entitled.load_native(&placement(), &screen.screen()).await,
            LoadEvent::NotAvailable(Unavailable::NotEntitled)
        );
        assert_eq!(network.native_requests(), 1);
    }
}
