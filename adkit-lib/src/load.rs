//! Load coordination: one outstanding network request per placement.

use crate::client::{AdNetworkClient, AdRequest};
use crate::config::PlacementConfig;
use crate::errors::{AdError, Unavailable};
use crate::gates::Gates;
use crate::slot::{AdSlot, PlacementKey};
use crate::{lock_registry, SharedRegistry};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Terminal outcome of a load request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadEvent {
    /// An ad is cached or already on its way.
    Loaded,
    /// The ad network failed the request.
    FailedToLoad { code: i32 },
    /// An availability check failed; no request was made.
    NotAvailable(Unavailable),
    /// The request completed after its slot was released or torn down; the
    /// result was discarded.
    Abandoned,
}

impl LoadEvent {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }

    /// Fold the event into a `Result` for callers that prefer `?`.
    pub fn into_result(self) -> Result<(), AdError> {
        match self {
            Self::Loaded => Ok(()),
            Self::FailedToLoad { code } => Err(AdError::LoadFailed { code }),
            Self::NotAvailable(reason) => Err(reason.into()),
            Self::Abandoned => Err(AdError::Internal("load abandoned".into())),
        }
    }
}

/// Turns load requests into at most one in-flight network call per key.
///
/// The network call runs on a spawned task, so dropping the future returned by
/// [`LoadCoordinator::request_load`] never leaves a slot stuck in the loading
/// state. Requires a tokio runtime.
#[derive(Clone)]
pub struct LoadCoordinator {
    registry: SharedRegistry,
    gates: Gates,
    client: Arc<dyn AdNetworkClient>,
}

impl LoadCoordinator {
    pub fn new(registry: SharedRegistry, gates: Gates, client: Arc<dyn AdNetworkClient>) -> Self {
        Self {
            registry,
            gates,
            client,
        }
    }

    /// Request an ad for `key`.
    ///
    /// A second request while one is in flight, or while an ad is cached,
    /// resolves to `Loaded` without touching the network.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, config), fields(unit_id = %config.unit_id)))]
    pub async fn request_load(&self, key: PlacementKey, config: &PlacementConfig) -> LoadEvent {
        if let Err(reason) = self.gates.check(config.remote_enabled) {
            return LoadEvent::NotAvailable(reason);
        }

        let ticket = {
            let mut registry = lock_registry(&self.registry);
            if let Some(slot) = registry.get_mut(&key) {
                if slot.is_loading() {
                    crate::log_debug(&format!("placement {} already loading", key));
                    return LoadEvent::Loaded;
                }
                if slot.handle().is_some() {
                    if slot.is_presenting() || !slot.is_expired(Instant::now()) {
                        crate::log_debug(&format!("placement {} already loaded", key));
                        return LoadEvent::Loaded;
                    }
                    crate::log_debug(&format!("placement {} expired, reloading", key));
                }
            }

            let ticket = registry.issue_ticket();
            let mut slot = AdSlot::new(key.clone(), config);
            slot.begin_load(ticket);
            registry.put(slot);
            ticket
        };

        let (tx, rx) = oneshot::channel();
        let registry = Arc::clone(&self.registry);
        let client = Arc::clone(&self.client);
        let request = AdRequest::for_placement(config);

        tokio::spawn(async move {
            let result = client.request_ad(request).await;

            let event = {
                let mut registry = lock_registry(&registry);
                match (registry.get_mut(&key), result) {
                    (Some(slot), Ok(handle)) => {
                        if slot.complete_load(ticket, handle) {
                            crate::log_debug(&format!("placement {} loaded", key));
                            LoadEvent::Loaded
                        } else {
                            LoadEvent::Abandoned
                        }
                    }
                    (Some(slot), Err(err)) => {
                        if slot.fail_load(ticket) {
                            crate::log_warn(&format!("placement {} failed to load: {}", key, err));
                            LoadEvent::FailedToLoad { code: err.code }
                        } else {
                            LoadEvent::Abandoned
                        }
                    }
                    (None, _) => LoadEvent::Abandoned,
                }
            };

            // The requester may have gone away; the slot is already settled.
            let _ = tx.send(event);
        });

        rx.await.unwrap_or(LoadEvent::Abandoned)
    }

    /// Drop whatever is cached for `key`, including an in-flight attempt.
    ///
    /// A load that completes afterwards resolves to `Abandoned` and its ad is
    /// discarded.
    pub fn release(&self, key: &PlacementKey) -> bool {
        let mut registry = lock_registry(&self.registry);
        match registry.get(key) {
            Some(slot) if slot.is_presenting() => false,
            Some(_) => {
                registry.remove(key);
                true
            }
            None => false,
        }
    }

    /// Whether an unexpired ad is cached for `key`.
    pub fn is_ready(&self, key: &PlacementKey) -> bool {
        let registry = lock_registry(&self.registry);
        registry
            .get(key)
            .map(|slot| slot.is_ready(Instant::now()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::SwitchGate;
    use crate::slot::AdSlotRegistry;
    use crate::test_utils::MockAdNetwork;
    use std::sync::Mutex;
    use std::time::Duration;

    fn coordinator(network: Arc<MockAdNetwork>, online: bool, entitled: bool) -> LoadCoordinator {
        LoadCoordinator::new(
            Arc::new(Mutex::new(AdSlotRegistry::new())),
            Gates::new(SwitchGate::new_shared(online), SwitchGate::new_shared(entitled)),
            network,
        )
    }

    #[tokio::test]
    async fn successful_load_populates_slot() {
        let network = Arc::new(MockAdNetwork::new());
        let loads = coordinator(network.clone(), true, false);
        let key = PlacementKey::Id(42);

        let event = loads.request_load(key.clone(), &PlacementConfig::new("ad-x")).await;
        assert_eq!(event, LoadEvent::Loaded);
        assert!(loads.is_ready(&key));
        assert_eq!(network.load_requests(), 1);

        let registry = lock_registry(&loads.registry);
        let slot = registry.get(&key).unwrap();
        assert!(!slot.is_loading());
        assert_eq!(slot.handle().map(|h| h.unit_id()), Some("ad-x"));
    }

    #[tokio::test]
    async fn cached_ad_is_not_requested_again() {
        let network = Arc::new(MockAdNetwork::new());
        let loads = coordinator(network.clone(), true, false);
        let config = PlacementConfig::new("ad-x");

        loads.request_load(PlacementKey::Id(1), &config).await;
        let again = loads.request_load(PlacementKey::Id(1), &config).await;
        assert_eq!(again, LoadEvent::Loaded);
        assert_eq!(network.load_requests(), 1);
    }

    #[tokio::test]
    async fn offline_fails_fast_without_slot() {
        let network = Arc::new(MockAdNetwork::new());
        let loads = coordinator(network.clone(), false, false);

        let event = loads
            .request_load(PlacementKey::Id(42), &PlacementConfig::new("ad-x"))
            .await;
        assert_eq!(event, LoadEvent::NotAvailable(Unavailable::NetworkUnavailable));
        assert_eq!(network.load_requests(), 0);
        assert!(lock_registry(&loads.registry).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn release_during_load_abandons_result() {
        let network = Arc::new(MockAdNetwork::new().with_load_delay(Duration::from_millis(200)));
        let loads = coordinator(network.clone(), true, false);
        let key = PlacementKey::Id(3);

        let pending = {
            let loads = loads.clone();
            let key = key.clone();
            tokio::spawn(async move { loads.request_load(key, &PlacementConfig::new("u")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(loads.release(&key));

        assert_eq!(pending.await.unwrap(), LoadEvent::Abandoned);
        assert!(!loads.is_ready(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_ad_is_reloaded() {
        let network = Arc::new(MockAdNetwork::new());
        let loads = coordinator(network.clone(), true, false);
        let config = PlacementConfig::new("u").with_expiry(Duration::from_secs(60));
        let key = PlacementKey::from("app_open");

        loads.request_load(key.clone(), &config).await;
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!loads.is_ready(&key));

        assert_eq!(loads.request_load(key.clone(), &config).await, LoadEvent::Loaded);
        assert_eq!(network.load_requests(), 2);
        assert!(loads.is_ready(&key));
    }
}
