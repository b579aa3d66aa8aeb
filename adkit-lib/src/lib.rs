//! Adkit library.
//!
//! Coordinates the lifecycle of ad placements in a mobile host: loading and
//! caching one ad per placement, presenting full-screen ads over a host
//! screen, and binding banner surfaces to the host's visibility.
//!
//! The crate owns no ad SDK. A concrete network plugs in through
//! [`AdNetworkClient`], and availability is decided by caller-supplied
//! [`NetworkGate`] and [`EntitlementGate`] implementations.
//!
//! # Example
//!
//! ```ignore
//! use adkit_lib::prelude::*;
//!
//! let config = MediationConfig::default()
//!     .with_placement("level_end", PlacementConfig::new("ca-app-pub-x/1"));
//! let mediator = AdMediator::new(config, client, overlay, network, entitlement);
//!
//! mediator.request_load_named("level_end").await.into_result()?;
//! let result = mediator.show_named("level_end", &screen)?.terminal().await;
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

pub mod app_open;
pub mod client;
pub mod config;
pub mod errors;
pub mod gates;
pub mod load;
pub mod mediator;
pub mod native;
pub mod prelude;
pub mod presentation;
pub mod screen;
pub mod slot;
pub mod surface;

/// Mock collaborators for testing hosts and coordinators.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app_open::AppOpenCoordinator;
pub use client::{
    AdNetworkClient, AdRequest, AdSurface, FullScreenEvent, FullScreenEvents, LoadError, NativeAd,
    SurfaceRequest,
};
pub use config::{
    CollapsiblePosition, MediationConfig, NativeLayout, PlacementConfig, PlacementKind,
};
pub use errors::{AdError, AdErrorCode, ShowError, Unavailable};
pub use gates::{
    ConnectivityState, ConsentGate, EntitlementGate, Gates, NetworkGate, NetworkTransport,
};
pub use load::{LoadCoordinator, LoadEvent};
pub use mediator::AdMediator;
pub use native::NativeAdCoordinator;
pub use presentation::{PresentationCoordinator, PresentationOptions, ShowEvent, ShowStream};
pub use screen::{
    AdaptiveBannerSize, ContainerMetrics, DisplayContainer, HostScreen, LoadingOverlay,
    OverlayHandle, ScreenLifecycle, ScreenState,
};
pub use slot::{AdHandle, AdSlot, AdSlotRegistry, HandleId, PlacementKey};
pub use surface::{BannerKind, SurfaceLifecycleBinder};

/// Result type for fallible adkit operations.
pub type Result<T> = std::result::Result<T, AdError>;

/// Registry shared by the load and presentation coordinators.
pub type SharedRegistry = Arc<Mutex<AdSlotRegistry>>;

/// Create an empty shared registry.
pub fn shared_registry() -> SharedRegistry {
    Arc::new(Mutex::new(AdSlotRegistry::new()))
}

/// Lock the registry, recovering from a poisoned lock.
///
/// Every mutation completes before the guard is released, so a panic in
/// another holder cannot leave a slot half-written.
pub(crate) fn lock_registry(registry: &SharedRegistry) -> MutexGuard<'_, AdSlotRegistry> {
    registry.lock().unwrap_or_else(|e| e.into_inner())
}

// Helpers to avoid requiring the tracing feature
pub(crate) fn log_debug(_msg: &str) {
    #[cfg(feature = "tracing")]
    tracing::debug!("{}", _msg);
}

pub(crate) fn log_warn(_msg: &str) {
    #[cfg(feature = "tracing")]
    tracing::warn!("{}", _msg);
}
