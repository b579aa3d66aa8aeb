//! App-open placement: shown straight away when the app comes to the
//! foreground, reloaded after every attempt.

use crate::config::{PlacementConfig, PlacementKind};
use crate::errors::Unavailable;
use crate::gates::ConsentGate;
use crate::load::{LoadCoordinator, LoadEvent};
use crate::presentation::{PresentationCoordinator, PresentationOptions, ShowEvent};
use crate::screen::HostScreen;
use crate::slot::PlacementKey;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Registry key of the app-open slot.
pub const APP_OPEN_KEY: &str = "app_open";

/// Clears the showing flag when the show attempt ends, however it ends.
struct ShowingGuard(Arc<AtomicBool>);

impl Drop for ShowingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives the single app-open placement on top of the shared coordinators.
#[derive(Clone)]
pub struct AppOpenCoordinator {
    key: PlacementKey,
    config: PlacementConfig,
    loads: LoadCoordinator,
    shows: PresentationCoordinator,
    consent: Arc<dyn ConsentGate>,
    showing: Arc<AtomicBool>,
}

impl AppOpenCoordinator {
    /// `config` is forced to the app-open kind; `expiry` applies unless the
    /// placement sets its own.
    pub fn new(
        config: PlacementConfig,
        expiry: Duration,
        loads: LoadCoordinator,
        shows: PresentationCoordinator,
        consent: Arc<dyn ConsentGate>,
    ) -> Self {
        let mut config = config.with_kind(PlacementKind::AppOpen);
        if config.expiry().is_none() {
            config = config.with_expiry(expiry);
        }
        Self {
            key: PlacementKey::from(APP_OPEN_KEY),
            config,
            loads,
            shows,
            consent,
            showing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn key(&self) -> &PlacementKey {
        &self.key
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Load the app-open ad unless one is cached, loading or on screen.
    pub async fn load(&self) -> LoadEvent {
        self.loads.request_load(self.key.clone(), &self.config).await
    }

    /// Whether an unexpired ad is cached.
    pub fn is_ad_available(&self) -> bool {
        self.loads.is_ready(&self.key)
    }

    pub fn is_showing(&self) -> bool {
        self.showing.load(Ordering::SeqCst)
    }

    /// Show the cached ad, if any, and resolve with the single terminal event
    /// of the attempt.
    ///
    /// When the attempt ends, a fresh load is started in the background if
    /// consent allows requesting ads.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, screen), fields(screen = screen.name())))]
    pub async fn show_if_available(&self, screen: &HostScreen) -> ShowEvent {
        if self.showing.swap(true, Ordering::SeqCst) {
            crate::log_debug("app open ad is already showing");
            return ShowEvent::NotAvailable(Unavailable::AlreadyShowing);
        }
        let guard = ShowingGuard(Arc::clone(&self.showing));

        let terminal = self
            .shows
            .show_with(
                self.key.clone(),
                &self.config,
                screen,
                PresentationOptions::immediate(),
            )
            .terminal()
            .await;
        drop(guard);

        self.reload_if_consented();
        terminal
    }

    fn reload_if_consented(&self) {
        if !self.consent.can_request_ads() {
            crate::log_debug("skipping app open reload without consent");
            return;
        }
        let loads = self.loads.clone();
        let key = self.key.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            let event = loads.request_load(key, &config).await;
            crate::log_debug(&format!("app open reload: {:?}", event));
        });
    }
}
