//! Full-screen presentation: overlay, grace delay, show, and exactly-once
//! release of the presented slot.

use crate::client::{AdNetworkClient, FullScreenEvent};
use crate::config::PlacementConfig;
use crate::errors::{AdError, ShowError, Unavailable};
use crate::gates::Gates;
use crate::screen::{HostScreen, LoadingOverlay, OverlayHandle};
use crate::slot::{AdHandle, HandleId, PlacementKey};
use crate::{lock_registry, SharedRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Events delivered for one `show` call.
///
/// Exactly one terminal event (`NotAvailable`, `Dismissed`, `FailedToShow`
/// or `Cancelled`) ends every stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShowEvent {
    /// Nothing was shown; see the reason.
    NotAvailable(Unavailable),
    Clicked,
    Impression,
    /// The ad now owns the screen.
    Shown,
    /// The user closed the ad. The slot has been released.
    Dismissed,
    /// The network could not present the ad. The slot has been released.
    FailedToShow(ShowError),
    /// The host screen went away before the ad was shown. The ad stays cached.
    Cancelled,
}

impl ShowEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Clicked | Self::Impression | Self::Shown)
    }

    /// Fold a terminal event into a `Result`. Intermediate events are `Ok`.
    pub fn into_result(self) -> Result<(), AdError> {
        match self {
            Self::NotAvailable(reason) => Err(reason.into()),
            Self::FailedToShow(err) => Err(AdError::ShowFailed(err)),
            Self::Cancelled => Err(AdError::HostDestroyed),
            Self::Clicked | Self::Impression | Self::Shown | Self::Dismissed => Ok(()),
        }
    }
}

/// Receiver for the events of one `show` call.
#[derive(Debug)]
pub struct ShowStream {
    rx: mpsc::UnboundedReceiver<ShowEvent>,
}

impl ShowStream {
    fn new() -> (mpsc::UnboundedSender<ShowEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    fn immediate(event: ShowEvent) -> Self {
        let (tx, stream) = Self::new();
        let _ = tx.send(event);
        stream
    }

    /// Next event, or `None` once the terminal event has been taken.
    pub async fn next(&mut self) -> Option<ShowEvent> {
        self.rx.recv().await
    }

    /// Skip intermediate events and return the terminal one.
    pub async fn terminal(mut self) -> ShowEvent {
        let mut last = None;
        while let Some(event) = self.rx.recv().await {
            if event.is_terminal() {
                return event;
            }
            last = Some(event);
        }
        // Sessions always emit a terminal event before closing.
        crate::log_warn(&format!("show stream closed after {:?}", last));
        ShowEvent::FailedToShow(ShowError::interrupted())
    }

    /// Every event up to and including the terminal one.
    pub async fn collect(mut self) -> Vec<ShowEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }
}

/// How a placement is presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentationOptions {
    pub grace_delay: Duration,
    pub overlay: bool,
}

impl PresentationOptions {
    /// Overlay first, then show after `grace_delay`.
    pub fn with_overlay(grace_delay: Duration) -> Self {
        Self {
            grace_delay,
            overlay: true,
        }
    }

    /// Show straight away with no overlay.
    pub fn immediate() -> Self {
        Self {
            grace_delay: Duration::ZERO,
            overlay: false,
        }
    }
}

/// Shows ready placements and settles their slots.
#[derive(Clone)]
pub struct PresentationCoordinator {
    registry: SharedRegistry,
    gates: Gates,
    client: Arc<dyn AdNetworkClient>,
    overlay: Arc<dyn LoadingOverlay>,
    grace_delay: Duration,
}

impl PresentationCoordinator {
    pub fn new(
        registry: SharedRegistry,
        gates: Gates,
        client: Arc<dyn AdNetworkClient>,
        overlay: Arc<dyn LoadingOverlay>,
        grace_delay: Duration,
    ) -> Self {
        Self {
            registry,
            gates,
            client,
            overlay,
            grace_delay,
        }
    }

    pub fn grace_delay(&self) -> Duration {
        self.grace_delay
    }

    /// Show the ad cached for `key` over `screen`, behind the loading overlay.
    ///
    /// The presentation runs on a spawned task. Requires a tokio runtime.
    pub fn show(&self, key: PlacementKey, config: &PlacementConfig, screen: &HostScreen) -> ShowStream {
        self.show_with(
            key,
            config,
            screen,
            PresentationOptions::with_overlay(self.grace_delay),
        )
    }

    /// Show with explicit overlay and delay settings. Requires a tokio
    /// runtime.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, config, screen), fields(screen = screen.name())))]
    pub fn show_with(
        &self,
        key: PlacementKey,
        config: &PlacementConfig,
        screen: &HostScreen,
        options: PresentationOptions,
    ) -> ShowStream {
        if let Err(reason) = self.gates.check(config.remote_enabled) {
            return ShowStream::immediate(ShowEvent::NotAvailable(reason));
        }
        if screen.is_destroyed() {
            return ShowStream::immediate(ShowEvent::Cancelled);
        }

        let handle = match self.claim(&key) {
            Ok(handle) => handle,
            Err(reason) => {
                crate::log_debug(&format!("placement {} not shown: {}", key, reason));
                return ShowStream::immediate(ShowEvent::NotAvailable(reason));
            }
        };

        let overlay = if options.overlay {
            Some(self.overlay.open(screen))
        } else {
            None
        };

        let (events, stream) = ShowStream::new();
        let session = PresentationSession {
            key,
            handle_id: handle.id(),
            overlay,
            shown: false,
            settled: false,
            registry: Arc::clone(&self.registry),
            events,
        };

        let client = Arc::clone(&self.client);
        let screen = screen.clone();
        tokio::spawn(session.run(client, handle, screen, options.grace_delay));

        stream
    }

    /// Mark the slot as presenting and hand out its ad.
    fn claim(&self, key: &PlacementKey) -> Result<AdHandle, Unavailable> {
        let mut registry = lock_registry(&self.registry);
        let slot = registry.get_mut(key).ok_or(Unavailable::NoAdReady)?;

        if slot.is_presenting() {
            return Err(Unavailable::AlreadyShowing);
        }
        if slot.is_loading() {
            return Err(Unavailable::NoAdReady);
        }
        if slot.is_expired(Instant::now()) {
            registry.remove(key);
            return Err(Unavailable::NoAdReady);
        }

        let handle = slot.handle().cloned().ok_or(Unavailable::NoAdReady)?;
        slot.set_presenting(true);
        Ok(handle)
    }
}

/// State of one show cycle. Lives on the task that drives the presentation
/// and never outlives it.
struct PresentationSession {
    key: PlacementKey,
    handle_id: HandleId,
    overlay: Option<Box<dyn OverlayHandle>>,
    // Set once the network has been handed the ad; from then on it is spent.
    shown: bool,
    settled: bool,
    registry: SharedRegistry,
    events: mpsc::UnboundedSender<ShowEvent>,
}

impl PresentationSession {
    async fn run(
        mut self,
        client: Arc<dyn AdNetworkClient>,
        handle: AdHandle,
        screen: HostScreen,
        grace_delay: Duration,
    ) {
        if !grace_delay.is_zero() {
            tokio::select! {
                biased;
                _ = screen.destroyed() => {
                    self.cancel();
                    return;
                }
                _ = tokio::time::sleep(grace_delay) => {}
            }
        }
        if screen.is_destroyed() {
            self.cancel();
            return;
        }

        self.shown = true;
        let mut downstream = client.show_ad(&handle, &screen);
        drop(handle);

        loop {
            match downstream.recv().await {
                Some(FullScreenEvent::Clicked) => self.emit(ShowEvent::Clicked),
                Some(FullScreenEvent::Impression) => self.emit(ShowEvent::Impression),
                Some(FullScreenEvent::Shown) => {
                    self.dismiss_overlay();
                    self.emit(ShowEvent::Shown);
                }
                Some(FullScreenEvent::Dismissed) => {
                    self.settle(ShowEvent::Dismissed);
                    return;
                }
                Some(FullScreenEvent::FailedToShow(err)) => {
                    crate::log_warn(&format!("placement {} failed to show: {}", self.key, err));
                    self.settle(ShowEvent::FailedToShow(err));
                    return;
                }
                None => {
                    self.settle(ShowEvent::FailedToShow(ShowError::interrupted()));
                    return;
                }
            }
        }
    }

    fn emit(&self, event: ShowEvent) {
        let _ = self.events.send(event);
    }

    fn dismiss_overlay(&mut self) {
        if let Some(overlay) = self.overlay.take() {
            overlay.dismiss();
        }
    }

    /// Release the slot and end the session. Runs at most once.
    fn settle(&mut self, terminal: ShowEvent) {
        if self.settled {
            return;
        }
        self.settled = true;

        {
            let mut registry = lock_registry(&self.registry);
            let ours = registry
                .get(&self.key)
                .and_then(|slot| slot.handle())
                .map(|handle| handle.id() == self.handle_id)
                .unwrap_or(false);
            if ours {
                registry.remove(&self.key);
            }
        }

        self.dismiss_overlay();
        self.emit(terminal);
    }

    /// End the session without showing. The ad stays cached for a later show.
    fn cancel(&mut self) {
        if self.settled {
            return;
        }
        self.settled = true;

        {
            let mut registry = lock_registry(&self.registry);
            if let Some(slot) = registry.get_mut(&self.key) {
                if slot.handle().map(|h| h.id()) == Some(self.handle_id) {
                    slot.set_presenting(false);
                }
            }
        }

        crate::log_debug(&format!("placement {} show cancelled", self.key));
        self.dismiss_overlay();
        self.emit(ShowEvent::Cancelled);
    }
}

impl Drop for PresentationSession {
    // Runtime shutdown can drop the task mid-flight. An ad the network already
    // received cannot be shown again.
    fn drop(&mut self) {
        if self.shown {
            self.settle(ShowEvent::FailedToShow(ShowError::interrupted()));
        } else {
            self.cancel();
        }
    }
}
