//! Host screen collaborators: lifecycle, display containers and the loading
//! overlay.

use crate::client::AdSurface;
use std::sync::Arc;
use tokio::sync::watch;

/// Visibility state of a host screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScreenState {
    Resumed,
    Paused,
    Destroyed,
}

/// Host side of a screen's lifecycle.
///
/// Dropping the lifecycle counts as destruction for every [`HostScreen`]
/// observing it.
#[derive(Debug)]
pub struct ScreenLifecycle {
    name: Arc<str>,
    tx: watch::Sender<ScreenState>,
}

impl ScreenLifecycle {
    /// Create a lifecycle for a screen that is already in the foreground.
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(ScreenState::Resumed);
        Self {
            name: Arc::from(name.into()),
            tx,
        }
    }

    /// Observer handle for coordinators.
    pub fn screen(&self) -> HostScreen {
        HostScreen {
            name: Arc::clone(&self.name),
            state: self.tx.subscribe(),
        }
    }

    pub fn resume(&self) {
        self.transition(ScreenState::Resumed);
    }

    pub fn pause(&self) {
        self.transition(ScreenState::Paused);
    }

    pub fn destroy(&self) {
        self.transition(ScreenState::Destroyed);
    }

    pub fn state(&self) -> ScreenState {
        *self.tx.borrow()
    }

    // Destroyed is final.
    fn transition(&self, next: ScreenState) {
        self.tx.send_if_modified(|state| {
            if *state == ScreenState::Destroyed || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}

/// Observer of a host screen, handed to coordinators that must not outlive it.
#[derive(Clone, Debug)]
pub struct HostScreen {
    name: Arc<str>,
    state: watch::Receiver<ScreenState>,
}

impl HostScreen {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ScreenState {
        if self.state.has_changed().is_err() {
            return ScreenState::Destroyed;
        }
        *self.state.borrow()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state() == ScreenState::Destroyed
    }

    /// Resolves once the screen is destroyed or its lifecycle is dropped.
    pub async fn destroyed(&self) {
        let mut rx = self.state.clone();
        loop {
            if *rx.borrow_and_update() == ScreenState::Destroyed {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Raw state receiver, for forwarding every transition.
    pub fn subscribe(&self) -> watch::Receiver<ScreenState> {
        self.state.clone()
    }
}

/// Geometry of a display container, in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerMetrics {
    /// Laid-out width of the container; zero before layout.
    pub width_px: u32,
    /// Full screen width, used before the container is laid out.
    pub screen_width_px: u32,
    /// Pixels per density-independent pixel.
    pub density: f32,
}

/// Width of an anchored adaptive banner in density-independent pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AdaptiveBannerSize {
    pub width_dp: u32,
}

impl AdaptiveBannerSize {
    pub fn from_metrics(metrics: ContainerMetrics) -> Self {
        let width_px = if metrics.width_px == 0 {
            metrics.screen_width_px
        } else {
            metrics.width_px
        };
        let density = if metrics.density > 0.0 {
            metrics.density
        } else {
            1.0
        };
        Self {
            width_dp: (width_px as f32 / density) as u32,
        }
    }
}

/// A rectangular region of a host screen that hosts one ad surface.
pub trait DisplayContainer: Send + Sync {
    fn metrics(&self) -> ContainerMetrics;
    /// Detach `surface` from any previous parent and make it this
    /// container's only child.
    fn attach(&self, surface: &Arc<dyn AdSurface>);
    /// Remove all children.
    fn clear(&self);
    fn set_visible(&self, visible: bool);
}

/// Blocking overlay raised while a full-screen ad is being prepared.
pub trait LoadingOverlay: Send + Sync {
    fn open(&self, screen: &HostScreen) -> Box<dyn OverlayHandle>;
}

/// An open overlay. Consumed on dismissal so it can only be dismissed once.
pub trait OverlayHandle: Send {
    fn dismiss(self: Box<Self>);
}
