//! Mock host UI.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::client::AdSurface;
use crate::screen::{ContainerMetrics, DisplayContainer, HostScreen, LoadingOverlay, OverlayHandle};

/// Loading overlay that counts opens and dismissals.
#[derive(Default)]
pub struct MockOverlay {
    opened: AtomicUsize,
    dismissed: Arc<AtomicUsize>,
}

impl MockOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn dismissed(&self) -> usize {
        self.dismissed.load(Ordering::SeqCst)
    }

    /// Overlays opened and not yet dismissed.
    pub fn open_count(&self) -> usize {
        self.opened() - self.dismissed()
    }
}

struct MockOverlayHandle {
    dismissed: Arc<AtomicUsize>,
}

impl OverlayHandle for MockOverlayHandle {
    fn dismiss(self: Box<Self>) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
    }
}

impl LoadingOverlay for MockOverlay {
    fn open(&self, _screen: &HostScreen) -> Box<dyn OverlayHandle> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Box::new(MockOverlayHandle {
            dismissed: Arc::clone(&self.dismissed),
        })
    }
}

/// Display container that records what it was asked to show.
///
/// Starts visible with no child.
pub struct MockContainer {
    metrics: ContainerMetrics,
    child: Mutex<Option<Arc<dyn AdSurface>>>,
    visible: AtomicBool,
    attaches: AtomicUsize,
    clears: AtomicUsize,
}

impl MockContainer {
    /// A laid-out container `width_px` wide at `density`.
    pub fn new(width_px: u32, density: f32) -> Self {
        Self::with_metrics(ContainerMetrics {
            width_px,
            screen_width_px: width_px,
            density,
        })
    }

    pub fn with_metrics(metrics: ContainerMetrics) -> Self {
        Self {
            metrics,
            child: Mutex::new(None),
            visible: AtomicBool::new(true),
            attaches: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn has_child(&self) -> bool {
        self.child.lock().unwrap().is_some()
    }

    pub fn attach_count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl DisplayContainer for MockContainer {
    fn metrics(&self) -> ContainerMetrics {
        self.metrics
    }

    fn attach(&self, surface: &Arc<dyn AdSurface>) {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        *self.child.lock().unwrap() = Some(Arc::clone(surface));
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.child.lock().unwrap() = None;
    }

    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }
}
