//! Banner surfaces bound to the host screen's visibility.
//!
//! One plain and one collapsible surface may exist at a time. A surface is
//! created on the first bind for its kind and reused until the host screen is
//! torn down.

use crate::client::{AdNetworkClient, AdRequest, AdSurface, SurfaceRequest};
use crate::config::{PlacementConfig, PlacementKind};
use crate::gates::Gates;
use crate::load::LoadEvent;
use crate::screen::{AdaptiveBannerSize, DisplayContainer, HostScreen, ScreenState};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Which banner surface a placement binds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BannerKind {
    Plain,
    Collapsible,
}

impl BannerKind {
    pub fn of(config: &PlacementConfig) -> Self {
        if config.kind == PlacementKind::CollapsibleBanner {
            Self::Collapsible
        } else {
            Self::Plain
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Plain => "banner",
            Self::Collapsible => "collapsible banner",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SurfacePhase {
    Loading,
    Loaded,
}

#[derive(Clone)]
struct BannerSurface {
    surface: Arc<dyn AdSurface>,
    container: Arc<dyn DisplayContainer>,
    generation: u64,
    phase: SurfacePhase,
}

#[derive(Default)]
struct Surfaces {
    plain: Option<BannerSurface>,
    collapsible: Option<BannerSurface>,
    next_generation: u64,
}

impl Surfaces {
    fn slot(&mut self, kind: BannerKind) -> &mut Option<BannerSurface> {
        match kind {
            BannerKind::Plain => &mut self.plain,
            BannerKind::Collapsible => &mut self.collapsible,
        }
    }

    fn live(&self) -> Vec<Arc<dyn AdSurface>> {
        [&self.plain, &self.collapsible]
            .into_iter()
            .flatten()
            .map(|banner| Arc::clone(&banner.surface))
            .collect()
    }
}

/// Owns the banner surfaces and forwards host visibility to them.
pub struct SurfaceLifecycleBinder {
    gates: Gates,
    client: Arc<dyn AdNetworkClient>,
    surfaces: Arc<Mutex<Surfaces>>,
}

impl SurfaceLifecycleBinder {
    pub fn new(gates: Gates, client: Arc<dyn AdNetworkClient>) -> Self {
        Self {
            gates,
            client,
            surfaces: Arc::new(Mutex::new(Surfaces::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Surfaces> {
        self.surfaces.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Load the banner for `config` into `container`.
    ///
    /// Binding a kind that already has a live surface succeeds without a new
    /// request; a loaded surface is moved into `container`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, container, config), fields(unit_id = %config.unit_id)))]
    pub async fn bind_surface(
        &self,
        container: Arc<dyn DisplayContainer>,
        config: &PlacementConfig,
    ) -> LoadEvent {
        let kind = BannerKind::of(config);

        if let Err(reason) = self.gates.check(config.remote_enabled) {
            crate::log_debug(&format!("{} not available: {}", kind.label(), reason));
            container.set_visible(false);
            container.clear();
            return LoadEvent::NotAvailable(reason);
        }

        let (surface, generation) = {
            let mut surfaces = self.lock();
            if let Some(existing) = surfaces.slot(kind).as_mut() {
                existing.container = Arc::clone(&container);
                let loaded = existing.phase == SurfacePhase::Loaded;
                let surface = Arc::clone(&existing.surface);
                drop(surfaces);

                crate::log_debug(&format!("{} already loaded", kind.label()));
                if loaded {
                    container.attach(&surface);
                    container.set_visible(true);
                }
                return LoadEvent::Loaded;
            }

            let request = SurfaceRequest {
                ad: AdRequest::for_placement(config),
                size: AdaptiveBannerSize::from_metrics(container.metrics()),
            };
            let surface = self.client.create_surface(&request);
            surfaces.next_generation += 1;
            let generation = surfaces.next_generation;
            *surfaces.slot(kind) = Some(BannerSurface {
                surface: Arc::clone(&surface),
                container: Arc::clone(&container),
                generation,
                phase: SurfacePhase::Loading,
            });
            (surface, generation)
        };

        let (tx, rx) = oneshot::channel();
        let surfaces = Arc::clone(&self.surfaces);

        tokio::spawn(async move {
            let result = surface.load().await;
            let event = settle_load(&surfaces, kind, generation, result.map_err(|e| e.code));
            let _ = tx.send(event);
        });

        rx.await.unwrap_or(LoadEvent::Abandoned)
    }

    /// Forward `resume` to every live surface.
    pub fn on_screen_resumed(&self) {
        crate::log_debug("resuming banners");
        let live = self.lock().live();
        for surface in live {
            surface.resume();
        }
    }

    /// Forward `pause` to every live surface.
    pub fn on_screen_paused(&self) {
        crate::log_debug("pausing banners");
        let live = self.lock().live();
        for surface in live {
            surface.pause();
        }
    }

    /// Destroy and forget every surface. Safe to call repeatedly.
    pub fn on_screen_destroyed(&self) {
        self.destroy(BannerKind::Plain);
        self.destroy(BannerKind::Collapsible);
    }

    /// Destroy one surface, then null it.
    pub fn destroy(&self, kind: BannerKind) {
        let mut surfaces = self.lock();
        let slot = surfaces.slot(kind);
        if let Some(banner) = slot.as_ref() {
            crate::log_debug(&format!("destroying {}", kind.label()));
            banner.surface.destroy();
        }
        *slot = None;
    }

    pub fn surface(&self, kind: BannerKind) -> Option<Arc<dyn AdSurface>> {
        let mut surfaces = self.lock();
        surfaces
            .slot(kind)
            .as_ref()
            .map(|banner| Arc::clone(&banner.surface))
    }

    pub fn is_loaded(&self, kind: BannerKind) -> bool {
        let mut surfaces = self.lock();
        surfaces
            .slot(kind)
            .as_ref()
            .map(|banner| banner.phase == SurfacePhase::Loaded)
            .unwrap_or(false)
    }

    /// Follow `screen` and forward its transitions until it is destroyed.
    pub fn bind_lifecycle(self: &Arc<Self>, screen: &HostScreen) -> JoinHandle<()> {
        let binder = Arc::clone(self);
        let mut state = screen.subscribe();

        tokio::spawn(async move {
            if *state.borrow_and_update() == ScreenState::Destroyed {
                binder.on_screen_destroyed();
                return;
            }
            loop {
                if state.changed().await.is_err() {
                    binder.on_screen_destroyed();
                    return;
                }
                let current = *state.borrow_and_update();
                match current {
                    ScreenState::Resumed => binder.on_screen_resumed(),
                    ScreenState::Paused => binder.on_screen_paused(),
                    ScreenState::Destroyed => {
                        binder.on_screen_destroyed();
                        return;
                    }
                }
            }
        })
    }
}

/// Apply a finished surface load. Loads for a surface that was torn down in
/// the meantime are dropped.
fn settle_load(
    surfaces: &Mutex<Surfaces>,
    kind: BannerKind,
    generation: u64,
    result: Result<(), i32>,
) -> LoadEvent {
    let mut guard = surfaces.lock().unwrap_or_else(|e| e.into_inner());
    let slot = guard.slot(kind);
    let current = match slot.as_mut() {
        Some(banner) if banner.generation == generation => banner,
        _ => return LoadEvent::Abandoned,
    };

    match result {
        Ok(()) => {
            current.phase = SurfacePhase::Loaded;
            let surface = Arc::clone(&current.surface);
            let container = Arc::clone(&current.container);
            drop(guard);

            crate::log_debug(&format!("{} loaded", kind.label()));
            container.attach(&surface);
            container.set_visible(true);
            LoadEvent::Loaded
        }
        Err(code) => {
            if let Some(failed) = slot.take() {
                failed.surface.destroy();
                drop(guard);

                crate::log_warn(&format!("{} failed to load (code {})", kind.label(), code));
                failed.container.set_visible(false);
                failed.container.clear();
            }
            LoadEvent::FailedToLoad { code }
        }
    }
}
