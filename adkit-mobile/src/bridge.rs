//! Fire-and-forget ad operations for host code.

use crate::async_bridge::{AsyncHandle, AsyncRuntime};
use crate::events::{AdEvent, AdEventKind, AdEventListener};
use crate::MobileError;
use adkit_lib::{AdMediator, DisplayContainer, HostScreen, MediationConfig};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Host-facing wrapper around an [`AdMediator`].
///
/// Every operation returns at once; its events arrive on the listener, ending
/// with exactly one terminal event.
pub struct MobileAdBridge {
    runtime: Arc<AsyncRuntime>,
    mediator: Arc<AdMediator>,
}

impl MobileAdBridge {
    /// Bridge `mediator` on a fresh multi-threaded runtime.
    pub fn new(mediator: AdMediator) -> Result<Self, MobileError> {
        Ok(Self::with_runtime(mediator, Arc::new(AsyncRuntime::new()?)))
    }

    /// Bridge `mediator` on a runtime shared with other bridges.
    pub fn with_runtime(mediator: AdMediator, runtime: Arc<AsyncRuntime>) -> Self {
        Self {
            runtime,
            mediator: Arc::new(mediator),
        }
    }

    pub fn mediator(&self) -> &Arc<AdMediator> {
        &self.mediator
    }

    pub fn config(&self) -> &MediationConfig {
        self.mediator.config()
    }

    pub fn runtime(&self) -> &Arc<AsyncRuntime> {
        &self.runtime
    }

    fn check_placement(&self, placement: &str) -> Result<(), MobileError> {
        self.mediator.config().placement(placement)?;
        Ok(())
    }

    /// Load the named placement.
    pub fn load(
        &self,
        placement: String,
        listener: Arc<dyn AdEventListener>,
    ) -> Result<AsyncHandle, MobileError> {
        self.check_placement(&placement)?;
        let mediator = Arc::clone(&self.mediator);

        Ok(self.runtime.spawn_with_listener(listener, move |sink| async move {
            let kind = match mediator.request_load_named(&placement).await {
                Ok(event) => AdEventKind::from(event),
                Err(e) => AdEventKind::Error {
                    message: e.to_string(),
                },
            };
            sink.emit(AdEvent::new(placement, kind));
        }))
    }

    /// Show the named placement over `screen`.
    pub fn show(
        &self,
        placement: String,
        screen: HostScreen,
        listener: Arc<dyn AdEventListener>,
    ) -> Result<AsyncHandle, MobileError> {
        self.check_placement(&placement)?;
        let mediator = Arc::clone(&self.mediator);

        Ok(self.runtime.spawn_with_listener(listener, move |sink| async move {
            let mut stream = match mediator.show_named(&placement, &screen) {
                Ok(stream) => stream,
                Err(e) => {
                    sink.emit(AdEvent::new(
                        placement,
                        AdEventKind::Error {
                            message: e.to_string(),
                        },
                    ));
                    return;
                }
            };
            while let Some(event) = stream.next().await {
                sink.emit(AdEvent::new(placement.clone(), event));
            }
        }))
    }

    /// Load the named banner placement into `container`.
    pub fn bind_banner(
        &self,
        placement: String,
        container: Arc<dyn DisplayContainer>,
        listener: Arc<dyn AdEventListener>,
    ) -> Result<AsyncHandle, MobileError> {
        self.check_placement(&placement)?;
        let mediator = Arc::clone(&self.mediator);

        Ok(self.runtime.spawn_with_listener(listener, move |sink| async move {
            let kind = match mediator.bind_surface_named(&placement, container).await {
                Ok(event) => AdEventKind::from(event),
                Err(e) => AdEventKind::Error {
                    message: e.to_string(),
                },
            };
            sink.emit(AdEvent::new(placement, kind));
        }))
    }

    /// Follow `screen` and forward its transitions to the banners.
    pub fn bind_lifecycle(&self, screen: &HostScreen) -> JoinHandle<()> {
        let _guard = self.runtime.enter();
        self.mediator.bind_lifecycle(screen)
    }

    pub fn on_screen_resumed(&self) {
        self.mediator.on_screen_resumed();
    }

    pub fn on_screen_paused(&self) {
        self.mediator.on_screen_paused();
    }

    pub fn on_screen_destroyed(&self) {
        self.mediator.on_screen_destroyed();
    }

    pub fn is_ready(&self, placement: &str) -> bool {
        self.mediator.is_ready(placement)
    }

    /// Show the app-open ad if one is cached.
    pub fn show_app_open(
        &self,
        screen: HostScreen,
        listener: Arc<dyn AdEventListener>,
    ) -> Result<AsyncHandle, MobileError> {
        let app_open = self
            .mediator
            .app_open()
            .cloned()
            .ok_or_else(|| MobileError::Config {
                msg: "no app_open placement configured".to_string(),
            })?;

        Ok(self.runtime.spawn_with_listener(listener, move |sink| async move {
            let event = app_open.show_if_available(&screen).await;
            sink.emit(AdEvent::new(app_open.key().to_string(), event));
        }))
    }
}
