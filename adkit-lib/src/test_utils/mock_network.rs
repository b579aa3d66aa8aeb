//! Mock ad network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::{
    AdNetworkClient, AdRequest, AdSurface, FullScreenEvent, FullScreenEvents, LoadError, NativeAd,
    SurfaceRequest,
};
use crate::config::NativeLayout;
use crate::screen::HostScreen;
use crate::slot::AdHandle;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// The ad object carried by handles from [`MockAdNetwork`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockFullScreenAd {
    /// 1-based position of the request that produced this ad.
    pub serial: usize,
}

/// Calls observed by a [`MockSurface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceCall {
    Load,
    Resume,
    Pause,
    Destroy,
}

/// Banner surface handed out by [`MockAdNetwork::create_surface`].
pub struct MockSurface {
    request: SurfaceRequest,
    delay: Duration,
    failure: Option<i32>,
    calls: Mutex<Vec<SurfaceCall>>,
}

impl MockSurface {
    fn new(request: SurfaceRequest, delay: Duration, failure: Option<i32>) -> Self {
        Self {
            request,
            delay,
            failure,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn request(&self) -> &SurfaceRequest {
        &self.request
    }

    /// Every call in the order received.
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.calls().contains(&SurfaceCall::Destroy)
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AdSurface for MockSurface {
    async fn load(&self) -> Result<(), LoadError> {
        self.record(SurfaceCall::Load);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.failure {
            Some(code) => Err(LoadError::new(code, "no fill")),
            None => Ok(()),
        }
    }

    fn resume(&self) {
        self.record(SurfaceCall::Resume);
    }

    fn pause(&self) {
        self.record(SurfaceCall::Pause);
    }

    fn destroy(&self) {
        self.record(SurfaceCall::Destroy);
    }
}

/// Native ad handed out by [`MockAdNetwork::request_native`].
#[derive(Debug)]
pub struct MockNativeAd {
    pub layout: NativeLayout,
    destroyed: AtomicUsize,
}

impl MockNativeAd {
    fn new(layout: NativeLayout) -> Self {
        Self {
            layout,
            destroyed: AtomicUsize::new(0),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroy_count() > 0
    }

    pub fn destroy_count(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl NativeAd for MockNativeAd {
    fn destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// An in-process ad network.
///
/// Loads succeed unless a failure has been queued. Full-screen presentations
/// stay open until the test drives them with [`emit`](Self::emit), unless a
/// show script was configured.
#[derive(Default)]
pub struct MockAdNetwork {
    load_delay: Duration,
    load_failures: Mutex<VecDeque<i32>>,
    surface_failures: Mutex<VecDeque<i32>>,
    native_failures: Mutex<VecDeque<i32>>,
    show_script: Option<Vec<FullScreenEvent>>,
    load_count: AtomicUsize,
    native_count: AtomicUsize,
    requests: Mutex<Vec<AdRequest>>,
    shows: Mutex<Vec<mpsc::UnboundedSender<FullScreenEvent>>>,
    show_count: AtomicUsize,
    surfaces: Mutex<Vec<Arc<MockSurface>>>,
    natives: Mutex<Vec<Arc<MockNativeAd>>>,
}

impl MockAdNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every load (full-screen, surface and native) by `delay`.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Fail the next full-screen load with `code`. Queues when repeated.
    pub fn fail_next_load(self, code: i32) -> Self {
        self.load_failures.lock().unwrap().push_back(code);
        self
    }

    /// Fail the next surface load with `code`.
    pub fn fail_next_surface(self, code: i32) -> Self {
        self.surface_failures.lock().unwrap().push_back(code);
        self
    }

    /// Fail the next native load with `code`.
    pub fn fail_next_native(self, code: i32) -> Self {
        self.native_failures.lock().unwrap().push_back(code);
        self
    }

    /// Deliver `events` immediately on every show, then close the stream.
    pub fn with_show_script(mut self, events: Vec<FullScreenEvent>) -> Self {
        self.show_script = Some(events);
        self
    }

    /// Number of full-screen load requests received.
    pub fn load_requests(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Full-screen requests in the order received.
    pub fn recorded_requests(&self) -> Vec<AdRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of `show_ad` calls.
    pub fn show_calls(&self) -> usize {
        self.show_count.load(Ordering::SeqCst)
    }

    /// Send `event` to the most recent presentation.
    pub fn emit(&self, event: FullScreenEvent) {
        if let Some(tx) = self.shows.lock().unwrap().last() {
            let _ = tx.send(event);
        }
    }

    /// Close every open presentation without a terminal event.
    pub fn close_shows(&self) {
        self.shows.lock().unwrap().clear();
    }

    pub fn surface_requests(&self) -> Vec<SurfaceRequest> {
        self.surfaces()
            .iter()
            .map(|surface| surface.request().clone())
            .collect()
    }

    /// Surfaces created so far, oldest first.
    pub fn surfaces(&self) -> Vec<Arc<MockSurface>> {
        self.surfaces.lock().unwrap().clone()
    }

    pub fn native_requests(&self) -> usize {
        self.native_count.load(Ordering::SeqCst)
    }

    /// Native ads delivered so far, oldest first.
    pub fn natives(&self) -> Vec<Arc<MockNativeAd>> {
        self.natives.lock().unwrap().clone()
    }

    async fn wait(&self) {
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
    }
}

#[async_trait]
impl AdNetworkClient for MockAdNetwork {
    async fn request_ad(&self, request: AdRequest) -> Result<AdHandle, LoadError> {
        let serial = self.load_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        self.wait().await;

        let failure = self.load_failures.lock().unwrap().pop_front();
        match failure {
            Some(code) => Err(LoadError::new(code, "no fill")),
            None => Ok(AdHandle::new(request.unit_id, MockFullScreenAd { serial })),
        }
    }

    fn show_ad(&self, _handle: &AdHandle, _screen: &HostScreen) -> FullScreenEvents {
        self.show_count.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();

        match &self.show_script {
            Some(script) => {
                for event in script {
                    let _ = tx.send(event.clone());
                }
            }
            None => self.shows.lock().unwrap().push(tx),
        }
        rx
    }

    fn create_surface(&self, request: &SurfaceRequest) -> Arc<dyn AdSurface> {
        let failure = self.surface_failures.lock().unwrap().pop_front();
        let surface = Arc::new(MockSurface::new(request.clone(), self.load_delay, failure));
        self.surfaces.lock().unwrap().push(Arc::clone(&surface));
        surface
    }

    async fn request_native(
        &self,
        _request: AdRequest,
        layout: NativeLayout,
    ) -> Result<Arc<dyn NativeAd>, LoadError> {
        self.native_count.fetch_add(1, Ordering::SeqCst);
        self.wait().await;

        let failure = self.native_failures.lock().unwrap().pop_front();
        if let Some(code) = failure {
            return Err(LoadError::new(code, "no fill"));
        }
        let ad = Arc::new(MockNativeAd::new(layout));
        self.natives.lock().unwrap().push(Arc::clone(&ad));
        Ok(ad)
    }
}
