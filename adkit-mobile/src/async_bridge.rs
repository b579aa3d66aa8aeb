//! Async Bridge for Mobile Platforms
//!
//! Host platforms drive ads from their own threads and expect results on
//! listeners, not Rust futures. This module owns the tokio runtime and turns
//! coordinator futures into listener calls.
//!
//! # Example (Listener Style)
//!
//! ```ignore
//! // From Swift/Kotlin
//! bridge.load("level_end") { event in
//!     switch event.kind {
//!     case .loaded: // ready to show
//!     case .notAvailable(let code, _): // hide entry point
//!     }
//! }
//! ```

use crate::events::{AdEvent, AdEventListener};
use crate::MobileError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Result callback interface for mobile.
///
/// Implemented by host code to receive one-shot async results.
pub trait ResultCallback<T>: Send + Sync {
    fn on_success(&self, value: T);
    fn on_error(&self, error: String);
}

/// Async operation handle.
///
/// Cancelling stops delivery to the listener. Work already handed to the
/// coordinators still runs to completion so no slot is left half-settled.
/// Dropping the handle without cancelling keeps delivery going.
pub struct AsyncHandle {
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl AsyncHandle {
    pub fn new(cancel_tx: oneshot::Sender<()>) -> Self {
        Self {
            cancel_tx: Some(cancel_tx),
        }
    }

    /// Stop delivering events for this operation.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Check if the operation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_tx.is_none()
    }
}

/// Sending half handed to an operation spawned with
/// [`AsyncRuntime::spawn_with_listener`].
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<AdEvent>,
}

impl EventSink {
    /// Queue `event` for the listener. Dropped silently after cancellation.
    pub fn emit(&self, event: AdEvent) {
        let _ = self.tx.send(event);
    }
}

/// Async runtime wrapper for mobile.
pub struct AsyncRuntime {
    runtime: tokio::runtime::Runtime,
}

impl AsyncRuntime {
    /// Create a new multi-threaded runtime.
    pub fn new() -> Result<Self, MobileError> {
        tokio::runtime::Runtime::new()
            .map(|runtime| Self { runtime })
            .map_err(|e| MobileError::Runtime {
                msg: format!("Failed to create runtime: {}", e),
            })
    }

    /// Create with a fixed number of worker threads.
    pub fn with_threads(num_threads: usize) -> Result<Self, MobileError> {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(num_threads)
            .enable_all()
            .build()
            .map(|runtime| Self { runtime })
            .map_err(|e| MobileError::Runtime {
                msg: format!("Failed to create runtime: {}", e),
            })
    }

    /// Run a future to completion on the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if called from within a Tokio runtime context. Call it only from
    /// host threads (main thread, GCD queues, executor threads).
    pub fn block_on<F, T>(&self, future: F) -> T
    where
        F: Future<Output = T>,
    {
        self.runtime.block_on(future)
    }

    /// Enter the runtime context so that synchronous code may spawn tasks.
    pub fn enter(&self) -> tokio::runtime::EnterGuard<'_> {
        self.runtime.enter()
    }

    /// Run `operation` and forward everything it emits to `listener`.
    ///
    /// Events are delivered in emission order, one at a time, from a single
    /// task. Returns a handle that stops delivery when cancelled.
    pub fn spawn_with_listener<F, Fut>(
        &self,
        listener: Arc<dyn AdEventListener>,
        operation: F,
    ) -> AsyncHandle
    where
        F: FnOnce(EventSink) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        let (tx, mut events) = mpsc::unbounded_channel();

        self.runtime.spawn(operation(EventSink { tx }));
        self.runtime.spawn(async move {
            let mut detached = false;
            loop {
                tokio::select! {
                    biased;
                    signal = &mut cancel_rx, if !detached => {
                        if signal.is_ok() {
                            crate::log_debug("listener cancelled");
                            break;
                        }
                        // Handle dropped without cancelling.
                        detached = true;
                    }
                    event = events.recv() => match event {
                        Some(event) => listener.on_event(event),
                        None => break,
                    },
                }
            }
        });

        AsyncHandle::new(cancel_tx)
    }

    /// Spawn an async task with a one-shot result callback.
    pub fn spawn_with_callback<F, T, C>(&self, future: F, callback: Arc<C>) -> AsyncHandle
    where
        F: Future<Output = Result<T, MobileError>> + Send + 'static,
        T: Send + 'static,
        C: ResultCallback<T> + ?Sized + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel();

        self.runtime.spawn(async move {
            tokio::select! {
                Ok(()) = cancel_rx => {
                    // Cancelled
                }
                result = future => {
                    match result {
                        Ok(value) => callback.on_success(value),
                        Err(error) => callback.on_error(error.to_string()),
                    }
                }
            }
        });

        AsyncHandle::new(cancel_tx)
    }

    /// Spawn an async task (fire and forget).
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(future);
    }
}

/// Closure-backed listener for hosts that bridge functions rather than
/// objects.
#[derive(Clone)]
pub struct ListenerFn {
    on_event: Arc<dyn Fn(AdEvent) + Send + Sync>,
}

impl ListenerFn {
    pub fn new<F>(on_event: F) -> Self
    where
        F: Fn(AdEvent) + Send + Sync + 'static,
    {
        Self {
            on_event: Arc::new(on_event),
        }
    }
}

impl AdEventListener for ListenerFn {
    fn on_event(&self, event: AdEvent) {
        (self.on_event)(event);
    }
}
