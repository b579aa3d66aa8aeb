//! Adkit mobile bindings.
//!
//! Host code on iOS and Android drives ads through [`MobileAdBridge`]: every
//! call returns immediately and results arrive on an [`AdEventListener`].
//! Billing is exposed through [`BillingBridge`] on the same runtime.

pub mod async_bridge;
pub mod billing_bridge;
pub mod bridge;
pub mod events;

pub use async_bridge::{AsyncHandle, AsyncRuntime, EventSink, ListenerFn};
pub use billing_bridge::BillingBridge;
pub use bridge::MobileAdBridge;
pub use events::{AdEvent, AdEventKind, AdEventListener};

use adkit_billing::BillingError;
use adkit_lib::AdError;

/// Errors surfaced to host code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MobileError {
    /// The async runtime could not be created.
    #[error("Runtime error: {msg}")]
    Runtime { msg: String },

    /// Invalid or unknown configuration.
    #[error("Configuration error: {msg}")]
    Config { msg: String },

    /// Billing platform failure.
    #[error("Billing error: {msg}")]
    Billing { msg: String },

    /// Internal error (unexpected state).
    #[error("Internal error: {msg}")]
    Internal { msg: String },
}

impl From<AdError> for MobileError {
    fn from(e: AdError) -> Self {
        match e {
            AdError::Config(msg) => MobileError::Config { msg },
            other => MobileError::Internal {
                msg: other.to_string(),
            },
        }
    }
}

impl From<BillingError> for MobileError {
    fn from(e: BillingError) -> Self {
        MobileError::Billing { msg: e.to_string() }
    }
}

impl From<serde_json::Error> for MobileError {
    fn from(e: serde_json::Error) -> Self {
        MobileError::Config { msg: e.to_string() }
    }
}

// Helper to avoid requiring tracing feature
pub(crate) fn log_debug(_msg: &str) {
    #[cfg(feature = "tracing")]
    tracing::debug!("{}", _msg);
}
