//! # Adkit Billing
//!
//! The purchase side of ad removal. A [`PurchaseManager`] drives a
//! platform [`BillingClient`], acknowledges and consumes purchases, and
//! records ad-removal entitlements in an [`EntitlementStore`]. The store is
//! the [`adkit_lib::EntitlementGate`] handed to the ad mediator.

pub mod client;
pub mod entitlement;
pub mod manager;
pub mod price;

pub use client::{BillingClient, ProductKind, Purchase, PurchaseFlowResult, PurchaseState};
pub use entitlement::EntitlementStore;
pub use manager::{ProductCatalog, ProductConfig, PurchaseManager, PurchaseOutcome};
pub use price::divide_formatted_price;

/// Billing failures reported by the platform or by catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BillingError {
    #[error("billing service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("billing response {code}: {message}")]
    Response { code: i32, message: String },
    #[error("unknown product: {0}")]
    UnknownProduct(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl BillingError {
    /// Whether the same call may succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }
}

impl From<serde_json::Error> for BillingError {
    fn from(e: serde_json::Error) -> Self {
        BillingError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;

// Helpers to avoid requiring the tracing feature
pub(crate) fn log_debug(_msg: &str) {
    #[cfg(feature = "tracing")]
    tracing::debug!("{}", _msg);
}

pub(crate) fn log_warn(_msg: &str) {
    #[cfg(feature = "tracing")]
    tracing::warn!("{}", _msg);
}
