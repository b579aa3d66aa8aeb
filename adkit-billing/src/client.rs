//! The platform billing seam.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a product is sold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Bought once and owned forever, e.g. ad removal.
    OneTime,
    /// Bought, consumed, and bought again.
    Consumable,
    Subscription,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseState {
    Pending,
    Purchased,
    Unspecified,
}

/// A purchase as reported by the platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub token: String,
    pub product_ids: Vec<String>,
    pub state: PurchaseState,
    pub acknowledged: bool,
    pub purchased_at: DateTime<Utc>,
    /// End of the current period for subscriptions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Purchase {
    pub fn new(token: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            product_ids: vec![product_id.into()],
            state: PurchaseState::Purchased,
            acknowledged: false,
            purchased_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_state(mut self, state: PurchaseState) -> Self {
        self.state = state;
        self
    }

    pub fn with_acknowledged(mut self, acknowledged: bool) -> Self {
        self.acknowledged = acknowledged;
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether this purchase covers `product_id`, ignoring case.
    pub fn covers(&self, product_id: &str) -> bool {
        self.product_ids
            .iter()
            .any(|id| id.eq_ignore_ascii_case(product_id))
    }
}

/// Result of a user-facing purchase flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PurchaseFlowResult {
    Purchased(Vec<Purchase>),
    Cancelled,
    AlreadyOwned,
}

/// Interface to the platform store.
#[async_trait]
pub trait BillingClient: Send + Sync {
    /// Purchases the user currently owns of `kind`.
    async fn query_purchases(&self, kind: ProductKind) -> Result<Vec<Purchase>>;

    async fn acknowledge(&self, token: &str) -> Result<()>;

    async fn consume(&self, token: &str) -> Result<()>;

    /// Run the purchase UI for `product_id`.
    async fn launch_purchase(&self, product_id: &str, kind: ProductKind)
        -> Result<PurchaseFlowResult>;
}
