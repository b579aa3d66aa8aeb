//! Purchase handling: acknowledge, consume, grant.

use crate::client::{BillingClient, ProductKind, Purchase, PurchaseFlowResult, PurchaseState};
use crate::entitlement::EntitlementStore;
use crate::{BillingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A product the app sells.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductConfig {
    pub id: String,
    pub kind: ProductKind,
    /// Owning this product turns ads off.
    #[serde(default)]
    pub removes_ads: bool,
}

impl ProductConfig {
    pub fn new(id: impl Into<String>, kind: ProductKind) -> Self {
        Self {
            id: id.into(),
            kind,
            removes_ads: false,
        }
    }

    pub fn removing_ads(mut self) -> Self {
        self.removes_ads = true;
        self
    }
}

/// The products known to the app.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCatalog {
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

impl ProductCatalog {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_product(mut self, product: ProductConfig) -> Self {
        self.products.push(product);
        self
    }

    /// Look up a product, ignoring case.
    pub fn get(&self, product_id: &str) -> Option<&ProductConfig> {
        self.products
            .iter()
            .find(|product| product.id.eq_ignore_ascii_case(product_id))
    }

    fn products_in<'a>(&'a self, purchase: &'a Purchase) -> impl Iterator<Item = &'a ProductConfig> {
        self.products
            .iter()
            .filter(move |product| purchase.covers(&product.id))
    }
}

/// What handling one purchase did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PurchaseOutcome {
    pub acknowledged: bool,
    pub consumed: bool,
    /// Ad-removal products granted by this purchase.
    pub granted: Vec<String>,
}

/// Processes purchases reported by the platform.
pub struct PurchaseManager {
    client: Arc<dyn BillingClient>,
    catalog: ProductCatalog,
    store: Arc<EntitlementStore>,
    // Tokens this manager has acknowledged. Held across the platform call so
    // concurrent deliveries of one purchase acknowledge it once.
    acknowledged: Mutex<HashSet<String>>,
}

impl PurchaseManager {
    pub fn new(
        client: Arc<dyn BillingClient>,
        catalog: ProductCatalog,
        store: Arc<EntitlementStore>,
    ) -> Self {
        Self {
            client,
            catalog,
            store,
            acknowledged: Mutex::new(HashSet::new()),
        }
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn entitlements(&self) -> &Arc<EntitlementStore> {
        &self.store
    }

    /// Settle one purchase.
    ///
    /// Pending purchases are left alone. Unacknowledged purchases are
    /// acknowledged once; consumables are then consumed, and ad-removal
    /// products are granted.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, purchase), fields(token = %purchase.token)))]
    pub async fn handle_purchase(&self, purchase: &Purchase) -> Result<PurchaseOutcome> {
        let mut outcome = PurchaseOutcome::default();
        if purchase.state != PurchaseState::Purchased {
            crate::log_debug("purchase not completed yet");
            return Ok(outcome);
        }

        {
            let mut acknowledged = self.acknowledged.lock().await;
            if !purchase.acknowledged && !acknowledged.contains(&purchase.token) {
                self.client.acknowledge(&purchase.token).await?;
                acknowledged.insert(purchase.token.clone());
                outcome.acknowledged = true;
            }
        }

        let products: Vec<ProductConfig> = self.catalog.products_in(purchase).cloned().collect();
        if products.is_empty() {
            crate::log_warn(&format!("purchase for unknown products {:?}", purchase.product_ids));
        }

        for product in products {
            if product.kind == ProductKind::Consumable && !outcome.consumed {
                self.client.consume(&purchase.token).await?;
                outcome.consumed = true;
            }
            if product.removes_ads {
                self.store.grant(product.id.clone(), purchase.expires_at);
                outcome.granted.push(product.id);
            }
        }

        Ok(outcome)
    }

    /// Run the purchase flow for `product_id` and settle what it returns.
    pub async fn purchase(&self, product_id: &str) -> Result<PurchaseFlowResult> {
        let product = self
            .catalog
            .get(product_id)
            .ok_or_else(|| BillingError::UnknownProduct(product_id.to_string()))?;

        let result = self.client.launch_purchase(&product.id, product.kind).await?;
        match &result {
            PurchaseFlowResult::Purchased(purchases) => {
                for purchase in purchases {
                    self.handle_purchase(purchase).await?;
                }
            }
            PurchaseFlowResult::AlreadyOwned => {
                self.restore_purchases().await?;
            }
            PurchaseFlowResult::Cancelled => crate::log_debug("purchase cancelled by user"),
        }
        Ok(result)
    }

    /// Re-grant ad removal from the purchases the user owns.
    ///
    /// Returns the product ids granted.
    pub async fn restore_purchases(&self) -> Result<Vec<String>> {
        let mut restored = Vec::new();

        for kind in [ProductKind::OneTime, ProductKind::Subscription] {
            let owned = self.client.query_purchases(kind).await?;
            if owned.is_empty() {
                crate::log_debug(&format!("nothing to restore for {:?}", kind));
            }

            for purchase in owned.iter().filter(|p| p.state == PurchaseState::Purchased) {
                for product in self.catalog.products_in(purchase) {
                    if product.removes_ads {
                        self.store.grant(product.id.clone(), purchase.expires_at);
                        restored.push(product.id.clone());
                    }
                }
            }
        }

        Ok(restored)
    }
}
