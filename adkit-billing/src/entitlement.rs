//! Ad-removal entitlements.

use adkit_lib::EntitlementGate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// One entitled product. `expires_at` is set for subscriptions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Entitlement {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|end| end > now).unwrap_or(true)
    }
}

/// Thread-safe set of entitled products.
///
/// Serves as the entitlement gate for the ad mediator: the user is entitled
/// to an ad-free experience while any entitlement is active.
#[derive(Debug, Default)]
pub struct EntitlementStore {
    entitlements: RwLock<BTreeMap<String, Entitlement>>,
}

impl EntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `product_id`, replacing any earlier grant for it.
    pub fn grant(&self, product_id: impl Into<String>, expires_at: Option<DateTime<Utc>>) {
        let product_id = product_id.into();
        crate::log_debug(&format!("granting entitlement for {}", product_id));
        let mut entitlements = self.entitlements.write().unwrap_or_else(|e| e.into_inner());
        entitlements.insert(
            product_id.clone(),
            Entitlement {
                product_id,
                expires_at,
            },
        );
    }

    pub fn revoke(&self, product_id: &str) -> bool {
        let mut entitlements = self.entitlements.write().unwrap_or_else(|e| e.into_inner());
        entitlements.remove(product_id).is_some()
    }

    pub fn clear(&self) {
        let mut entitlements = self.entitlements.write().unwrap_or_else(|e| e.into_inner());
        entitlements.clear();
    }

    pub fn is_entitled_to(&self, product_id: &str) -> bool {
        let entitlements = self.entitlements.read().unwrap_or_else(|e| e.into_inner());
        entitlements
            .get(product_id)
            .map(|entitlement| entitlement.is_active_at(Utc::now()))
            .unwrap_or(false)
    }

    pub fn is_entitled_at(&self, now: DateTime<Utc>) -> bool {
        let entitlements = self.entitlements.read().unwrap_or_else(|e| e.into_inner());
        entitlements.values().any(|entitlement| entitlement.is_active_at(now))
    }

    /// Every recorded entitlement, active or not.
    pub fn entitlements(&self) -> Vec<Entitlement> {
        let entitlements = self.entitlements.read().unwrap_or_else(|e| e.into_inner());
        entitlements.values().cloned().collect()
    }

    /// Serialize for persistence between sessions.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(&self.entitlements())?)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        let list: Vec<Entitlement> = serde_json::from_str(json)?;
        let store = Self::new();
        for entitlement in list {
            store.grant(entitlement.product_id, entitlement.expires_at);
        }
        Ok(store)
    }
}

impl EntitlementGate for EntitlementStore {
    fn is_entitled(&self) -> bool {
        self.is_entitled_at(Utc::now())
    }
}
