//! Purchase operations for host code.

use crate::async_bridge::{AsyncHandle, AsyncRuntime, ResultCallback};
use crate::MobileError;
use adkit_billing::{PurchaseFlowResult, PurchaseManager};
use std::sync::Arc;

/// Runs [`PurchaseManager`] operations and reports through callbacks.
pub struct BillingBridge {
    runtime: Arc<AsyncRuntime>,
    manager: Arc<PurchaseManager>,
}

impl BillingBridge {
    pub fn new(runtime: Arc<AsyncRuntime>, manager: Arc<PurchaseManager>) -> Self {
        Self { runtime, manager }
    }

    /// Buy `product_id`. Reports whether the product is now owned.
    pub fn purchase(
        &self,
        product_id: String,
        callback: Arc<dyn ResultCallback<bool>>,
    ) -> AsyncHandle {
        let manager = Arc::clone(&self.manager);
        self.runtime.spawn_with_callback(
            async move {
                let result = manager.purchase(&product_id).await?;
                Ok::<_, MobileError>(!matches!(result, PurchaseFlowResult::Cancelled))
            },
            callback,
        )
    }

    /// Restore ad removal. Reports the product ids restored.
    pub fn restore(&self, callback: Arc<dyn ResultCallback<Vec<String>>>) -> AsyncHandle {
        let manager = Arc::clone(&self.manager);
        self.runtime.spawn_with_callback(
            async move { Ok::<_, MobileError>(manager.restore_purchases().await?) },
            callback,
        )
    }

    /// Whether ads are currently switched off for this user.
    pub fn is_ad_free(&self) -> bool {
        use adkit_lib::EntitlementGate;
        self.manager.entitlements().is_entitled()
    }
}
