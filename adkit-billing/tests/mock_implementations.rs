use adkit_billing::{
    BillingClient, BillingError, ProductKind, Purchase, PurchaseFlowResult, Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock platform store for testing
#[derive(Default)]
pub struct MockBillingClient {
    owned: Arc<Mutex<HashMap<ProductKind, Vec<Purchase>>>>,
    flow_result: Arc<Mutex<Option<PurchaseFlowResult>>>,
    acknowledged: Arc<Mutex<Vec<String>>>,
    consumed: Arc<Mutex<Vec<String>>>,
    fail_acknowledge: Arc<Mutex<bool>>,
}

impl MockBillingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn own(&self, kind: ProductKind, purchase: Purchase) {
        self.owned
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push(purchase);
    }

    pub fn set_flow_result(&self, result: PurchaseFlowResult) {
        *self.flow_result.lock().unwrap() = Some(result);
    }

    pub fn set_fail_acknowledge(&self, fail: bool) {
        *self.fail_acknowledge.lock().unwrap() = fail;
    }

    pub fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().unwrap().clone()
    }

    pub fn consumed(&self) -> Vec<String> {
        self.consumed.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingClient for MockBillingClient {
    async fn query_purchases(&self, kind: ProductKind) -> Result<Vec<Purchase>> {
        let owned = self
            .owned
            .lock()
            .map_err(|e| BillingError::ServiceUnavailable(format!("Mutex poisoned: {}", e)))?;
        Ok(owned.get(&kind).cloned().unwrap_or_default())
    }

    async fn acknowledge(&self, token: &str) -> Result<()> {
        if *self.fail_acknowledge.lock().unwrap() {
            return Err(BillingError::Response {
                code: 6,
                message: "error".to_string(),
            });
        }
        tokio::task::yield_now().await;
        self.acknowledged.lock().unwrap().push(token.to_string());
        Ok(())
    }

    async fn consume(&self, token: &str) -> Result<()> {
        self.consumed.lock().unwrap().push(token.to_string());
        Ok(())
    }

    async fn launch_purchase(
        &self,
        _product_id: &str,
        _kind: ProductKind,
    ) -> Result<PurchaseFlowResult> {
        Ok(self
            .flow_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or(PurchaseFlowResult::Cancelled))
    }
}
