//! The ad network client seam.
//!
//! Everything the mediator needs from a concrete ad SDK goes through
//! [`AdNetworkClient`]. Implementations are expected to run their own I/O and
//! deliver exactly one result per request.

use crate::config::{NativeLayout, PlacementConfig, PlacementKind};
use crate::errors::ShowError;
use crate::screen::{AdaptiveBannerSize, HostScreen};
use crate::slot::AdHandle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A single ad request as handed to the network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdRequest {
    pub unit_id: String,
    pub kind: PlacementKind,
    /// Network extras, e.g. `collapsible = "bottom"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

impl AdRequest {
    /// Build the request for a placement, including any network extras it
    /// implies.
    pub fn for_placement(config: &PlacementConfig) -> Self {
        let mut extras = BTreeMap::new();
        if config.kind == PlacementKind::CollapsibleBanner {
            if let Some(position) = config.collapsible {
                extras.insert("collapsible".to_string(), position.as_str().to_string());
            }
        }
        Self {
            unit_id: config.unit_id.clone(),
            kind: config.kind,
            extras,
        }
    }
}

/// Request for a continuously displayed banner surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceRequest {
    pub ad: AdRequest,
    pub size: AdaptiveBannerSize,
}

/// Load failure reported by the ad network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadError {
    pub code: i32,
    pub domain: String,
    pub message: String,
}

impl LoadError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            domain: "ads".to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "domain: {}, code: {}, message: {}",
            self.domain, self.code, self.message
        )
    }
}

/// Downstream events of a full-screen presentation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FullScreenEvent {
    Clicked,
    Impression,
    Shown,
    Dismissed,
    FailedToShow(ShowError),
}

/// Receiver side of a full-screen presentation.
pub type FullScreenEvents = mpsc::UnboundedReceiver<FullScreenEvent>;

/// A rendered banner view owned by the ad network.
#[async_trait]
pub trait AdSurface: Send + Sync {
    /// Fetch creative into this surface.
    async fn load(&self) -> Result<(), LoadError>;
    fn resume(&self);
    fn pause(&self);
    /// Release the underlying view. The surface must not be used afterwards.
    fn destroy(&self);
}

/// A loaded native ad, rendered by the host.
pub trait NativeAd: Send + Sync {
    fn destroy(&self);
}

/// Interface to a concrete ad SDK.
#[async_trait]
pub trait AdNetworkClient: Send + Sync {
    /// Load a full-screen ad.
    async fn request_ad(&self, request: AdRequest) -> Result<AdHandle, LoadError>;

    /// Present a loaded full-screen ad over `screen`.
    ///
    /// The returned stream must end with `Dismissed` or `FailedToShow`.
    fn show_ad(&self, handle: &AdHandle, screen: &HostScreen) -> FullScreenEvents;

    /// Create an unloaded banner surface.
    fn create_surface(&self, request: &SurfaceRequest) -> Arc<dyn AdSurface>;

    /// Load a native ad.
    async fn request_native(
        &self,
        request: AdRequest,
        layout: NativeLayout,
    ) -> Result<Arc<dyn NativeAd>, LoadError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollapsiblePosition;

    #[test]
    fn collapsible_request_carries_extra() {
        let config = PlacementConfig::new("unit").with_collapsible(CollapsiblePosition::Bottom);
        let request = AdRequest::for_placement(&config);
        assert_eq!(request.kind, PlacementKind::CollapsibleBanner);
        assert_eq!(request.extras.get("collapsible").map(String::as_str), Some("bottom"));
    }

    #[test]
    fn plain_request_has_no_extras() {
        let config = PlacementConfig::new("unit").with_kind(PlacementKind::Banner);
        assert!(AdRequest::for_placement(&config).extras.is_empty());
    }

    #[test]
    fn load_error_display() {
        let err = LoadError::new(3, "no fill");
        assert_eq!(err.to_string(), "domain: ads, code: 3, message: no fill");
    }
}
