//! Configuration types for placements and the mediator.
//!
//! Placement settings usually arrive as a remote-config JSON document; every
//! field except `unit_id` has a default so partial documents parse.

use crate::errors::AdError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Kind of ad inventory a placement requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementKind {
    /// Full-screen interstitial shown behind a loading overlay.
    #[default]
    Interstitial,
    /// Anchored adaptive banner.
    Banner,
    /// Banner that opens expanded and collapses to an anchored strip.
    CollapsibleBanner,
    /// Native ad rendered by the host into its own layout.
    Native,
    /// Full-screen ad shown when the app returns to the foreground.
    AppOpen,
}

/// Edge a collapsible banner is anchored to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollapsiblePosition {
    Top,
    Bottom,
}

impl CollapsiblePosition {
    /// Value of the `collapsible` request extra.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

/// Host layout a native ad is rendered into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeLayout {
    Small,
    #[default]
    Medium,
    Large,
    NativeBanner,
}

/// Settings for a single placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Ad network inventory identifier.
    pub unit_id: String,

    /// Remote kill-switch. A disabled placement is never requested.
    #[serde(default = "default_remote_enabled")]
    pub remote_enabled: bool,

    #[serde(default)]
    pub kind: PlacementKind,

    /// Anchor edge for collapsible banners.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsible: Option<CollapsiblePosition>,

    /// Layout for native placements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_layout: Option<NativeLayout>,

    /// How long a loaded ad stays usable, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_secs: Option<u64>,
}

fn default_remote_enabled() -> bool {
    true
}

impl PlacementConfig {
    /// Create an enabled interstitial placement.
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            remote_enabled: default_remote_enabled(),
            kind: PlacementKind::default(),
            collapsible: None,
            native_layout: None,
            expiry_secs: None,
        }
    }

    /// Set the placement kind.
    pub fn with_kind(mut self, kind: PlacementKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the remote kill-switch.
    pub fn with_remote_enabled(mut self, enabled: bool) -> Self {
        self.remote_enabled = enabled;
        self
    }

    /// Make this a collapsible banner anchored at `position`.
    pub fn with_collapsible(mut self, position: CollapsiblePosition) -> Self {
        self.kind = PlacementKind::CollapsibleBanner;
        self.collapsible = Some(position);
        self
    }

    /// Make this a native placement rendered into `layout`.
    pub fn with_native_layout(mut self, layout: NativeLayout) -> Self {
        self.kind = PlacementKind::Native;
        self.native_layout = Some(layout);
        self
    }

    /// Expire loaded ads after `expiry`.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry_secs = Some(expiry.as_secs());
        self
    }

    pub fn expiry(&self) -> Option<Duration> {
        self.expiry_secs.map(Duration::from_secs)
    }
}

/// Top-level mediator configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediationConfig {
    /// Pause between raising the loading overlay and invoking the show
    /// primitive, in milliseconds.
    #[serde(default = "default_grace_delay_ms")]
    pub grace_delay_ms: u64,

    /// Lifetime of a loaded app-open ad, in seconds.
    #[serde(default = "default_app_open_expiry_secs")]
    pub app_open_expiry_secs: u64,

    /// Placements by name.
    #[serde(default)]
    pub placements: BTreeMap<String, PlacementConfig>,
}

fn default_grace_delay_ms() -> u64 {
    1000
}

fn default_app_open_expiry_secs() -> u64 {
    4 * 60 * 60
}

impl Default for MediationConfig {
    fn default() -> Self {
        Self {
            grace_delay_ms: default_grace_delay_ms(),
            app_open_expiry_secs: default_app_open_expiry_secs(),
            placements: BTreeMap::new(),
        }
    }
}

impl MediationConfig {
    /// Parse a remote-config JSON document.
    pub fn from_json(json: &str) -> Result<Self, AdError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject placements that could never be requested.
    pub fn validate(&self) -> Result<(), AdError> {
        for (name, placement) in &self.placements {
            if placement.unit_id.trim().is_empty() {
                return Err(AdError::Config(format!(
                    "placement '{}' has an empty unit_id",
                    name
                )));
            }
            if placement.kind == PlacementKind::CollapsibleBanner && placement.collapsible.is_none()
            {
                return Err(AdError::Config(format!(
                    "collapsible placement '{}' has no position",
                    name
                )));
            }
            if placement.kind != PlacementKind::CollapsibleBanner && placement.collapsible.is_some()
            {
                return Err(AdError::Config(format!(
                    "placement '{}' sets a collapsible position but is not a collapsible banner",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Set the grace delay.
    pub fn with_grace_delay(mut self, delay: Duration) -> Self {
        self.grace_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the app-open expiry window.
    pub fn with_app_open_expiry(mut self, expiry: Duration) -> Self {
        self.app_open_expiry_secs = expiry.as_secs();
        self
    }

    /// Add or replace a named placement.
    pub fn with_placement(mut self, name: impl Into<String>, placement: PlacementConfig) -> Self {
        self.placements.insert(name.into(), placement);
        self
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    pub fn app_open_expiry(&self) -> Duration {
        Duration::from_secs(self.app_open_expiry_secs)
    }

    /// Look up a placement by name.
    pub fn placement(&self, name: &str) -> Result<&PlacementConfig, AdError> {
        self.placements
            .get(name)
            .ok_or_else(|| AdError::Config(format!("unknown placement '{}'", name)))
    }
}
