//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use adkit_lib::prelude::*;
//! ```

// Facade
pub use crate::mediator::AdMediator;

// Error handling
pub use crate::errors::{AdError, AdErrorCode, Unavailable};
pub use crate::Result;

// Configuration
pub use crate::config::{
    CollapsiblePosition, MediationConfig, NativeLayout, PlacementConfig, PlacementKind,
};

// Collaborator traits
pub use crate::client::{AdNetworkClient, AdSurface, FullScreenEvent, NativeAd};
pub use crate::gates::{ConsentGate, EntitlementGate, NetworkGate};
pub use crate::screen::{DisplayContainer, LoadingOverlay, OverlayHandle};

// Outcomes
pub use crate::load::LoadEvent;
pub use crate::presentation::{ShowEvent, ShowStream};

// Host screens
pub use crate::screen::{HostScreen, ScreenLifecycle, ScreenState};
pub use crate::slot::PlacementKey;
