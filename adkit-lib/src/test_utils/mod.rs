//! Test utilities for adkit.
//!
//! Scriptable stand-ins for the collaborators a host normally provides:
//! - [`MockAdNetwork`]: an ad SDK with configurable latency and failures
//! - [`MockSurface`] and [`MockNativeAd`]: objects handed out by that SDK
//! - [`MockOverlay`] and [`MockContainer`]: host UI
//! - [`SwitchGate`]: a flippable network, entitlement or consent gate
//!
//! ## Usage
//!
//! ```rust,ignore
//! use adkit_lib::test_utils::{MockAdNetwork, MockOverlay};
//!
//! let network = Arc::new(MockAdNetwork::new().fail_next_load(3));
//! let loads = LoadCoordinator::new(registry, gates, network.clone());
//!
//! assert_eq!(loads.request_load(key, &config).await, LoadEvent::FailedToLoad { code: 3 });
//! assert_eq!(network.load_requests(), 1);
//! ```

mod mock_host;
mod mock_network;

pub use crate::gates::SwitchGate;
pub use mock_host::{MockContainer, MockOverlay};
pub use mock_network::{MockAdNetwork, MockFullScreenAd, MockNativeAd, MockSurface, SurfaceCall};
