//! Availability gates consulted before any ad-network I/O.
//!
//! The host supplies three boolean oracles: connectivity, entitlement (the
//! user bought ad removal) and consent. Each is a point-in-time check with no
//! caching on our side.

use crate::errors::Unavailable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Answers whether connectivity is currently usable for an ad request.
pub trait NetworkGate: Send + Sync {
    fn is_network_reachable(&self) -> bool;
}

/// Answers whether the user has purchased ad removal.
pub trait EntitlementGate: Send + Sync {
    fn is_entitled(&self) -> bool;
}

/// Answers whether the consent framework allows ad requests.
pub trait ConsentGate: Send + Sync {
    fn can_request_ads(&self) -> bool;
}

/// Network transports a connectivity snapshot can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkTransport {
    Wifi,
    Ethernet,
    Cellular,
    Vpn,
    Bluetooth,
}

impl NetworkTransport {
    /// Transports that can carry an ad request on their own.
    pub fn carries_ads(&self) -> bool {
        matches!(self, Self::Wifi | Self::Ethernet | Self::Cellular)
    }
}

/// Snapshot of the active network's transports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityState {
    transports: BTreeSet<NetworkTransport>,
}

impl ConnectivityState {
    /// No active network.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn with_transport(mut self, transport: NetworkTransport) -> Self {
        self.transports.insert(transport);
        self
    }

    pub fn transports(&self) -> impl Iterator<Item = &NetworkTransport> {
        self.transports.iter()
    }

    /// Usable only over Wi-Fi, Ethernet or cellular. A VPN or Bluetooth link
    /// alone does not count.
    pub fn is_usable(&self) -> bool {
        self.transports.iter().any(NetworkTransport::carries_ads)
    }
}

impl NetworkGate for ConnectivityState {
    fn is_network_reachable(&self) -> bool {
        self.is_usable()
    }
}

/// A gate backed by a flag the host flips at runtime.
///
/// Implements all three gate traits so a single switch can stand in for any
/// of them.
#[derive(Debug, Default)]
pub struct SwitchGate {
    open: AtomicBool,
}

impl SwitchGate {
    pub fn new(open: bool) -> Self {
        Self {
            open: AtomicBool::new(open),
        }
    }

    /// Create a switch wrapped in an Arc for sharing with the mediator.
    pub fn new_shared(open: bool) -> Arc<Self> {
        Arc::new(Self::new(open))
    }

    pub fn set(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl NetworkGate for SwitchGate {
    fn is_network_reachable(&self) -> bool {
        self.get()
    }
}

impl EntitlementGate for SwitchGate {
    fn is_entitled(&self) -> bool {
        self.get()
    }
}

impl ConsentGate for SwitchGate {
    fn can_request_ads(&self) -> bool {
        self.get()
    }
}

/// The network and entitlement oracles shared by every coordinator.
#[derive(Clone)]
pub struct Gates {
    network: Arc<dyn NetworkGate>,
    entitlement: Arc<dyn EntitlementGate>,
}

impl Gates {
    pub fn new(network: Arc<dyn NetworkGate>, entitlement: Arc<dyn EntitlementGate>) -> Self {
        Self {
            network,
            entitlement,
        }
    }

    /// Run the three availability checks in order: network, remote flag,
    /// entitlement. The first failure wins.
    pub fn check(&self, remote_enabled: bool) -> Result<(), Unavailable> {
        if !self.network.is_network_reachable() {
            crate::log_debug("ad not available due to network error");
            return Err(Unavailable::NetworkUnavailable);
        }
        if !remote_enabled {
            crate::log_debug("ad not available due to remote config");
            return Err(Unavailable::ConfigurationDisabled);
        }
        if self.entitlement.is_entitled() {
            crate::log_debug("ad not available due to purchase");
            return Err(Unavailable::NotEntitled);
        }
        Ok(())
    }

    pub fn is_network_reachable(&self) -> bool {
        self.network.is_network_reachable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gates(network: bool, entitled: bool) -> Gates {
        Gates::new(SwitchGate::new_shared(network), SwitchGate::new_shared(entitled))
    }

    #[test]
    fn vpn_alone_is_not_usable() {
        let state = ConnectivityState::offline().with_transport(NetworkTransport::Vpn);
        assert!(!state.is_network_reachable());

        let state = state.with_transport(NetworkTransport::Cellular);
        assert!(state.is_network_reachable());
    }

    #[test]
    fn all_open_passes() {
        assert_eq!(gates(true, false).check(true), Ok(()));
    }

    proptest! {
        #[test]
        fn first_failing_check_determines_reason(
            network in any::<bool>(),
            remote in any::<bool>(),
            entitled in any::<bool>(),
        ) {
            let result = gates(network, entitled).check(remote);
            let expected = if !network {
                Err(Unavailable::NetworkUnavailable)
            } else if !remote {
                Err(Unavailable::ConfigurationDisabled)
            } else if entitled {
                Err(Unavailable::NotEntitled)
            } else {
                Ok(())
            };
            prop_assert_eq!(result, expected);
        }
    }
}
