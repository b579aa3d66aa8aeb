//! Error types for ad mediation.
//!
//! Ad outcomes are reported as events, never as panics or errors that cross a
//! coordinator boundary. [`AdError`] is the structured form of those outcomes
//! for callers that want to fold an event into a `Result`, and for the
//! configuration layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for host platform integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum AdErrorCode {
    /// Placement disabled by remote configuration
    ConfigurationDisabled = 1000,
    /// User purchased ad removal
    NotEntitled = 1001,
    /// No usable connectivity
    NetworkUnavailable = 2000,
    /// Ad network rejected or failed the load
    LoadFailed = 3000,
    /// Ad network failed to present a loaded ad
    ShowFailed = 3001,
    /// Show attempted without a ready ad
    NoAdReady = 4000,
    /// Show attempted while the placement is on screen
    AlreadyShowing = 4001,
    /// Host screen went away before the ad could be shown
    HostDestroyed = 4002,
    /// Invalid configuration document
    Config = 5000,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Why a placement reported `NotAvailable`.
///
/// Availability checks run in a fixed order (network, remote flag,
/// entitlement) and the first failing check determines the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unavailable {
    /// No usable connectivity.
    NetworkUnavailable,
    /// Remote kill-switch is off for this placement.
    ConfigurationDisabled,
    /// The user is entitled to an ad-free experience.
    NotEntitled,
    /// Nothing loaded for this placement (or it is still loading or expired).
    NoAdReady,
    /// The placement is already being presented.
    AlreadyShowing,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NetworkUnavailable => "network unavailable",
            Self::ConfigurationDisabled => "disabled by remote configuration",
            Self::NotEntitled => "user is entitled to ad-free experience",
            Self::NoAdReady => "no ad ready",
            Self::AlreadyShowing => "already showing",
        };
        f.write_str(reason)
    }
}

/// Failure reported by the ad network when presenting full-screen content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowError {
    /// Network-specific error code.
    pub code: i32,
    /// Human-readable message from the network.
    pub message: String,
}

impl ShowError {
    /// Code used when the event stream ended without a terminal event.
    pub const INTERRUPTED: i32 = -1;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The ad network dropped its event stream before dismissing or failing.
    pub fn interrupted() -> Self {
        Self::new(Self::INTERRUPTED, "full-screen event stream closed early")
    }
}

impl fmt::Display for ShowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)
    }
}

/// Comprehensive error type for mediation operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdError {
    #[error("placement disabled by remote configuration")]
    ConfigurationDisabled,

    #[error("user is entitled to an ad-free experience")]
    NotEntitled,

    #[error("network unavailable")]
    NetworkUnavailable,

    #[error("ad network load failure (code {code})")]
    LoadFailed { code: i32 },

    #[error("ad network show failure ({0})")]
    ShowFailed(ShowError),

    #[error("no ad ready")]
    NoAdReady,

    #[error("placement is already showing")]
    AlreadyShowing,

    #[error("host screen destroyed before presentation")]
    HostDestroyed,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AdError {
    /// Get the error code for host platforms.
    pub fn code(&self) -> AdErrorCode {
        match self {
            Self::ConfigurationDisabled => AdErrorCode::ConfigurationDisabled,
            Self::NotEntitled => AdErrorCode::NotEntitled,
            Self::NetworkUnavailable => AdErrorCode::NetworkUnavailable,
            Self::LoadFailed { .. } => AdErrorCode::LoadFailed,
            Self::ShowFailed(_) => AdErrorCode::ShowFailed,
            Self::NoAdReady => AdErrorCode::NoAdReady,
            Self::AlreadyShowing => AdErrorCode::AlreadyShowing,
            Self::HostDestroyed => AdErrorCode::HostDestroyed,
            Self::Config(_) => AdErrorCode::Config,
            Self::Internal(_) => AdErrorCode::Internal,
        }
    }

    /// Whether a fresh load could make this outcome succeed next time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnavailable | Self::LoadFailed { .. } | Self::ShowFailed(_) | Self::NoAdReady
        )
    }
}

impl From<Unavailable> for AdError {
    fn from(reason: Unavailable) -> Self {
        match reason {
            Unavailable::NetworkUnavailable => Self::NetworkUnavailable,
            Unavailable::ConfigurationDisabled => Self::ConfigurationDisabled,
            Unavailable::NotEntitled => Self::NotEntitled,
            Unavailable::NoAdReady => Self::NoAdReady,
            Unavailable::AlreadyShowing => Self::AlreadyShowing,
        }
    }
}

impl From<serde_json::Error> for AdError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}
