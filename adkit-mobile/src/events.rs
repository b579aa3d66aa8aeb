//! Events delivered to host listeners.

use adkit_lib::{AdError, LoadEvent, ShowEvent, Unavailable};
use serde::{Deserialize, Serialize};

/// Listener implemented by host code. Called from a runtime worker thread.
pub trait AdEventListener: Send + Sync {
    fn on_event(&self, event: AdEvent);
}

/// What happened to a placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdEventKind {
    Loaded,
    FailedToLoad { code: i32 },
    /// `code` is the host-facing [`adkit_lib::AdErrorCode`].
    NotAvailable { code: i32, reason: String },
    Abandoned,
    Clicked,
    Impression,
    Shown,
    Dismissed,
    FailedToShow { code: i32, message: String },
    Cancelled,
    /// The request never reached a coordinator.
    Error { message: String },
}

impl AdEventKind {
    /// Whether no further events follow for the same request.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Clicked | Self::Impression | Self::Shown)
    }

    fn not_available(reason: Unavailable) -> Self {
        Self::NotAvailable {
            code: AdError::from(reason).code() as i32,
            reason: reason.to_string(),
        }
    }
}

impl From<LoadEvent> for AdEventKind {
    fn from(event: LoadEvent) -> Self {
        match event {
            LoadEvent::Loaded => Self::Loaded,
            LoadEvent::FailedToLoad { code } => Self::FailedToLoad { code },
            LoadEvent::NotAvailable(reason) => Self::not_available(reason),
            LoadEvent::Abandoned => Self::Abandoned,
        }
    }
}

impl From<ShowEvent> for AdEventKind {
    fn from(event: ShowEvent) -> Self {
        match event {
            ShowEvent::NotAvailable(reason) => Self::not_available(reason),
            ShowEvent::Clicked => Self::Clicked,
            ShowEvent::Impression => Self::Impression,
            ShowEvent::Shown => Self::Shown,
            ShowEvent::Dismissed => Self::Dismissed,
            ShowEvent::FailedToShow(err) => Self::FailedToShow {
                code: err.code,
                message: err.message,
            },
            ShowEvent::Cancelled => Self::Cancelled,
        }
    }
}

/// An event for one placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdEvent {
    pub placement: String,
    #[serde(flatten)]
    pub kind: AdEventKind,
}

impl AdEvent {
    pub fn new(placement: impl Into<String>, kind: impl Into<AdEventKind>) -> Self {
        Self {
            placement: placement.into(),
            kind: kind.into(),
        }
    }

    /// JSON form for hosts that marshal events as strings.
    pub fn to_json(&self) -> Result<String, crate::MobileError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adkit_lib::ShowError;

    #[test]
    fn not_available_carries_host_code() {
        let event = AdEvent::new("home", LoadEvent::NotAvailable(Unavailable::NotEntitled));
        assert_eq!(
            event.kind,
            AdEventKind::NotAvailable {
                code: 1001,
                reason: "user is entitled to ad-free experience".to_string(),
            }
        );
    }

    #[test]
    fn json_is_flat_and_tagged() {
        let event = AdEvent::new(
            "level_end",
            ShowEvent::FailedToShow(ShowError::new(3, "reused")),
        );
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["placement"], "level_end");
        assert_eq!(json["type"], "failed_to_show");
        assert_eq!(json["code"], 3);
    }

    #[test]
    fn terminal_kinds() {
        assert!(AdEventKind::from(ShowEvent::Dismissed).is_terminal());
        assert!(AdEventKind::from(LoadEvent::Loaded).is_terminal());
        assert!(!AdEventKind::from(ShowEvent::Shown).is_terminal());
    }
}
