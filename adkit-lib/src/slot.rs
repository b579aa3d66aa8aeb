//! Placement slots and the keyed registry that owns them.
//!
//! # Thread Safety
//!
//! `AdSlotRegistry` itself is not synchronized. The mediator wraps it in a
//! `Mutex` and every coordinator holds the lock only for short, non-async
//! sections, so all slot transitions are serialized.

use crate::config::PlacementConfig;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Stable identifier distinguishing placements that must not share a slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlacementKey {
    Id(i64),
    Name(String),
}

impl fmt::Display for PlacementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{}", id),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for PlacementKey {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for PlacementKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for PlacementKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Unique identity of one loaded ad object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleId(uuid::Uuid);

impl HandleId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque loaded-ad object produced by the ad network client.
///
/// Cloning is cheap and shares the underlying object; the slot remains the
/// owner of record and clearing the slot is what releases the ad.
#[derive(Clone)]
pub struct AdHandle {
    id: HandleId,
    unit_id: String,
    ad: Arc<dyn Any + Send + Sync>,
}

impl AdHandle {
    /// Wrap a network-specific ad object.
    pub fn new<T: Any + Send + Sync>(unit_id: impl Into<String>, ad: T) -> Self {
        Self {
            id: HandleId::new(),
            unit_id: unit_id.into(),
            ad: Arc::new(ad),
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    /// Recover the network-specific ad object.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.ad.downcast_ref::<T>()
    }
}

impl fmt::Debug for AdHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdHandle")
            .field("id", &self.id)
            .field("unit_id", &self.unit_id)
            .finish_non_exhaustive()
    }
}

impl PartialEq for AdHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Identifies one load attempt so late completions for an abandoned attempt
/// can be recognised and dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

/// Cached load/ready state for one placement.
///
/// At most one of `is_loading` / `handle` is ever set, and a new load may
/// only start when both are clear.
#[derive(Clone, Debug)]
pub struct AdSlot {
    pub key: PlacementKey,
    pub unit_id: String,
    pub remote_enabled: bool,
    is_loading: bool,
    handle: Option<AdHandle>,
    loaded_at: Option<Instant>,
    expiry: Option<Duration>,
    ticket: Option<LoadTicket>,
    presenting: bool,
}

impl AdSlot {
    pub fn new(key: PlacementKey, config: &PlacementConfig) -> Self {
        Self {
            key,
            unit_id: config.unit_id.clone(),
            remote_enabled: config.remote_enabled,
            is_loading: false,
            handle: None,
            loaded_at: None,
            expiry: config.expiry(),
            ticket: None,
            presenting: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn handle(&self) -> Option<&AdHandle> {
        self.handle.as_ref()
    }

    pub fn is_presenting(&self) -> bool {
        self.presenting
    }

    /// Neither loading nor holding an ad, so a new load may be issued.
    pub fn is_idle(&self) -> bool {
        !self.is_loading && self.handle.is_none()
    }

    /// Whether the cached ad has outlived its expiry window.
    pub fn is_expired(&self, now: Instant) -> bool {
        match (self.expiry, self.loaded_at) {
            (Some(expiry), Some(loaded_at)) => now.saturating_duration_since(loaded_at) >= expiry,
            _ => false,
        }
    }

    /// A loaded, unexpired ad is cached.
    pub fn is_ready(&self, now: Instant) -> bool {
        self.handle.is_some() && !self.is_expired(now)
    }

    pub(crate) fn begin_load(&mut self, ticket: LoadTicket) {
        debug_assert!(self.is_idle());
        self.is_loading = true;
        self.ticket = Some(ticket);
    }

    /// Store a loaded ad. Returns false if `ticket` is not the attempt in
    /// flight, in which case the slot is untouched.
    pub(crate) fn complete_load(&mut self, ticket: LoadTicket, handle: AdHandle) -> bool {
        if self.ticket != Some(ticket) {
            return false;
        }
        self.ticket = None;
        self.is_loading = false;
        self.handle = Some(handle);
        self.loaded_at = Some(Instant::now());
        true
    }

    /// Clear a failed attempt so the next load starts fresh.
    pub(crate) fn fail_load(&mut self, ticket: LoadTicket) -> bool {
        if self.ticket != Some(ticket) {
            return false;
        }
        self.ticket = None;
        self.is_loading = false;
        self.handle = None;
        self.loaded_at = None;
        true
    }

    pub(crate) fn set_presenting(&mut self, presenting: bool) {
        self.presenting = presenting;
    }
}

/// Keyed cache of placement slots.
///
/// No eviction: entries live until removed after a presentation ends, or for
/// the lifetime of the registry for reusable placements.
#[derive(Debug, Default)]
pub struct AdSlotRegistry {
    slots: HashMap<PlacementKey, AdSlot>,
    next_ticket: u64,
}

impl AdSlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PlacementKey) -> Option<&AdSlot> {
        self.slots.get(key)
    }

    pub fn get_mut(&mut self, key: &PlacementKey) -> Option<&mut AdSlot> {
        self.slots.get_mut(key)
    }

    /// Insert or replace the slot stored under its own key.
    pub fn put(&mut self, slot: AdSlot) -> Option<AdSlot> {
        self.slots.insert(slot.key.clone(), slot)
    }

    pub fn remove(&mut self, key: &PlacementKey) -> Option<AdSlot> {
        self.slots.remove(key)
    }

    pub fn contains(&self, key: &PlacementKey) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PlacementKey> {
        self.slots.keys()
    }

    pub(crate) fn issue_ticket(&mut self) -> LoadTicket {
        self.next_ticket += 1;
        LoadTicket(self.next_ticket)
    }
}
