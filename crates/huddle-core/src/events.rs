use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

use crate::tiles::{TileId, TilePauseState, TileState};

/// Events delivered by the transport engine, already marshalled onto the
/// session's writer context.
#[derive(Debug, Clone)]
pub enum MeetingEvent {
    TileAdded(TileState),
    TileRemoved(TileId),
    TilePaused { tile_id: TileId, reason: TilePauseState },
    TileResumed(TileId),
    AttendeesJoined(Vec<AttendeeInfo>),
    AttendeesLeft(Vec<AttendeeInfo>),
    AttendeesDropped(Vec<AttendeeInfo>),
    VolumeChanged(Vec<(String, VolumeLevel)>),
    SignalChanged(Vec<(String, SignalStrength)>),
    ActiveSpeakersChanged(Vec<String>), // attendee ids
    /// The local client left the meeting: all tiles and attendees are dropped.
    SessionEnded,
}

/// Attendee identity as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeInfo {
    pub attendee_id: String,
    pub external_user_id: String,
}

impl AttendeeInfo {
    pub fn new(attendee_id: impl Into<String>, external_user_id: impl Into<String>) -> Self {
        Self {
            attendee_id: attendee_id.into(),
            external_user_id: external_user_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeLevel {
    Muted,
    NotSpeaking,
    Low,
    Medium,
    High,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStrength {
    Low,
    Medium,
    High,
}

/// Refresh notifications for the presentation layer.
///
/// Listeners re-query the session after receiving one; the payloads are hints.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    TilesChanged,
    ContentShareChanged(Option<TileState>),
    RosterChanged,
    ActiveSpeakersChanged(Vec<String>),
}

/// Trait for receiving refresh notifications from the core.
/// Implementations must be Send + Sync (the event pump runs on tokio tasks).
pub trait PresentationListener: Send + Sync {
    fn on_event(&self, event: PresentationEvent);
}

/// Token returned by [`EventEmitter::add_listener`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(Uuid);

impl ListenerHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

type ListenerList = Vec<(ListenerHandle, Arc<dyn PresentationListener>)>;

/// Dispatches presentation events to registered listeners.
#[derive(Clone)]
pub struct EventEmitter {
    listeners: Arc<RwLock<ListenerList>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn PresentationListener>) -> ListenerHandle {
        let handle = ListenerHandle::new();
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((handle, listener));
        handle
    }

    /// Returns false if the handle was never issued or is already removed.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(h, _)| *h != handle);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn emit(&self, event: PresentationEvent) {
        // Snapshot so a listener may unsubscribe from inside its callback.
        let listeners: Vec<_> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener.on_event(event.clone());
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
