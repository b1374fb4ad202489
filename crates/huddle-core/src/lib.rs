//! Huddle meeting core.
//!
//! Pure Rust bookkeeping for the video tile grid and the attendee roster of a
//! meeting client. The transport engine feeds events in; native UI shells read
//! the visible tiles and roster back out via UniFFI bindings.

pub mod errors;
pub mod events;
pub mod pump;
pub mod roster;
pub mod session;
pub mod settings;
pub mod tiles;

pub use errors::HuddleError;
pub use events::{
    AttendeeInfo, ListenerHandle, MeetingEvent, PresentationEvent, PresentationListener,
    SignalStrength, VolumeLevel,
};
pub use pump::{lock_session, shared_session, spawn_event_pump, SharedSession};
pub use roster::{RosterAttendee, RosterDirectory};
pub use session::MeetingSession;
pub use settings::{Settings, SettingsStore};
pub use tiles::{
    TileChange, TileId, TilePauseState, TileRegistry, TileState, DEFAULT_MAX_VISIBLE_TILE_COUNT,
};
