//! UniFFI bindings for huddle-core.
//!
//! Provides a MeetingClient object that wraps a MeetingSession, its event
//! pump and the settings store into a single FFI-safe interface.

use std::sync::Arc;

use huddle_core::{
    self, lock_session, shared_session, AttendeeInfo as CoreAttendeeInfo, ListenerHandle,
    MeetingEvent, MeetingSession, PresentationEvent as CorePresentationEvent, RosterAttendee as CoreRosterAttendee,
    SharedSession, SignalStrength as CoreSignalStrength, TilePauseState as CoreTilePauseState,
    TileState as CoreTileState, VolumeLevel as CoreVolumeLevel,
};
use tokio::sync::mpsc;

uniffi::include_scaffolding!("huddle");

const DEFAULT_LOG_FILTER: &str = "huddle_core=debug,huddle_ffi=debug";

// ── Namespace functions ──────────────────────────────────────────────

/// Initialize tracing/logging. Call once from the host before using MeetingClient.
///
/// `filter` overrides `RUST_LOG`; hosts usually pass `Settings.log_filter`.
fn init_logging(filter: Option<String>) {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let env_filter = filter
            .and_then(|f| tracing_subscriber::EnvFilter::try_new(f).ok())
            .or_else(|| tracing_subscriber::EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .init();
    });
}

// ── FFI-safe type conversions ──────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum TilePauseState {
    Unpaused,
    PausedByUserRequest,
    PausedForPoorConnection,
}

impl From<CoreTilePauseState> for TilePauseState {
    fn from(s: CoreTilePauseState) -> Self {
        match s {
            CoreTilePauseState::Unpaused => Self::Unpaused,
            CoreTilePauseState::PausedByUserRequest => Self::PausedByUserRequest,
            CoreTilePauseState::PausedForPoorConnection => Self::PausedForPoorConnection,
        }
    }
}

impl From<TilePauseState> for CoreTilePauseState {
    fn from(s: TilePauseState) -> Self {
        match s {
            TilePauseState::Unpaused => Self::Unpaused,
            TilePauseState::PausedByUserRequest => Self::PausedByUserRequest,
            TilePauseState::PausedForPoorConnection => Self::PausedForPoorConnection,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum VolumeLevel {
    Muted,
    NotSpeaking,
    Low,
    Medium,
    High,
    Unknown,
}

impl From<CoreVolumeLevel> for VolumeLevel {
    fn from(v: CoreVolumeLevel) -> Self {
        match v {
            CoreVolumeLevel::Muted => Self::Muted,
            CoreVolumeLevel::NotSpeaking => Self::NotSpeaking,
            CoreVolumeLevel::Low => Self::Low,
            CoreVolumeLevel::Medium => Self::Medium,
            CoreVolumeLevel::High => Self::High,
            CoreVolumeLevel::Unknown => Self::Unknown,
        }
    }
}

impl From<VolumeLevel> for CoreVolumeLevel {
    fn from(v: VolumeLevel) -> Self {
        match v {
            VolumeLevel::Muted => Self::Muted,
            VolumeLevel::NotSpeaking => Self::NotSpeaking,
            VolumeLevel::Low => Self::Low,
            VolumeLevel::Medium => Self::Medium,
            VolumeLevel::High => Self::High,
            VolumeLevel::Unknown => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum SignalStrength {
    Low,
    Medium,
    High,
}

impl From<CoreSignalStrength> for SignalStrength {
    fn from(s: CoreSignalStrength) -> Self {
        match s {
            CoreSignalStrength::Low => Self::Low,
            CoreSignalStrength::Medium => Self::Medium,
            CoreSignalStrength::High => Self::High,
        }
    }
}

impl From<SignalStrength> for CoreSignalStrength {
    fn from(s: SignalStrength) -> Self {
        match s {
            SignalStrength::Low => Self::Low,
            SignalStrength::Medium => Self::Medium,
            SignalStrength::High => Self::High,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TileInfo {
    pub tile_id: u32,
    pub attendee_id: Option<String>,
    pub is_local_tile: bool,
    pub is_content: bool,
    pub pause_state: TilePauseState,
}

impl From<CoreTileState> for TileInfo {
    fn from(t: CoreTileState) -> Self {
        Self {
            tile_id: t.tile_id,
            attendee_id: t.attendee_id,
            is_local_tile: t.is_local_tile,
            is_content: t.is_content,
            pause_state: t.pause_state.into(),
        }
    }
}

impl From<TileInfo> for CoreTileState {
    fn from(t: TileInfo) -> Self {
        Self {
            tile_id: t.tile_id,
            attendee_id: t.attendee_id,
            is_local_tile: t.is_local_tile,
            is_content: t.is_content,
            pause_state: t.pause_state.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttendeeInfo {
    pub attendee_id: String,
    pub external_user_id: String,
}

impl From<AttendeeInfo> for CoreAttendeeInfo {
    fn from(a: AttendeeInfo) -> Self {
        CoreAttendeeInfo::new(a.attendee_id, a.external_user_id)
    }
}

#[derive(Debug, Clone)]
pub struct VolumeUpdate {
    pub attendee_id: String,
    pub level: VolumeLevel,
}

#[derive(Debug, Clone)]
pub struct SignalUpdate {
    pub attendee_id: String,
    pub level: SignalStrength,
}

#[derive(Debug, Clone)]
pub struct RosterAttendee {
    pub attendee_id: String,
    pub attendee_name: String,
    pub volume: VolumeLevel,
    pub signal: SignalStrength,
    pub is_active_speaker: bool,
}

impl RosterAttendee {
    fn from_core(a: CoreRosterAttendee, is_active_speaker: bool) -> Self {
        Self {
            attendee_id: a.attendee_id,
            attendee_name: a.attendee_name,
            volume: a.volume.into(),
            signal: a.signal.into(),
            is_active_speaker,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub max_visible_tile_count: u32,
    pub local_placeholder: bool,
    pub log_filter: Option<String>,
}

impl From<huddle_core::Settings> for Settings {
    fn from(s: huddle_core::Settings) -> Self {
        Self {
            max_visible_tile_count: u32::try_from(s.max_visible_tile_count).unwrap_or(u32::MAX),
            local_placeholder: s.local_placeholder,
            log_filter: s.log_filter,
        }
    }
}

#[derive(Debug, Clone)]
pub enum PresentationEvent {
    TilesChanged,
    ContentShareChanged { tile: Option<TileInfo> },
    RosterChanged,
    ActiveSpeakersChanged { attendee_ids: Vec<String> },
}

impl From<CorePresentationEvent> for PresentationEvent {
    fn from(e: CorePresentationEvent) -> Self {
        match e {
            CorePresentationEvent::TilesChanged => Self::TilesChanged,
            CorePresentationEvent::ContentShareChanged(tile) => {
                Self::ContentShareChanged { tile: tile.map(TileInfo::from) }
            }
            CorePresentationEvent::RosterChanged => Self::RosterChanged,
            CorePresentationEvent::ActiveSpeakersChanged(ids) => {
                Self::ActiveSpeakersChanged { attendee_ids: ids }
            }
        }
    }
}

// ── Error conversion ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum HuddleError {
    #[error("Config error: {msg}")]
    Config { msg: String },
    #[error("I/O error: {msg}")]
    Io { msg: String },
}

impl From<huddle_core::HuddleError> for HuddleError {
    fn from(e: huddle_core::HuddleError) -> Self {
        tracing::error!("HuddleError: {e}");
        match e {
            huddle_core::HuddleError::Config(msg) => Self::Config { msg },
            huddle_core::HuddleError::Io(err) => Self::Io { msg: err.to_string() },
        }
    }
}

// ── Callback interface ────────────────────────────────────────────────

/// Called on the event pump's worker thread, after the event is applied and
/// with no session lock held. Listeners may query the client from inside the
/// callback; UI work still belongs on the host's main thread.
pub trait PresentationListener: Send + Sync {
    fn on_event(&self, event: PresentationEvent);
}

// ── Bridge listener: FFI callback → core listener ─────────────────────

struct BridgeListener {
    ffi_listener: Arc<dyn PresentationListener>,
}

impl huddle_core::PresentationListener for BridgeListener {
    fn on_event(&self, event: CorePresentationEvent) {
        self.ffi_listener.on_event(event.into());
    }
}

// ── MeetingClient: main FFI object ────────────────────────────────────

/// Transport callbacks may arrive on any platform thread; they are queued to
/// the session's event pump and applied in order. Queries read the session
/// directly and never block on the pump, so hosts should re-query after a
/// PresentationEvent.
pub struct MeetingClient {
    session: SharedSession,
    events: mpsc::UnboundedSender<MeetingEvent>,
    settings: huddle_core::SettingsStore,
    // Drives the event pump; queries do not enter it.
    _rt: tokio::runtime::Runtime,
}

impl MeetingClient {
    /// Tile settings are read once here; changes apply to the next client.
    pub fn new(data_dir: String) -> Self {
        let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
        let settings = huddle_core::SettingsStore::new(&data_dir);
        let session: SharedSession = shared_session(MeetingSession::new(&settings.get()));

        let (events, rx) = mpsc::unbounded_channel();
        {
            let _guard = rt.enter();
            huddle_core::spawn_event_pump(session.clone(), rx);
        }

        tracing::info!("MeetingClient created (data_dir={data_dir})");
        Self {
            session,
            events,
            settings,
            _rt: rt,
        }
    }

    fn send(&self, event: MeetingEvent) {
        if let Err(e) = self.events.send(event) {
            tracing::warn!("event pump stopped, dropping {:?}", e.0);
        }
    }

    pub fn tile_added(&self, tile: TileInfo) {
        self.send(MeetingEvent::TileAdded(tile.into()));
    }

    /// Only `tile.tile_id` identifies the tile to remove.
    pub fn tile_removed(&self, tile: TileInfo) {
        self.send(MeetingEvent::TileRemoved(tile.tile_id));
    }

    pub fn tile_paused(&self, tile_id: u32, reason: TilePauseState) {
        self.send(MeetingEvent::TilePaused { tile_id, reason: reason.into() });
    }

    pub fn tile_resumed(&self, tile_id: u32) {
        self.send(MeetingEvent::TileResumed(tile_id));
    }

    pub fn attendees_joined(&self, attendees: Vec<AttendeeInfo>) {
        self.send(MeetingEvent::AttendeesJoined(convert_attendees(attendees)));
    }

    pub fn attendees_left(&self, attendees: Vec<AttendeeInfo>) {
        self.send(MeetingEvent::AttendeesLeft(convert_attendees(attendees)));
    }

    pub fn attendees_dropped(&self, attendees: Vec<AttendeeInfo>) {
        self.send(MeetingEvent::AttendeesDropped(convert_attendees(attendees)));
    }

    pub fn volume_changed(&self, updates: Vec<VolumeUpdate>) {
        let updates = updates
            .into_iter()
            .map(|u| (u.attendee_id, u.level.into()))
            .collect();
        self.send(MeetingEvent::VolumeChanged(updates));
    }

    pub fn signal_changed(&self, updates: Vec<SignalUpdate>) {
        let updates = updates
            .into_iter()
            .map(|u| (u.attendee_id, u.level.into()))
            .collect();
        self.send(MeetingEvent::SignalChanged(updates));
    }

    pub fn active_speakers_changed(&self, attendee_ids: Vec<String>) {
        self.send(MeetingEvent::ActiveSpeakersChanged(attendee_ids));
    }

    pub fn visible_tiles(&self) -> Vec<Option<TileInfo>> {
        lock_session(&self.session)
            .visible_tiles()
            .into_iter()
            .map(|slot| slot.map(TileInfo::from))
            .collect()
    }

    pub fn content_tile(&self) -> Option<TileInfo> {
        let session = lock_session(&self.session);
        session.tiles().content_tile().cloned().map(TileInfo::from)
    }

    pub fn position_of(&self, tile_id: u32) -> Option<u32> {
        let session = lock_session(&self.session);
        session
            .tiles()
            .position_of(tile_id)
            .and_then(|p| u32::try_from(p).ok())
    }

    pub fn attendee(&self, attendee_id: String) -> Option<RosterAttendee> {
        let session = lock_session(&self.session);
        let active = session.is_active_speaker(&attendee_id);
        session
            .attendee(&attendee_id)
            .map(|a| RosterAttendee::from_core(a, active))
    }

    pub fn is_active_speaker(&self, attendee_id: String) -> bool {
        lock_session(&self.session).is_active_speaker(&attendee_id)
    }

    /// Roster in display order.
    pub fn roster(&self) -> Vec<RosterAttendee> {
        let session = lock_session(&self.session);
        let roster = session.roster();
        roster
            .sorted_by_name()
            .into_iter()
            .map(|a| {
                let active = roster.is_active_speaker(&a.attendee_id);
                RosterAttendee::from_core(a, active)
            })
            .collect()
    }

    pub fn add_listener(&self, listener: Box<dyn PresentationListener>) -> String {
        let bridge = Arc::new(BridgeListener {
            ffi_listener: Arc::from(listener),
        });
        lock_session(&self.session).add_listener(bridge).to_string()
    }

    pub fn remove_listener(&self, handle: String) -> bool {
        let Some(handle) = ListenerHandle::parse(&handle) else {
            tracing::warn!("remove_listener: malformed handle {handle:?}");
            return false;
        };
        lock_session(&self.session).remove_listener(handle)
    }

    /// Forget all tiles and attendees of the current meeting.
    ///
    /// Queued behind any transport events already sent, so none of them can
    /// repopulate the session afterwards.
    pub fn leave(&self) {
        self.send(MeetingEvent::SessionEnded);
    }

    pub fn get_settings(&self) -> Settings {
        self.settings.get().into()
    }

    pub fn set_max_visible_tile_count(&self, count: u32) -> Result<(), HuddleError> {
        let count = usize::try_from(count)
            .map_err(|e| HuddleError::Config { msg: e.to_string() })?;
        Ok(self.settings.set_max_visible_tile_count(count)?)
    }

    pub fn set_local_placeholder(&self, enabled: bool) -> Result<(), HuddleError> {
        Ok(self.settings.set_local_placeholder(enabled)?)
    }

    pub fn set_log_filter(&self, filter: Option<String>) -> Result<(), HuddleError> {
        Ok(self.settings.set_log_filter(filter)?)
    }
}

fn convert_attendees(attendees: Vec<AttendeeInfo>) -> Vec<CoreAttendeeInfo> {
    attendees.into_iter().map(CoreAttendeeInfo::from).collect()
}
