use std::sync::Arc;

use crate::events::{
    EventEmitter, ListenerHandle, MeetingEvent, PresentationEvent, PresentationListener,
};
use crate::roster::{RosterAttendee, RosterDirectory};
use crate::settings::Settings;
use crate::tiles::{TileChange, TileRegistry, TileState};

/// Owns the tile registry and roster of one meeting and routes transport
/// events to them.
///
/// Single writer: callers serialize `handle_event`, either by staying on one
/// context or through [`crate::spawn_event_pump`]. Leaving a meeting means
/// dropping the session.
pub struct MeetingSession {
    tiles: TileRegistry,
    roster: RosterDirectory,
    emitter: EventEmitter,
}

impl MeetingSession {
    pub fn new(settings: &Settings) -> Self {
        Self {
            tiles: TileRegistry::with_capacity(
                settings.max_visible_tile_count,
                settings.local_placeholder,
            ),
            roster: RosterDirectory::new(),
            emitter: EventEmitter::new(),
        }
    }

    /// Register a listener for refresh notifications.
    pub fn add_listener(&self, listener: Arc<dyn PresentationListener>) -> ListenerHandle {
        self.emitter.add_listener(listener)
    }

    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        self.emitter.remove_listener(handle)
    }

    /// Emitter shared with this session's listeners. Holders can notify
    /// without keeping the session borrowed.
    pub fn emitter(&self) -> EventEmitter {
        self.emitter.clone()
    }

    /// Apply `event` and notify listeners right away.
    ///
    /// For callers that own the session on a single context. Shared sessions
    /// go through the event pump, which notifies after releasing the lock.
    pub fn dispatch(&mut self, event: MeetingEvent) {
        for notification in self.handle_event(event) {
            self.emitter.emit(notification);
        }
    }

    /// Apply `event` and return the refresh notifications it produced, in order.
    pub fn handle_event(&mut self, event: MeetingEvent) -> Vec<PresentationEvent> {
        let mut out = Vec::new();
        match event {
            MeetingEvent::TileAdded(tile) => {
                let change = self.tiles.add_tile(tile);
                self.tile_notifications(change, &mut out);
            }

            MeetingEvent::TileRemoved(tile_id) => {
                let change = self.tiles.remove_tile(tile_id);
                self.tile_notifications(change, &mut out);
            }

            MeetingEvent::TilePaused { tile_id, reason } => {
                let change = self.tiles.pause(tile_id, reason);
                self.tile_notifications(change, &mut out);
            }

            MeetingEvent::TileResumed(tile_id) => {
                let change = self.tiles.resume(tile_id);
                self.tile_notifications(change, &mut out);
            }

            MeetingEvent::AttendeesJoined(list) => {
                if self.roster.attendees_joined(&list) > 0 {
                    out.push(PresentationEvent::RosterChanged);
                }
            }

            MeetingEvent::AttendeesLeft(list) => {
                let removed = self.roster.attendees_left(&list);
                self.after_departure(removed, &mut out);
            }

            MeetingEvent::AttendeesDropped(list) => {
                let removed = self.roster.attendees_dropped(&list);
                self.after_departure(removed, &mut out);
            }

            MeetingEvent::VolumeChanged(updates) => {
                let mut changed = false;
                for (attendee_id, level) in updates {
                    changed |= self.roster.update_volume(&attendee_id, level);
                }
                if changed {
                    out.push(PresentationEvent::RosterChanged);
                }
            }

            MeetingEvent::SignalChanged(updates) => {
                let mut changed = false;
                for (attendee_id, level) in updates {
                    changed |= self.roster.update_signal(&attendee_id, level);
                }
                if changed {
                    out.push(PresentationEvent::RosterChanged);
                }
            }

            MeetingEvent::ActiveSpeakersChanged(ids) => {
                self.roster.update_active_speakers(ids.clone());
                out.push(PresentationEvent::ActiveSpeakersChanged(ids));
            }

            MeetingEvent::SessionEnded => {
                tracing::info!("meeting session ended, clearing tiles and roster");
                out.extend(self.clear());
            }
        }
        out
    }

    fn after_departure(&mut self, removed: Vec<String>, out: &mut Vec<PresentationEvent>) {
        if removed.is_empty() {
            return;
        }

        let mut change = TileChange::None;
        for attendee_id in &removed {
            for tile in self.tiles.remove_tiles_for_attendee(attendee_id) {
                let touched = if tile.is_content { TileChange::Content } else { TileChange::Grid };
                change = change.merge(touched);
            }
        }

        out.push(PresentationEvent::RosterChanged);
        self.tile_notifications(change, out);
    }

    fn tile_notifications(&self, change: TileChange, out: &mut Vec<PresentationEvent>) {
        if change.touches_grid() {
            out.push(PresentationEvent::TilesChanged);
        }
        if change.touches_content() {
            out.push(PresentationEvent::ContentShareChanged(self.tiles.content_tile().cloned()));
        }
    }

    pub fn visible_tiles(&self) -> Vec<Option<TileState>> {
        self.tiles.visible_tiles().to_vec()
    }

    pub fn attendee(&self, attendee_id: &str) -> Option<RosterAttendee> {
        self.roster.attendee(attendee_id).cloned()
    }

    pub fn is_active_speaker(&self, attendee_id: &str) -> bool {
        self.roster.is_active_speaker(attendee_id)
    }

    pub fn tiles(&self) -> &TileRegistry {
        &self.tiles
    }

    pub fn roster(&self) -> &RosterDirectory {
        &self.roster
    }

    /// Reset both components. Returns the notifications for the reset.
    pub fn clear(&mut self) -> Vec<PresentationEvent> {
        self.tiles.clear();
        self.roster.clear();
        vec![
            PresentationEvent::TilesChanged,
            PresentationEvent::ContentShareChanged(None),
            PresentationEvent::RosterChanged,
        ]
    }
}

impl Default for MeetingSession {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AttendeeInfo, VolumeLevel};
    use crate::tiles::TilePauseState;
    use std::sync::Mutex;

    struct EventCapture {
        events: Arc<Mutex<Vec<PresentationEvent>>>,
    }

    impl PresentationListener for EventCapture {
        fn on_event(&self, event: PresentationEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn tile_events_notify_grid_refresh() {
        let mut session = MeetingSession::default();
        let out = session.handle_event(MeetingEvent::TileAdded(TileState::remote(1, Some("a"))));
        assert_eq!(out, vec![PresentationEvent::TilesChanged]);

        let out = session.handle_event(MeetingEvent::TilePaused {
            tile_id: 1,
            reason: TilePauseState::PausedForPoorConnection,
        });
        assert_eq!(out, vec![PresentationEvent::TilesChanged]);
        assert_eq!(session.visible_tiles().len(), 1);
    }

    #[test]
    fn content_events_notify_content_refresh() {
        let mut session = MeetingSession::default();
        let content = TileState::content(5, Some("a"));
        let out = session.handle_event(MeetingEvent::TileAdded(content.clone()));
        assert_eq!(out, vec![PresentationEvent::ContentShareChanged(Some(content))]);
        assert!(session.visible_tiles().is_empty());

        let out = session.handle_event(MeetingEvent::TileRemoved(5));
        assert_eq!(out, vec![PresentationEvent::ContentShareChanged(None)]);
    }

    #[test]
    fn inconsistent_tile_event_is_silent() {
        let mut session = MeetingSession::default();
        assert!(session.handle_event(MeetingEvent::TileRemoved(99)).is_empty());
        assert!(session.handle_event(MeetingEvent::TileResumed(99)).is_empty());
    }

    #[test]
    fn departure_removes_roster_entry_and_tiles() {
        let mut session = MeetingSession::default();
        let alice = AttendeeInfo::new("a1", "x#Alice");
        session.handle_event(MeetingEvent::AttendeesJoined(vec![alice.clone()]));
        session.handle_event(MeetingEvent::TileAdded(TileState::remote(3, Some("a1"))));
        session.handle_event(MeetingEvent::TileAdded(TileState::content(4, Some("a1"))));

        let out = session.handle_event(MeetingEvent::AttendeesDropped(vec![alice]));

        assert!(session.attendee("a1").is_none());
        assert!(session.visible_tiles().is_empty());
        assert_eq!(session.tiles().position_of(3), None);
        assert_eq!(
            out,
            vec![
                PresentationEvent::RosterChanged,
                PresentationEvent::TilesChanged,
                PresentationEvent::ContentShareChanged(None),
            ]
        );
    }

    #[test]
    fn unknown_volume_updates_do_not_notify() {
        let mut session = MeetingSession::default();
        let out = session
            .handle_event(MeetingEvent::VolumeChanged(vec![("ghost".into(), VolumeLevel::High)]));
        assert!(out.is_empty());
    }

    #[test]
    fn handle_event_does_not_notify_listeners() {
        let mut session = MeetingSession::default();
        let events = Arc::new(Mutex::new(Vec::new()));
        session.add_listener(Arc::new(EventCapture { events: events.clone() }));

        let out = session.handle_event(MeetingEvent::TileAdded(TileState::remote(1, None)));
        assert_eq!(out.len(), 1);
        assert!(events.lock().unwrap().is_empty());

        session.emitter().emit(out[0].clone());
        assert_eq!(*events.lock().unwrap(), vec![PresentationEvent::TilesChanged]);
    }

    #[test]
    fn dispatch_notifies_listeners() {
        let mut session = MeetingSession::default();
        let events = Arc::new(Mutex::new(Vec::new()));
        session.add_listener(Arc::new(EventCapture { events: events.clone() }));

        session.dispatch(MeetingEvent::ActiveSpeakersChanged(vec!["a".into(), "b".into()]));
        session.dispatch(MeetingEvent::ActiveSpeakersChanged(vec!["b".into()]));

        assert!(!session.is_active_speaker("a"));
        assert!(session.is_active_speaker("b"));
        assert_eq!(
            events.lock().unwrap().last(),
            Some(&PresentationEvent::ActiveSpeakersChanged(vec!["b".into()]))
        );
    }

    #[test]
    fn session_ended_clears_everything() {
        let mut session = MeetingSession::default();
        session.handle_event(MeetingEvent::AttendeesJoined(vec![AttendeeInfo::new("a", "A")]));
        session.handle_event(MeetingEvent::TileAdded(TileState::local(1, Some("me"))));
        session.handle_event(MeetingEvent::TileAdded(TileState::content(2, Some("a"))));

        let out = session.handle_event(MeetingEvent::SessionEnded);

        assert!(session.visible_tiles().is_empty());
        assert!(session.tiles().content_tile().is_none());
        assert_eq!(session.roster().attendee_count(), 0);
        assert!(out.contains(&PresentationEvent::ContentShareChanged(None)));
    }

    #[test]
    fn settings_drive_capacity() {
        let settings = Settings {
            max_visible_tile_count: 4,
            ..Settings::default()
        };
        let mut session = MeetingSession::new(&settings);
        for id in 0..6 {
            session.handle_event(MeetingEvent::TileAdded(TileState::remote(id, None)));
        }
        assert_eq!(session.visible_tiles().len(), 4);
        assert_eq!(session.tiles().hidden_tile_count(), 2);
    }
}
