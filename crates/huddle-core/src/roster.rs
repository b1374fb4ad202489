use crate::events::{AttendeeInfo, SignalStrength, VolumeLevel};

/// One joined meeting participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterAttendee {
    pub attendee_id: String,
    pub attendee_name: String,
    pub volume: VolumeLevel,
    pub signal: SignalStrength,
}

impl RosterAttendee {
    fn joined(info: &AttendeeInfo) -> Self {
        Self {
            attendee_id: info.attendee_id.clone(),
            attendee_name: display_name_from_external_id(&info.external_user_id).to_string(),
            volume: VolumeLevel::NotSpeaking,
            signal: SignalStrength::High,
        }
    }

    pub fn is_muted(&self) -> bool {
        self.volume == VolumeLevel::Muted
    }
}

/// Derive a display name from an external user id of the form `<opaque>#<name>`.
///
/// Falls back to the whole id when there is no non-empty suffix.
pub fn display_name_from_external_id(external_user_id: &str) -> &str {
    match external_user_id.rsplit_once('#') {
        Some((_, name)) if !name.trim().is_empty() => name,
        _ => external_user_id,
    }
}

/// Attendee directory keyed by attendee id, independent of video tiles.
///
/// Best-effort mirror of the transport's view: events referencing unknown
/// ids are logged and skipped, never rejected.
#[derive(Debug, Clone, Default)]
pub struct RosterDirectory {
    attendees: Vec<RosterAttendee>,
    active_speakers: Vec<String>,
}

impl RosterDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add attendees not already present. Returns how many were added.
    pub fn attendees_joined(&mut self, list: &[AttendeeInfo]) -> usize {
        let mut added = 0;
        for info in list {
            if self.attendee(&info.attendee_id).is_some() {
                tracing::debug!("attendee {} already joined, skipping", info.attendee_id);
                continue;
            }
            let attendee = RosterAttendee::joined(info);
            tracing::info!("attendee joined: {} ({})", attendee.attendee_id, attendee.attendee_name);
            self.attendees.push(attendee);
            added += 1;
        }
        added
    }

    pub fn attendees_left(&mut self, list: &[AttendeeInfo]) -> Vec<String> {
        self.remove_attendees(list, "left")
    }

    pub fn attendees_dropped(&mut self, list: &[AttendeeInfo]) -> Vec<String> {
        self.remove_attendees(list, "dropped")
    }

    fn remove_attendees(&mut self, list: &[AttendeeInfo], reason: &str) -> Vec<String> {
        let mut removed = Vec::with_capacity(list.len());
        for info in list {
            let id = info.attendee_id.as_str();
            let Some(index) = self.attendees.iter().position(|a| a.attendee_id == id) else {
                tracing::warn!("attendee {id} {reason} but was never joined, ignoring");
                continue;
            };
            self.attendees.remove(index);
            self.active_speakers.retain(|s| s != id);
            tracing::info!("attendee {reason}: {id}");
            removed.push(id.to_string());
        }
        removed
    }

    /// Returns false when the attendee is unknown.
    pub fn update_volume(&mut self, attendee_id: &str, level: VolumeLevel) -> bool {
        match self.attendee_mut(attendee_id) {
            Some(a) => {
                a.volume = level;
                true
            }
            None => {
                tracing::warn!("volume update for unknown attendee {attendee_id}, ignoring");
                false
            }
        }
    }

    /// Returns false when the attendee is unknown.
    pub fn update_signal(&mut self, attendee_id: &str, level: SignalStrength) -> bool {
        match self.attendee_mut(attendee_id) {
            Some(a) => {
                a.signal = level;
                true
            }
            None => {
                tracing::warn!("signal update for unknown attendee {attendee_id}, ignoring");
                false
            }
        }
    }

    /// Replace the active-speaker set.
    pub fn update_active_speakers(&mut self, attendee_ids: Vec<String>) {
        self.active_speakers = attendee_ids;
    }

    pub fn is_active_speaker(&self, attendee_id: &str) -> bool {
        self.active_speakers.iter().any(|s| s == attendee_id)
    }

    pub fn active_speakers(&self) -> &[String] {
        &self.active_speakers
    }

    pub fn attendee(&self, attendee_id: &str) -> Option<&RosterAttendee> {
        self.attendees.iter().find(|a| a.attendee_id == attendee_id)
    }

    fn attendee_mut(&mut self, attendee_id: &str) -> Option<&mut RosterAttendee> {
        self.attendees.iter_mut().find(|a| a.attendee_id == attendee_id)
    }

    pub fn name_for(&self, attendee_id: &str) -> Option<&str> {
        self.attendee(attendee_id).map(|a| a.attendee_name.as_str())
    }

    /// Attendees in join order.
    pub fn attendees(&self) -> &[RosterAttendee] {
        &self.attendees
    }

    /// Attendees ordered for the roster list: by name, then id.
    pub fn sorted_by_name(&self) -> Vec<RosterAttendee> {
        let mut sorted = self.attendees.clone();
        sorted.sort_by(|a, b| {
            a.attendee_name
                .to_lowercase()
                .cmp(&b.attendee_name.to_lowercase())
                .then_with(|| a.attendee_id.cmp(&b.attendee_id))
        });
        sorted
    }

    pub fn attendee_count(&self) -> usize {
        self.attendees.len()
    }

    pub fn clear(&mut self) {
        self.attendees.clear();
        self.active_speakers.clear();
    }
}
