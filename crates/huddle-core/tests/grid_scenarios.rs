use huddle_core::{
    AttendeeInfo, MeetingEvent, MeetingSession, RosterDirectory, TileRegistry, TileState,
    VolumeLevel, DEFAULT_MAX_VISIBLE_TILE_COUNT,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn visible_ids(session: &MeetingSession) -> Vec<Option<u32>> {
    session
        .visible_tiles()
        .iter()
        .map(|slot| slot.as_ref().map(|t| t.tile_id))
        .collect()
}

#[test]
fn seventeen_remotes_without_local_show_first_sixteen() {
    let mut session = MeetingSession::default();
    for id in 1..=17 {
        session.handle_event(MeetingEvent::TileAdded(TileState::remote(id, Some("r"))));
    }
    let expected: Vec<_> = (1..=16).map(Some).collect();
    assert_eq!(visible_ids(&session), expected);
    assert_eq!(session.tiles().hidden_tile_count(), 1);
}

#[test]
fn local_plus_sixteen_remotes_shows_local_and_first_fifteen() {
    let mut session = MeetingSession::default();
    session.handle_event(MeetingEvent::TileAdded(TileState::local(100, Some("me"))));
    for id in 1..=16 {
        session.handle_event(MeetingEvent::TileAdded(TileState::remote(id, None)));
    }
    let ids = visible_ids(&session);
    assert_eq!(ids.len(), 16);
    assert_eq!(ids[0], Some(100));
    let remotes: Vec<_> = (1..=15).map(Some).collect();
    assert_eq!(&ids[1..], remotes.as_slice());
    assert_eq!(session.tiles().position_of(16), None);
}

#[test]
fn bob_leaves_and_later_volume_update_is_noop() {
    let mut session = MeetingSession::default();
    let bob = AttendeeInfo::new("bob", "0a1b#Bob");
    session.handle_event(MeetingEvent::AttendeesJoined(vec![bob.clone()]));
    session.handle_event(MeetingEvent::VolumeChanged(vec![("bob".into(), VolumeLevel::High)]));
    assert_eq!(session.attendee("bob").unwrap().volume, VolumeLevel::High);

    session.handle_event(MeetingEvent::AttendeesLeft(vec![bob]));
    assert!(session.attendee("bob").is_none());

    session.handle_event(MeetingEvent::VolumeChanged(vec![("bob".into(), VolumeLevel::Low)]));
    assert!(session.attendee("bob").is_none());
    assert_eq!(session.roster().attendee_count(), 0);
}

#[test]
fn repeated_joins_keep_one_entry() {
    let mut roster = RosterDirectory::new();
    let a = AttendeeInfo::new("A", "A");
    roster.attendees_joined(&[a.clone(), a.clone()]);
    roster.attendees_joined(&[a]);
    assert_eq!(roster.attendee_count(), 1);
}

#[test]
fn active_speaker_set_is_replaced() {
    let mut roster = RosterDirectory::new();
    roster.update_active_speakers(vec!["A".into(), "B".into()]);
    roster.update_active_speakers(vec!["B".into()]);
    assert!(!roster.is_active_speaker("A"));
    assert!(roster.is_active_speaker("B"));
}

#[test]
fn random_add_remove_sequences_respect_capacity() {
    let mut rng = StdRng::seed_from_u64(0x7113);
    let mut registry = TileRegistry::new();
    let mut bound: Vec<u32> = Vec::new();
    let mut local_bound = false;

    for _ in 0..2_000 {
        match rng.gen_range(0..10) {
            0 => {
                registry.add_tile(TileState::local(1_000, Some("me")));
                local_bound = true;
            }
            1 => {
                registry.remove_tile(1_000);
                local_bound = false;
            }
            2..=5 => {
                let id = rng.gen_range(0..40);
                registry.add_tile(TileState::remote(id, None));
                if !bound.contains(&id) {
                    bound.push(id);
                }
            }
            _ => {
                if bound.is_empty() {
                    continue;
                }
                let id = bound.remove(rng.gen_range(0..bound.len()));
                registry.remove_tile(id);
                assert_eq!(registry.position_of(id), None);
            }
        }

        let visible = registry.visible_tiles();
        assert!(visible.len() <= DEFAULT_MAX_VISIBLE_TILE_COUNT);

        let budget = registry.capacity_for(local_bound);
        let remote_visible = visible.iter().flatten().filter(|t| !t.is_local_tile).count();
        assert_eq!(remote_visible, bound.len().min(budget));
        if local_bound {
            assert_eq!(budget, DEFAULT_MAX_VISIBLE_TILE_COUNT - 1);
            assert_eq!(registry.position_of(1_000), Some(0));
        } else {
            assert_eq!(budget, DEFAULT_MAX_VISIBLE_TILE_COUNT);
        }

        // arrival order is preserved among visible remotes
        let shown: Vec<u32> = visible
            .iter()
            .flatten()
            .filter(|t| !t.is_local_tile)
            .map(|t| t.tile_id)
            .collect();
        assert_eq!(shown.as_slice(), &bound[..shown.len()]);
    }
}
