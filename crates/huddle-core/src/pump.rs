use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::MeetingEvent;
use crate::session::MeetingSession;

/// Session shared between the event pump and readers on other threads.
///
/// A plain mutex: it is never held across an await point, and readers on any
/// thread (including listener callbacks) can take it without a runtime.
pub type SharedSession = Arc<Mutex<MeetingSession>>;

pub fn shared_session(session: MeetingSession) -> SharedSession {
    Arc::new(Mutex::new(session))
}

/// Lock the shared session, recovering the state if a previous holder panicked.
pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, MeetingSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drain transport events into `session`, one at a time, in arrival order.
///
/// This task is the only writer. Listeners are notified after the lock is
/// released, so they may query the session from inside their callback. The
/// loop ends once every sender is dropped.
pub fn spawn_event_pump(
    session: SharedSession,
    mut events: mpsc::UnboundedReceiver<MeetingEvent>,
) -> JoinHandle<()> {
    let emitter = lock_session(&session).emitter();
    tokio::spawn(async move {
        let mut handled: u64 = 0;
        while let Some(event) = events.recv().await {
            tracing::trace!("meeting event: {event:?}");
            let notifications = lock_session(&session).handle_event(event);
            for notification in notifications {
                emitter.emit(notification);
            }
            handled += 1;
        }
        tracing::info!("meeting event pump ended after {handled} event(s)");
    })
}
