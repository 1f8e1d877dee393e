//! A session: identity, state, and the append-only event log.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use super::state::{read_lock, write_lock, SessionState};
use crate::types::Event;

/// One conversation's durable record.
///
/// Appends are serialized under the log lock: timestamps in the log strictly
/// increase, and each event's state delta is merged before the next append
/// can observe the log.
#[derive(Debug)]
pub struct Session {
    app_name: String,
    user_id: String,
    id: String,
    state: SessionState,
    events: RwLock<Vec<Event>>,
}

impl Session {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self::with_state(app_name, user_id, id, SessionState::new())
    }

    pub fn with_state(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        id: impl Into<String>,
        state: SessionState,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            id: id.into(),
            state,
            events: RwLock::new(Vec::new()),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Append an event to the log and merge its state delta.
    ///
    /// Partial events are streaming previews and are never recorded; the
    /// return value tells whether the event was appended.
    pub fn append_event(&self, mut event: Event) -> bool {
        if event.partial {
            return false;
        }
        let mut events = write_lock(&self.events);
        if let Some(last) = events.last() {
            if event.timestamp <= last.timestamp {
                event.timestamp = last.timestamp + Duration::nanoseconds(1);
            }
        }
        self.state.apply_delta(&event.actions.state_delta);
        tracing::debug!(
            session_id = %self.id,
            event_id = %event.id,
            author = %event.author,
            invocation_id = %event.invocation_id,
            "event appended"
        );
        events.push(event);
        true
    }

    /// Snapshot of the log.
    pub fn events(&self) -> Vec<Event> {
        read_lock(&self.events).clone()
    }

    pub fn event_count(&self) -> usize {
        read_lock(&self.events).len()
    }

    pub fn last_event(&self) -> Option<Event> {
        read_lock(&self.events).last().cloned()
    }

    /// Timestamp of the latest event, if any.
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        read_lock(&self.events).last().map(|event| event.timestamp)
    }
}
