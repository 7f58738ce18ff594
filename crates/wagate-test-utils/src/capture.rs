// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event sink that records everything it is handed.

use std::sync::Mutex;

use wagate_core::{EventSink, SessionEvent, SessionId, SessionState};

/// [`EventSink`] that appends every published event to a vector.
#[derive(Default)]
pub struct CaptureEventSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl CaptureEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event published so far, in publish order.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The sequence of states a session was reported to pass through.
    pub fn states_of(&self, session_id: &SessionId) -> Vec<SessionState> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::StateChanged {
                    session_id: id,
                    state,
                } if id == session_id => Some(*state),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for CaptureEventSink {
    fn publish(&self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}
