// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast fanout for lifecycle and delivery events.

use tokio::sync::broadcast;
use tracing::trace;

use wagate_core::{EventSink, SessionEvent};

/// Fans every published [`SessionEvent`] out to all subscribers.
///
/// Publishing never blocks; a subscriber that falls behind the channel
/// capacity observes a lag error and misses events, which is the broadcast
/// contract downstream consumers sign up for.
pub struct EventFanout {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventFanout {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventFanout { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventFanout {
    fn default() -> Self {
        EventFanout::new(256)
    }
}

impl EventSink for EventFanout {
    fn publish(&self, event: SessionEvent) {
        trace!(?event, "fanout");
        // No subscribers is fine; events are advisory.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagate_core::{SessionId, SessionState};

    #[tokio::test]
    async fn every_subscriber_sees_the_event() {
        let fanout = EventFanout::default();
        let mut a = fanout.subscribe();
        let mut b = fanout.subscribe();

        fanout.publish(SessionEvent::StateChanged {
            session_id: SessionId("s1".into()),
            state: SessionState::Connected,
        });

        for rx in [&mut a, &mut b] {
            match rx.recv().await.unwrap() {
                SessionEvent::StateChanged { state, .. } => {
                    assert_eq!(state, SessionState::Connected);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let fanout = EventFanout::default();
        fanout.publish(SessionEvent::Connected {
            session_id: SessionId("s1".into()),
        });
    }
}
