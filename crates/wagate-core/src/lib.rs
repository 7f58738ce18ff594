// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Wagate messaging gateway.
//!
//! This crate provides the shared types, the error taxonomy, and the traits
//! behind which the gateway's external collaborators live: the wire client
//! library, the credential store, and the event fanout boundary.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::WagateError;
pub use types::{
    classify, CauseClass, CreateOutcome, Credentials, DisconnectCause, MediaKind, MessageId,
    Payload, Presence, QueueStatus, SessionEvent, SessionId, SessionState, SessionStatus, Target,
    TaskId, TaskOutcome, WireEvent,
};

pub use traits::{
    CredentialStore, EventSink, NullEventSink, WireConnection, WireConnector, WireHandle,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _ = WagateError::SessionNotFound(SessionId("a".into()));
        let _ = WagateError::SessionExists(SessionId("a".into()));
        let _ = WagateError::HandshakeTimeout {
            duration: std::time::Duration::from_secs(60),
        };
        let _ = WagateError::TerminalDisconnect {
            cause: DisconnectCause::LOGGED_OUT,
        };
        let _ = WagateError::ReconnectExhausted { attempts: 3 };
        let _ = WagateError::Transmission {
            message: "nope".into(),
        };
        let _ = WagateError::Config("bad".into());
        let _ = WagateError::ChallengeEncoding("overflow".into());
        let _ = WagateError::Internal("oops".into());
    }

    #[test]
    fn state_round_trips_through_strings() {
        use std::str::FromStr;

        for state in [
            SessionState::Uninitialized,
            SessionState::AwaitingHandshake,
            SessionState::Connected,
            SessionState::Reconnecting,
            SessionState::Closed,
            SessionState::Failed,
        ] {
            let s = state.to_string();
            let parsed = SessionState::from_str(&s).expect("should parse back");
            assert_eq!(state, parsed);
        }
    }

    #[test]
    fn null_sink_accepts_events() {
        let sink = NullEventSink;
        sink.publish(SessionEvent::Connected {
            session_id: SessionId("s1".into()),
        });
    }
}
