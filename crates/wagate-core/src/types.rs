// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Wagate workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique, caller-supplied identifier for a gateway session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

/// Unique identifier for an outbound delivery task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned to a transmitted message by the wire network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A wire-level recipient address: an individual or a group JID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target(pub String);

/// Suffix the wire network uses for individual recipients.
const USER_SUFFIX: &str = "@s.whatsapp.net";
/// Suffix the wire network uses for group recipients.
const GROUP_SUFFIX: &str = "@g.us";

impl Target {
    /// Normalizes a raw phone number into an individual target address.
    ///
    /// Strips every non-digit character, rewrites a local `08` prefix to the
    /// default `628` country form, and prepends `62` when no country code is
    /// present. Inputs longer than 15 digits are treated as group ids.
    pub fn from_phone(raw: &str) -> Target {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.len() > 15 {
            return Target::from_group(raw);
        }

        let normalized = if let Some(rest) = digits.strip_prefix("08") {
            format!("628{rest}")
        } else if digits.starts_with("62") {
            digits
        } else {
            format!("62{digits}")
        };

        Target(format!("{normalized}{USER_SUFFIX}"))
    }

    /// Normalizes a raw group id into a group target address.
    pub fn from_group(raw: &str) -> Target {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-')
            .collect();
        Target(format!("{cleaned}{GROUP_SUFFIX}"))
    }

    /// Whether this target addresses a group.
    pub fn is_group(&self) -> bool {
        self.0.ends_with(GROUP_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a session's connection to the wire network.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created but not yet started.
    Uninitialized,
    /// Connection opened, waiting for the pairing handshake to complete.
    AwaitingHandshake,
    /// Authenticated and able to transmit.
    Connected,
    /// Dropped by a transient cause; a bounded reconnect is in progress.
    Reconnecting,
    /// Torn down deliberately or by a terminal disconnect cause.
    Closed,
    /// Gave up: handshake timeout or reconnection exhaustion.
    Failed,
}

impl SessionState {
    /// Whether the session has reached a state it will never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

/// Media category of an outbound attachment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

/// Outbound message payload, resolved once at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Text {
        body: String,
    },
    Media {
        kind: MediaKind,
        source_url: String,
        caption: Option<String>,
        view_once: bool,
    },
}

impl Payload {
    /// The human-visible text of the payload, used for presence simulation
    /// and log previews. Media without a caption has no visible text.
    pub fn visible_text(&self) -> &str {
        match self {
            Payload::Text { body } => body,
            Payload::Media { caption, .. } => caption.as_deref().unwrap_or(""),
        }
    }
}

/// Presence state signalled to a recipient before/after transmitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Composing,
    Paused,
}

/// Opaque per-session authentication material.
///
/// The gateway never interprets the blob; it is handed verbatim to the wire
/// client library on connect and persisted on rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials(pub serde_json::Value);

/// Wire-level disconnect cause code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisconnectCause(pub u16);

impl DisconnectCause {
    /// Device was logged out remotely; credentials are void.
    pub const LOGGED_OUT: DisconnectCause = DisconnectCause(401);
    /// Account forbidden/banned by the network.
    pub const FORBIDDEN: DisconnectCause = DisconnectCause(403);
    /// Stored credentials are invalid or corrupted.
    pub const BAD_CREDENTIALS: DisconnectCause = DisconnectCause(411);
    /// Connection lost or request timed out.
    pub const TIMED_OUT: DisconnectCause = DisconnectCause(408);
    /// Upstream service unavailable.
    pub const SERVICE_UNAVAILABLE: DisconnectCause = DisconnectCause(503);
    /// Server asked the client to restart the stream.
    pub const RESTART_REQUIRED: DisconnectCause = DisconnectCause(515);
}

impl std::fmt::Display for DisconnectCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification of a disconnect cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CauseClass {
    /// Credentials are permanently invalid; reconnection is pointless.
    Terminal,
    /// Likely to resolve itself; bounded reconnection is appropriate.
    Transient,
}

/// Cause codes that invalidate the session's credentials permanently.
///
/// Kept as a table so new causes can be added without touching control flow.
const TERMINAL_CAUSES: &[DisconnectCause] = &[
    DisconnectCause::LOGGED_OUT,
    DisconnectCause::FORBIDDEN,
    DisconnectCause::BAD_CREDENTIALS,
];

/// Classifies a disconnect cause as terminal or transient.
///
/// Every cause not listed in the terminal table is transient and eligible
/// for bounded reconnection.
pub fn classify(cause: DisconnectCause) -> CauseClass {
    if TERMINAL_CAUSES.contains(&cause) {
        CauseClass::Terminal
    } else {
        CauseClass::Transient
    }
}

/// Point-in-time snapshot of a session's lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,
    /// Reconnect attempts since the last successful connection.
    /// Reset to 0 only on a successful transition into `Connected`.
    pub retry_count: u32,
    pub connected_since: Option<DateTime<Utc>>,
}

impl SessionStatus {
    pub fn uninitialized() -> Self {
        SessionStatus {
            state: SessionState::Uninitialized,
            retry_count: 0,
            connected_since: None,
        }
    }
}

/// Point-in-time snapshot of a session's outbound queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub in_flight: bool,
    pub last_failure_at: Option<DateTime<Utc>>,
}

/// Terminal outcome of an outbound delivery task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Delivered { message_id: MessageId },
    Failed { error: String },
}

/// Outcome delivered to the caller awaiting session creation.
///
/// Exactly one of these (or an error) is delivered per creation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A pairing challenge was surfaced; the caller must complete it
    /// out of band. Contains the raw pairing code and a scannable
    /// text rendering of it.
    Challenge { code: String, qr: String },
    /// The session authenticated with stored credentials.
    Connected,
}

/// Event emitted by a live wire connection handle.
#[derive(Debug, Clone)]
pub enum WireEvent {
    /// The network requires a new device pairing; carries the raw code.
    HandshakeChallenge { code: String },
    /// Authentication completed; carries the material to persist.
    AuthSuccess { credentials: Credentials },
    /// The network rotated the session's credentials mid-connection.
    CredentialsRotated { credentials: Credentials },
    /// The transport dropped.
    Disconnected { cause: DisconnectCause },
    /// An inbound message arrived.
    Inbound { from: Target, body: String },
}

/// Lifecycle and delivery event forwarded to the fanout boundary.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged {
        session_id: SessionId,
        state: SessionState,
    },
    HandshakeChallenge {
        session_id: SessionId,
        code: String,
    },
    Connected {
        session_id: SessionId,
    },
    Disconnected {
        session_id: SessionId,
        cause: DisconnectCause,
    },
    ReconnectExhausted {
        session_id: SessionId,
        attempts: u32,
    },
    Inbound {
        session_id: SessionId,
        from: Target,
        body: String,
    },
    TaskDelivered {
        session_id: SessionId,
        task_id: TaskId,
        message_id: MessageId,
    },
    TaskFailed {
        session_id: SessionId,
        task_id: TaskId,
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_state_display() {
        assert_eq!(SessionState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(
            SessionState::AwaitingHandshake.to_string(),
            "awaiting_handshake"
        );
        assert_eq!(SessionState::Connected.to_string(), "connected");
        assert_eq!(SessionState::Reconnecting.to_string(), "reconnecting");
        assert_eq!(SessionState::Closed.to_string(), "closed");
        assert_eq!(SessionState::Failed.to_string(), "failed");
    }

    #[test]
    fn terminal_states() {
        assert!(SessionState::Closed.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::Connected.is_terminal());
        assert!(!SessionState::Reconnecting.is_terminal());
    }

    #[test]
    fn classify_terminal_causes() {
        assert_eq!(classify(DisconnectCause::LOGGED_OUT), CauseClass::Terminal);
        assert_eq!(classify(DisconnectCause::FORBIDDEN), CauseClass::Terminal);
        assert_eq!(
            classify(DisconnectCause::BAD_CREDENTIALS),
            CauseClass::Terminal
        );
    }

    #[test]
    fn classify_unknown_cause_is_transient() {
        assert_eq!(classify(DisconnectCause(599)), CauseClass::Transient);
        assert_eq!(classify(DisconnectCause(0)), CauseClass::Transient);
        assert_eq!(classify(DisconnectCause::TIMED_OUT), CauseClass::Transient);
        assert_eq!(
            classify(DisconnectCause::RESTART_REQUIRED),
            CauseClass::Transient
        );
        assert_eq!(
            classify(DisconnectCause::SERVICE_UNAVAILABLE),
            CauseClass::Transient
        );
    }

    #[test]
    fn target_from_phone_local_prefix() {
        let t = Target::from_phone("0812-3456-789");
        assert_eq!(t.as_str(), "628123456789@s.whatsapp.net");
        assert!(!t.is_group());
    }

    #[test]
    fn target_from_phone_plus_country_code() {
        let t = Target::from_phone("+62 812 3456 789");
        assert_eq!(t.as_str(), "628123456789@s.whatsapp.net");
    }

    #[test]
    fn target_from_phone_bare_number_gets_country_code() {
        let t = Target::from_phone("8123456789");
        assert_eq!(t.as_str(), "628123456789@s.whatsapp.net");
    }

    #[test]
    fn target_long_number_treated_as_group() {
        let t = Target::from_phone("123456789012345678");
        assert!(t.is_group());
        assert_eq!(t.as_str(), "123456789012345678@g.us");
    }

    #[test]
    fn target_from_group_keeps_hyphen() {
        let t = Target::from_group("62812-345678");
        assert_eq!(t.as_str(), "62812-345678@g.us");
    }

    #[test]
    fn payload_visible_text() {
        let text = Payload::Text {
            body: "hello".into(),
        };
        assert_eq!(text.visible_text(), "hello");

        let media = Payload::Media {
            kind: MediaKind::Image,
            source_url: "https://example.com/a.png".into(),
            caption: Some("look".into()),
            view_once: false,
        };
        assert_eq!(media.visible_text(), "look");

        let silent = Payload::Media {
            kind: MediaKind::Document,
            source_url: "https://example.com/a.pdf".into(),
            caption: None,
            view_once: false,
        };
        assert_eq!(silent.visible_text(), "");
    }

    #[test]
    fn payload_tagged_serialization() {
        let text = Payload::Text {
            body: "hi".into(),
        };
        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(json["type"], "text");

        let media = Payload::Media {
            kind: MediaKind::Video,
            source_url: "https://example.com/v.mp4".into(),
            caption: None,
            view_once: true,
        };
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["type"], "media");
        assert_eq!(json["kind"], "video");

        let back: Payload = serde_json::from_value(json).unwrap();
        assert_eq!(back, media);
    }

    #[test]
    fn session_status_uninitialized() {
        let s = SessionStatus::uninitialized();
        assert_eq!(s.state, SessionState::Uninitialized);
        assert_eq!(s.retry_count, 0);
        assert!(s.connected_since.is_none());
    }
}
