//! Shared type definitions for the chirp workspace.
//!
//! The central entity is [`HealthState`], the single source of truth for
//! backend liveness. Its polling cadence is derived from its status at
//! construction time, so a state carrying the wrong interval cannot be built.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Polling cadence while the backend is anything other than healthy,
/// including before the first poll resolves.
pub const FAST_POLL_INTERVAL: Duration = Duration::from_millis(30_000);

/// Polling cadence while the backend reports healthy.
pub const SLOW_POLL_INTERVAL: Duration = Duration::from_millis(300_000);

/// Coarse backend liveness classification.
///
/// Every completed poll lands on exactly one of `Ok`, `Wait`, `Error`, or
/// `Fail`. `Checking` exists only as the initial value before the first poll
/// resolves; nothing transitions back into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Initial state, first poll not yet resolved.
    Checking,
    /// Backend reported `healthy`; chat is available.
    Ok,
    /// Backend reported `wait`: reachable but not ready yet.
    Wait,
    /// Backend reported `error`: a soft failure the backend itself signalled,
    /// kept distinct from transport-level failure.
    Error,
    /// Transport failure, timeout, or an unrecognized/malformed response.
    Fail,
}

impl HealthStatus {
    /// The cadence implied by this status: slow iff the backend is healthy.
    pub fn poll_interval(self) -> Duration {
        match self {
            HealthStatus::Ok => SLOW_POLL_INTERVAL,
            _ => FAST_POLL_INTERVAL,
        }
    }

    /// Whether the chat entry point should be exposed to the user.
    pub fn chat_enabled(self) -> bool {
        matches!(self, HealthStatus::Ok)
    }

    /// Display hint for UI layers. Purely derived; the monitor does not act
    /// on it.
    pub fn tone(self) -> StatusTone {
        match self {
            HealthStatus::Checking => StatusTone::Pending,
            HealthStatus::Ok => StatusTone::Affirmative,
            HealthStatus::Wait => StatusTone::Caution,
            HealthStatus::Error => StatusTone::Alert,
            HealthStatus::Fail => StatusTone::Failure,
        }
    }

    /// Short human-readable label for status lines.
    pub fn label(self) -> &'static str {
        match self {
            HealthStatus::Checking => "Checking",
            HealthStatus::Ok => "Online",
            HealthStatus::Wait => "Warming up",
            HealthStatus::Error => "Degraded",
            HealthStatus::Fail => "Unavailable",
        }
    }
}

/// Color semantics for a [`HealthStatus`], decoupled from any concrete
/// palette so UI layers can map them however they render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    /// Nothing known yet.
    Pending,
    /// Backend healthy.
    Affirmative,
    /// Backend reachable but asking for patience.
    Caution,
    /// Backend-reported error, distinct from unreachability.
    Alert,
    /// Unreachable, timed out, or unintelligible.
    Failure,
}

/// The single live snapshot of backend liveness.
///
/// Replaced wholesale after every completed poll; subscribers never observe a
/// partial update. The polling interval is derived from the status and cannot
/// be set independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthState {
    pub status: HealthStatus,
    /// Backend-supplied text on a successful parse, or a locally generated
    /// fixed message on transport failure.
    pub message: String,
    poll_interval: Duration,
}

impl HealthState {
    /// Build a state for `status`, deriving the cadence from it.
    pub fn new(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            poll_interval: status.poll_interval(),
        }
    }

    /// The initial state before the first poll resolves.
    pub fn checking() -> Self {
        Self::new(HealthStatus::Checking, "Checking backend status")
    }

    /// The cadence currently in effect.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::checking()
    }
}

/// Body of a successful `GET /health` response.
///
/// Both fields default so a missing `status` degrades into the unrecognized
/// bucket during classification instead of surfacing as a parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Request body for `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model_name: String,
    pub prompt: String,
}

/// Response body of `POST /generate`. An empty `response` triggers the
/// fallback reply in the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
}

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

/// One entry in the chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            sent_at: Utc::now(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
            sent_at: Utc::now(),
        }
    }
}
