//! Session state machine.

use serde::{Deserialize, Serialize};

/// States of a streaming session.
///
/// Transitions only move forward:
///
/// ```text
///   Started ──ingest──▶ Receiving ──stop──▶ Stopping ──▶ ((Stopped))
///      │                   │                                │
///      ├───cancel──────────┴────cancel────▶ ((Cancelled))   │
///      └───────────── ttl ──────────────▶ ((Expired)) ◀─────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Opened, no audio yet.
    Started,
    /// At least one chunk ingested.
    Receiving,
    /// Stop requested; the pipeline is running.
    Stopping,
    /// Final transcript produced (terminal).
    Stopped,
    /// Discarded by the client (terminal).
    Cancelled,
    /// Idle past the TTL (terminal).
    Expired,
}

impl SessionState {
    /// Whether this state accepts no further transitions besides expiry.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Cancelled | Self::Expired)
    }

    /// Whether moving to `next` is a legal forward transition.
    #[must_use]
    pub fn can_advance(self, next: Self) -> bool {
        use SessionState::{Cancelled, Expired, Receiving, Started, Stopped, Stopping};
        matches!(
            (self, next),
            (Started, Receiving | Stopping | Cancelled | Expired)
                | (Receiving, Stopping | Cancelled | Expired)
                | (Stopping, Stopped | Cancelled | Expired)
                | (Stopped, Expired)
        )
    }

    /// Wire name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Receiving => "receiving",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}
