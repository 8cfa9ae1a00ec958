use serde::Serialize;

use crate::models::EventSummary;

/// How a completed flow ended. `AlreadyAttended` lands here rather than in
/// the error taxonomy: same terminal UI as success, different message.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TerminalOutcome {
    Confirmed,
    AlreadyAttended,
    Failed,
}

/// User-facing phase of the check-in flow.
///
/// `Idle → Scanning → Decoded → Resolving → Ready → Confirming → Terminal`,
/// with `Idle` reachable from anywhere via cancel. Decode and capture are
/// mutually exclusive with the confirmation phases: by the time a phase
/// carries an event, the camera has been released.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "phase", content = "detail")]
pub enum CheckinPhase {
    Idle,
    Scanning,
    Decoded { event_id: String },
    Resolving { event_id: String },
    Ready { event: EventSummary },
    Confirming { event_id: String },
    Terminal { outcome: TerminalOutcome },
}

impl Default for CheckinPhase {
    fn default() -> Self {
        CheckinPhase::Idle
    }
}

impl CheckinPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, CheckinPhase::Idle)
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self, CheckinPhase::Scanning)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckinPhase::Terminal { .. })
    }
}

/// What the hosting UI renders: the current phase, an optional user-facing
/// message, and an optional navigation request (sign-in redirect).
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CheckinSnapshot {
    #[serde(flatten)]
    pub phase: CheckinPhase,
    pub message: Option<String>,
    pub redirect: Option<String>,
    /// Presentation flag: embedded dashboard tab vs. standalone scanner.
    pub embedded: bool,
}
