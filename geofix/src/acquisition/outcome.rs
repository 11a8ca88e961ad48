//! Terminal outcomes and lifecycle phases of an acquisition.

use std::fmt;

use crate::reading::Reading;

/// How an acquisition ended. Produced exactly once per task.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionOutcome {
    /// The best reading at resolution time.
    Success(Reading),
    /// The deadline passed without any acceptable reading.
    TimedOut,
    /// The owner cancelled the task.
    Cancelled,
    /// Every provider failed before any reading was accepted.
    Failed(String),
}

impl AcquisitionOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::TimedOut => OutcomeKind::TimedOut,
            Self::Cancelled => OutcomeKind::Cancelled,
            Self::Failed(_) => OutcomeKind::Failed,
        }
    }

    /// The resolved reading, if any.
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            Self::Success(reading) => Some(reading),
            _ => None,
        }
    }
}

/// Outcome without its payload, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    TimedOut,
    Cancelled,
    Failed,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle phase of an acquisition task.
///
/// ```text
/// Idle ──start──► Listening ──► Resolved(kind)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskPhase {
    #[default]
    Idle,
    Listening,
    Resolved(OutcomeKind),
}

impl TaskPhase {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// True while readings can still change the outcome.
    pub fn is_open(&self) -> bool {
        !self.is_resolved()
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Listening => write!(f, "listening"),
            Self::Resolved(kind) => write!(f, "resolved ({})", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_outcome_kind() {
        let reading = Reading::new(1.0, 2.0, 10.0, Utc::now());
        let success = AcquisitionOutcome::Success(reading.clone());

        assert_eq!(success.kind(), OutcomeKind::Success);
        assert_eq!(success.reading(), Some(&reading));

        assert_eq!(AcquisitionOutcome::TimedOut.kind(), OutcomeKind::TimedOut);
        assert_eq!(AcquisitionOutcome::Cancelled.kind(), OutcomeKind::Cancelled);
        assert_eq!(
            AcquisitionOutcome::Failed("gps off".into()).kind(),
            OutcomeKind::Failed
        );
        assert!(AcquisitionOutcome::TimedOut.reading().is_none());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(TaskPhase::Idle.to_string(), "idle");
        assert_eq!(TaskPhase::Listening.to_string(), "listening");
        assert_eq!(
            TaskPhase::Resolved(OutcomeKind::TimedOut).to_string(),
            "resolved (timed out)"
        );
        assert!(TaskPhase::Resolved(OutcomeKind::Cancelled).is_resolved());
        assert!(TaskPhase::Listening.is_open());
    }
}
