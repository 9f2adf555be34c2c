//! Core types shared by the sequencer and its platform bindings

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cached answer to "may this page start media without a gesture?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportVerdict {
    /// Probe has not run yet
    #[default]
    Unknown,
    /// Muted unattended playback resolved
    Supported,
    /// Probe was rejected or inconclusive
    Unsupported,
}

impl SupportVerdict {
    pub fn is_known(&self) -> bool {
        !matches!(self, SupportVerdict::Unknown)
    }
}

impl fmt::Display for SupportVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportVerdict::Unknown => write!(f, "unknown"),
            SupportVerdict::Supported => write!(f, "supported"),
            SupportVerdict::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Escalation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencerState {
    Idle,
    ProbingSupport,
    AttemptingImmediate,
    /// Retry after the n-th configured delay (1-based)
    AttemptingDelayed(u32),
    AwaitingGesture,
    Succeeded,
    Exhausted,
}

impl SequencerState {
    /// Check whether the escalation may move from `self` to `next`
    pub fn can_transition_to(&self, next: SequencerState) -> bool {
        use SequencerState::*;

        match (*self, next) {
            (Idle, ProbingSupport) => true,
            (ProbingSupport, AttemptingImmediate) => true,
            (AttemptingImmediate, Succeeded) => true,
            (AttemptingImmediate, AttemptingDelayed(1)) => true,
            (AttemptingImmediate, AwaitingGesture) => true,
            (AttemptingDelayed(_), Succeeded) => true,
            (AttemptingDelayed(n), AttemptingDelayed(m)) => m == n + 1,
            (AttemptingDelayed(_), AwaitingGesture) => true,
            (AwaitingGesture, Exhausted) => true,
            // A gesture can still start playback after the run returned
            (Exhausted, Succeeded) => true,
            _ => false,
        }
    }

    /// Terminal for the escalation call itself
    pub fn is_settled(&self) -> bool {
        matches!(self, SequencerState::Succeeded | SequencerState::Exhausted)
    }
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequencerState::Idle => write!(f, "idle"),
            SequencerState::ProbingSupport => write!(f, "probing_support"),
            SequencerState::AttemptingImmediate => write!(f, "attempting_immediate"),
            SequencerState::AttemptingDelayed(n) => write!(f, "attempting_delayed({})", n),
            SequencerState::AwaitingGesture => write!(f, "awaiting_gesture"),
            SequencerState::Succeeded => write!(f, "succeeded"),
            SequencerState::Exhausted => write!(f, "exhausted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation_path() {
        use SequencerState::*;

        assert!(Idle.can_transition_to(ProbingSupport));
        assert!(ProbingSupport.can_transition_to(AttemptingImmediate));
        assert!(AttemptingImmediate.can_transition_to(AttemptingDelayed(1)));
        assert!(AttemptingDelayed(1).can_transition_to(AttemptingDelayed(2)));
        assert!(AttemptingDelayed(3).can_transition_to(AwaitingGesture));
        assert!(AwaitingGesture.can_transition_to(Exhausted));
        assert!(Exhausted.can_transition_to(Succeeded));
    }

    #[test]
    fn test_no_skipping_strategies() {
        use SequencerState::*;

        assert!(!Idle.can_transition_to(AttemptingImmediate));
        assert!(!ProbingSupport.can_transition_to(AwaitingGesture));
        assert!(!AttemptingImmediate.can_transition_to(AttemptingDelayed(2)));
        assert!(!AttemptingDelayed(2).can_transition_to(AttemptingDelayed(1)));
        assert!(!Succeeded.can_transition_to(AwaitingGesture));
    }

    #[test]
    fn test_display() {
        assert_eq!(SequencerState::AttemptingDelayed(2).to_string(), "attempting_delayed(2)");
        assert_eq!(SupportVerdict::Unsupported.to_string(), "unsupported");
    }
}
